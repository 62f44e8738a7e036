#![allow(missing_docs)]

//! Detailed movie record.

use serde::{Deserialize, Serialize};

/// Genre entry embedded in [`MovieDetails`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

/// Collection a movie belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: u64,
    pub name: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
}

/// Production company credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionCompany {
    pub id: u64,
    pub name: String,
    pub logo_path: Option<String>,
    #[serde(default)]
    pub origin_country: String,
}

/// Production country credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionCountry {
    pub iso_3166_1: String,
    pub name: String,
}

/// Spoken language entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpokenLanguage {
    pub english_name: String,
    pub iso_639_1: String,
    pub name: String,
}

/// Full record returned by the `movie/{id}` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MovieDetails {
    pub id: u64,
    pub title: String,
    pub original_title: String,
    pub original_language: String,
    pub tagline: Option<String>,
    pub overview: Option<String>,
    pub status: String,
    pub release_date: String,
    /// Runtime in minutes.
    pub runtime: Option<u32>,
    pub budget: u64,
    pub revenue: u64,
    pub homepage: Option<String>,
    pub imdb_id: Option<String>,
    pub popularity: f64,
    pub vote_average: f64,
    pub vote_count: u64,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub adult: bool,
    pub video: bool,
    pub genres: Vec<Genre>,
    pub belongs_to_collection: Option<Collection>,
    pub production_companies: Vec<ProductionCompany>,
    pub production_countries: Vec<ProductionCountry>,
    pub spoken_languages: Vec<SpokenLanguage>,
}

impl MovieDetails {
    /// Runtime rendered as `1h 52m`, if known.
    pub fn runtime_label(&self) -> Option<String> {
        match self.runtime {
            Some(0) | None => None,
            Some(minutes) if minutes < 60 => Some(format!("{minutes}m")),
            Some(minutes) => Some(format!("{}h {}m", minutes / 60, minutes % 60)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_label_formats_hours() {
        let mut details = MovieDetails {
            runtime: Some(136),
            ..Default::default()
        };
        assert_eq!(details.runtime_label().as_deref(), Some("2h 16m"));
        details.runtime = Some(45);
        assert_eq!(details.runtime_label().as_deref(), Some("45m"));
        details.runtime = None;
        assert_eq!(details.runtime_label(), None);
    }
}
