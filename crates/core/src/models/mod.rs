//! Shared domain models.

use serde::{Deserialize, Serialize};

mod details;

pub use details::{
    Collection, Genre, MovieDetails, ProductionCompany, ProductionCountry, SpokenLanguage,
};

/// Movie summary as returned by the discover and search endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Movie {
    /// Catalog identifier, stable across requests.
    pub id: u64,
    /// Display title.
    pub title: String,
    /// Title in the original language.
    pub original_title: String,
    /// ISO 639-1 code of the original language.
    pub original_language: String,
    /// Synopsis.
    pub overview: String,
    /// Poster image path (e.g. `/abc.jpg`).
    pub poster_path: Option<String>,
    /// Backdrop image path.
    pub backdrop_path: Option<String>,
    /// Popularity score used by the catalog for ranking.
    pub popularity: f64,
    /// Average rating on a 0-10 scale.
    pub vote_average: f64,
    /// Number of votes behind `vote_average`.
    pub vote_count: u64,
    /// `YYYY-MM-DD`, may be empty.
    pub release_date: String,
    /// Genre identifiers; see [`crate::format::genre_names`].
    pub genre_ids: Vec<u32>,
    /// Adult content flag.
    pub adult: bool,
    /// Whether the entry is a video rather than a feature.
    pub video: bool,
}

/// One page of a paginated catalog listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoviePage {
    /// 1-based page number echoed by the catalog.
    #[serde(default)]
    pub page: u32,
    /// Movies on this page.
    pub results: Vec<Movie>,
    /// Total pages available for the query, 0 when unknown.
    #[serde(default)]
    pub total_pages: u32,
    /// Total results available for the query, 0 when unknown.
    #[serde(default)]
    pub total_results: u64,
}
