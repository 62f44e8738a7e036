//! Presentation helpers for movie records.

use std::{cmp::Ordering, collections::HashMap, fmt};

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::{config::DEFAULT_IMAGE_BASE_URL, models::Movie};

/// Returned by [`image_url`] when a movie has no artwork.
pub const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/500x750?text=No+Image";

const MISSING_YEAR: &str = "N/A";

/// Image size segment understood by the image CDN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSize {
    /// 500px wide.
    #[default]
    W500,
    /// 780px wide.
    W780,
    /// Source resolution.
    Original,
}

impl ImageSize {
    /// Path segment for this size.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::W500 => "w500",
            ImageSize::W780 => "w780",
            ImageSize::Original => "original",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the CDN URL for an image path, or the placeholder when absent.
pub fn image_url(path: Option<&str>, size: ImageSize) -> String {
    image_url_with_base(DEFAULT_IMAGE_BASE_URL, path, size)
}

/// Same as [`image_url`] against a configured CDN prefix.
pub fn image_url_with_base(base: &str, path: Option<&str>, size: ImageSize) -> String {
    match path.filter(|path| !path.is_empty()) {
        Some(path) => format!("{}/{}{}", base.trim_end_matches('/'), size, path),
        None => PLACEHOLDER_IMAGE_URL.to_string(),
    }
}

/// Leading year of a `YYYY-MM-DD` date, or `N/A` when empty.
pub fn year_from_date(date: &str) -> String {
    if date.is_empty() {
        return MISSING_YEAR.to_string();
    }
    date.split('-').next().unwrap_or(date).to_string()
}

/// Convert a 0-10 vote average to a one-decimal 0-5 star rating.
pub fn format_rating(rating: f64) -> String {
    // Halves round up.
    format!("{:.1}", (rating + 0.5).floor() / 2.0)
}

/// Shorten `title` to `max_len` characters, appending `...` when cut.
pub fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        return title.to_string();
    }
    let mut truncated: String = title.chars().take(max_len).collect();
    truncated.push_str("...");
    truncated
}

/// Most popular first.
pub fn sort_by_popularity(movies: &[Movie]) -> Vec<Movie> {
    let mut sorted = movies.to_vec();
    sorted.sort_by(|a, b| b.popularity.total_cmp(&a.popularity));
    sorted
}

/// Highest rated first.
pub fn sort_by_rating(movies: &[Movie]) -> Vec<Movie> {
    let mut sorted = movies.to_vec();
    sorted.sort_by(|a, b| b.vote_average.total_cmp(&a.vote_average));
    sorted
}

/// Newest first; movies without a parseable date go last.
pub fn sort_by_release_date(movies: &[Movie]) -> Vec<Movie> {
    let mut sorted = movies.to_vec();
    sorted.sort_by(|a, b| {
        match (release_date(&a.release_date), release_date(&b.release_date)) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
    sorted
}

/// Movies released in `year`.
pub fn filter_by_year(movies: &[Movie], year: i32) -> Vec<Movie> {
    movies
        .iter()
        .filter(|movie| year_from_date(&movie.release_date).parse::<i32>().ok() == Some(year))
        .cloned()
        .collect()
}

/// Movies whose vote average is at least `min_rating`.
pub fn filter_by_rating(movies: &[Movie], min_rating: f64) -> Vec<Movie> {
    movies
        .iter()
        .filter(|movie| movie.vote_average >= min_rating)
        .cloned()
        .collect()
}

/// Screen-reader style one-line summary.
pub fn accessibility_label(movie: &Movie) -> String {
    format!(
        "{}, {}, Rating: {} out of 5",
        movie.title,
        year_from_date(&movie.release_date),
        format_rating(movie.vote_average)
    )
}

static GENRES: Lazy<HashMap<u32, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (28, "Action"),
        (12, "Adventure"),
        (16, "Animation"),
        (35, "Comedy"),
        (80, "Crime"),
        (99, "Documentary"),
        (18, "Drama"),
        (10751, "Family"),
        (14, "Fantasy"),
        (36, "History"),
        (27, "Horror"),
        (10402, "Music"),
        (9648, "Mystery"),
        (10749, "Romance"),
        (878, "Science Fiction"),
        (10770, "TV Movie"),
        (53, "Thriller"),
        (10752, "War"),
        (37, "Western"),
    ])
});

/// Names for the known genre ids, in input order; unknown ids are dropped.
pub fn genre_names(ids: &[u32]) -> Vec<&'static str> {
    ids.iter().filter_map(|id| GENRES.get(id).copied()).collect()
}

fn release_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
