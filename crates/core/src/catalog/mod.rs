//! Remote movie catalog access.

use std::{future::Future, pin::Pin};

use crate::{
    error::ApiError,
    models::{MovieDetails, MoviePage},
};

/// HTTP client for TMDB-compatible catalogs.
pub mod tmdb;

pub use tmdb::TmdbClient;

/// Boxed future returned by dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read-only queries against a movie catalog.
///
/// Everything above the catalog takes it as an explicit `Arc<dyn MovieCatalog>`
/// so tests can inject a fake.
pub trait MovieCatalog: Send + Sync {
    /// Movies ordered by popularity, one page at a time.
    fn discover<'a>(&'a self, page: u32) -> BoxFuture<'a, Result<MoviePage, ApiError>>;

    /// Free-text title search.
    fn search<'a>(
        &'a self,
        query: &'a str,
        page: u32,
    ) -> BoxFuture<'a, Result<MoviePage, ApiError>>;

    /// Full record for a single movie.
    fn details<'a>(&'a self, id: u64) -> BoxFuture<'a, Result<MovieDetails, ApiError>>;

    /// Search when `query` has text, otherwise fall back to the popular listing.
    fn fetch_movies<'a>(
        &'a self,
        query: &'a str,
        page: u32,
    ) -> BoxFuture<'a, Result<MoviePage, ApiError>> {
        if query.is_empty() {
            self.discover(page)
        } else {
            self.search(query, page)
        }
    }
}
