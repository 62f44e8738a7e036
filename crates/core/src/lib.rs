#![warn(clippy::all, missing_docs)]

//! Core domain logic for the Marquee movie browser.
//!
//! This crate hosts the data models, the catalog client, the
//! fetch/pagination/debounce primitives, formatting helpers,
//! configuration handling and the saved-movie store used by the
//! terminal UI and any future frontends.

pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod format;
pub mod models;
pub mod saved;
pub mod search;

pub use catalog::{MovieCatalog, TmdbClient};
pub use config::AppConfig;
pub use error::{ApiError, ApiErrorKind};
pub use fetch::{FetchController, FetchState, PageState, Paginator};
pub use models::{Movie, MovieDetails, MoviePage};
pub use saved::{SavedMovie, SavedStore};
pub use search::{DebouncedSearch, QuickSearch};
