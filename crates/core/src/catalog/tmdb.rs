use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{
    header::{ACCEPT, AUTHORIZATION},
    StatusCode, Url,
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    config::AppConfig,
    error::{ApiError, ApiErrorKind},
    models::{MovieDetails, MoviePage},
};

use super::{BoxFuture, MovieCatalog};

/// Escaped in query values: everything but alphanumerics and `-_.!~*'()`.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// `reqwest`-backed implementation of [`MovieCatalog`].
#[derive(Debug, Clone)]
pub struct TmdbClient {
    base_url: String,
    api_key: Option<String>,
    http: Arc<reqwest::Client>,
}

impl TmdbClient {
    /// Create a client targeting `base_url` (e.g. `https://api.themoviedb.org/3`).
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            http: Arc::new(reqwest::Client::new()),
        }
    }

    /// Build a client from application configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.api_base_url.clone(), config.api_key.clone())
    }

    /// URL for the popularity listing.
    pub fn discover_url(&self, page: u32) -> Result<Url, ApiError> {
        let mut url = self.endpoint("discover/movie")?;
        url.query_pairs_mut()
            .append_pair("page", &page.max(1).to_string())
            .append_pair("sort_by", "popularity.desc");
        Ok(url)
    }

    /// URL for a title search. The first page carries only the query.
    pub fn search_url(&self, query: &str, page: u32) -> Result<Url, ApiError> {
        let mut url = self.endpoint("search/movie")?;
        let mut pairs = format!("query={}", utf8_percent_encode(query, QUERY_VALUE));
        if page > 1 {
            pairs.push_str(&format!("&page={page}"));
        }
        url.set_query(Some(&pairs));
        Ok(url)
    }

    /// URL for a single movie record.
    pub fn details_url(&self, id: u64) -> Result<Url, ApiError> {
        self.endpoint(&format!("movie/{id}"))
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Url::parse(&format!("{}/{}", self.base_url, path)).map_err(|err| {
            ApiError::new(
                ApiErrorKind::Config,
                format!("invalid catalog url {}: {err}", self.base_url),
            )
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ApiError::new(
                ApiErrorKind::Config,
                "No API key configured; set MARQUEE_API_KEY or TMDB_API_KEY",
            ));
        };

        debug!(%url, "catalog request");
        let response = self
            .http
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "catalog request failed");
            return Err(http_error(status));
        }

        response.json::<T>().await.map_err(|err| {
            ApiError::new(
                ApiErrorKind::Decode,
                format!("failed to parse catalog response: {err}"),
            )
        })
    }
}

fn http_error(status: StatusCode) -> ApiError {
    ApiError::http(status.as_u16(), status.canonical_reason())
}

impl MovieCatalog for TmdbClient {
    fn discover<'a>(&'a self, page: u32) -> BoxFuture<'a, Result<MoviePage, ApiError>> {
        Box::pin(async move {
            let url = self.discover_url(page)?;
            self.get_json::<MoviePage>(url).await
        })
    }

    fn search<'a>(
        &'a self,
        query: &'a str,
        page: u32,
    ) -> BoxFuture<'a, Result<MoviePage, ApiError>> {
        Box::pin(async move {
            let url = self.search_url(query, page)?;
            self.get_json::<MoviePage>(url).await
        })
    }

    fn details<'a>(&'a self, id: u64) -> BoxFuture<'a, Result<MovieDetails, ApiError>> {
        Box::pin(async move {
            let url = self.details_url(id)?;
            self.get_json::<MovieDetails>(url).await
        })
    }
}
