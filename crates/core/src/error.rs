//! Error type surfaced by catalog requests and fetch state.

use thiserror::Error;

/// Message used when a producer fails with something that is not an [`ApiError`].
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

/// Message used for any non-success HTTP response from the catalog.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch movie";

/// Broad category of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The catalog answered with a non-2xx status.
    Http,
    /// The request never produced a response (DNS, connect, reset, ...).
    Network,
    /// The response body did not match the expected shape.
    Decode,
    /// The client is missing configuration it needs (e.g. an API key).
    Config,
    /// Anything else; see [`ApiError::unknown`].
    Unknown,
}

/// Tagged error carried by fetch state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    /// Category of the failure.
    pub kind: ApiErrorKind,
    /// Human readable message shown in error panels.
    pub message: String,
    /// HTTP status code, for [`ApiErrorKind::Http`].
    pub http_status: Option<u16>,
    /// Canonical reason phrase for `http_status`, when known.
    pub http_status_text: Option<String>,
}

impl ApiError {
    /// Build an error of the given kind without HTTP details.
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status: None,
            http_status_text: None,
        }
    }

    /// Non-2xx response from the catalog.
    pub fn http(status: u16, status_text: Option<&str>) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            message: FETCH_FAILED_MESSAGE.to_string(),
            http_status: Some(status),
            http_status_text: status_text.map(str::to_string),
        }
    }

    /// Generic fallback used to normalise foreign failures.
    pub fn unknown() -> Self {
        Self::new(ApiErrorKind::Unknown, UNKNOWN_ERROR_MESSAGE)
    }

    /// Normalise an arbitrary producer failure.
    ///
    /// An [`ApiError`] anywhere in the chain passes through unchanged; anything
    /// else collapses into [`ApiError::unknown`].
    pub fn normalize(err: anyhow::Error) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api) => api,
            Err(other) => other
                .chain()
                .find_map(|cause| cause.downcast_ref::<ApiError>())
                .cloned()
                .unwrap_or_else(Self::unknown),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::new(ApiErrorKind::Decode, err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::http(status.as_u16(), status.canonical_reason());
        }
        Self::new(ApiErrorKind::Network, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn plain_failures_collapse_to_fallback() {
        let err = ApiError::normalize(anyhow!("boom"));
        assert_eq!(err.kind, ApiErrorKind::Unknown);
        assert_eq!(err.message, UNKNOWN_ERROR_MESSAGE);
        assert_eq!(err.http_status, None);
    }

    #[test]
    fn api_errors_pass_through_context() {
        let source: anyhow::Result<()> = Err(ApiError::http(404, Some("Not Found")).into());
        let err = ApiError::normalize(source.context("loading page 2").unwrap_err());
        assert_eq!(err.kind, ApiErrorKind::Http);
        assert_eq!(err.message, FETCH_FAILED_MESSAGE);
        assert_eq!(err.http_status, Some(404));
        assert_eq!(err.http_status_text.as_deref(), Some("Not Found"));
        assert_eq!(err.to_string(), FETCH_FAILED_MESSAGE);
    }
}
