//! Error type definitions.

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// A `Result` alias where the `Err` case is `baas_datasource::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for the datasource.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Missing base URL")]
    MissingUrl,
    #[error("Missing tenant ID")]
    MissingTenantId,
    #[error("Invalid application ID (make sure there are no invalid characters)")]
    InvalidAppId,
    #[error("Invalid application key (make sure there are no invalid characters)")]
    InvalidAppKey,
    #[error("Invalid basic auth value (make sure there are no invalid characters)")]
    InvalidBasicAuth,
    #[error("Failed to setup HTTP client: {0}")]
    HttpClientSetup(reqwest::Error),
    #[error("Failed to deserialize response: {0}")]
    Deserialize(reqwest::Error),
    #[error("Http error: {0}")]
    Http(reqwest::Error),
    #[error(transparent)]
    Baas(BaasError),
    #[error("Invalid URL: {0}")]
    InvalidUrl(url::ParseError),
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
    #[error("Bad target: {0}")]
    BadTarget(String),
    #[error("Invalid JSON in {field}: {source}")]
    InvalidJson {
        field: &'static str,
        source: serde_json::Error,
    },
    #[error("Aggregation must be an array of pipeline stages, got: {0}")]
    InvalidPipeline(String),
}

impl Error {
    /// The message shown to the user when a connection test fails.
    ///
    /// Prefers the backend's own `error` message, then the HTTP status line.
    pub fn connection_message(&self) -> String {
        match self {
            Error::Baas(BaasError {
                error: Some(message),
                ..
            }) => message.clone(),
            Error::Baas(BaasError {
                status,
                status_text: Some(status_text),
                ..
            }) => format!("HTTP Error ({status}) {status_text}"),
            _ => "Connection failed".to_string(),
        }
    }
}

/// An error returned by the backend.
#[derive(Deserialize, Debug)]
pub struct BaasError {
    #[serde(skip)]
    pub status: u16,
    #[serde(skip)]
    pub status_text: Option<String>,
    #[serde(skip)]
    pub method: http::Method,
    #[serde(skip)]
    pub path: String,
    pub error: Option<String>,
}

impl BaasError {
    pub(crate) fn new(
        status: u16,
        status_text: Option<String>,
        method: http::Method,
        path: String,
        error: Option<String>,
    ) -> Self {
        Self {
            status,
            status_text,
            method,
            path,
            error,
        }
    }
}

impl std::error::Error for BaasError {}

impl fmt::Display for BaasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(msg) = self.error.as_ref() {
            write!(
                f,
                "Received {} on {} {}: {}",
                self.status, self.method, self.path, msg
            )
        } else {
            write!(f, "Received {} on {} {}", self.status, self.method, self.path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baas(status: u16, status_text: Option<&str>, error: Option<&str>) -> Error {
        Error::Baas(BaasError::new(
            status,
            status_text.map(String::from),
            http::Method::GET,
            "/1/tenant1/buckets/object".to_string(),
            error.map(String::from),
        ))
    }

    #[test]
    fn connection_message_prefers_body_error() {
        let err = baas(401, Some("Unauthorized"), Some("Invalid application key"));
        assert_eq!(err.connection_message(), "Invalid application key");
    }

    #[test]
    fn connection_message_falls_back_to_status_line() {
        let err = baas(503, Some("Service Unavailable"), None);
        assert_eq!(
            err.connection_message(),
            "HTTP Error (503) Service Unavailable"
        );
    }

    #[test]
    fn connection_message_generic() {
        assert_eq!(baas(599, None, None).connection_message(), "Connection failed");
        assert_eq!(Error::MissingUrl.connection_message(), "Connection failed");
    }

    #[test]
    fn display_includes_request() {
        let err = baas(404, Some("Not Found"), Some("no such bucket"));
        assert_eq!(
            err.to_string(),
            "Received 404 on GET /1/tenant1/buckets/object: no such bucket"
        );
    }
}
