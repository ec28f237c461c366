// src/error.rs
//! Error taxonomy shared by retrieval, extraction and the two cache layers.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while getting bytes from upstream (HTTP, browser automation).
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("deadline exceeded for {url}")]
    Timeout { url: String },

    #[error("browser automation failed for {url}: {message}")]
    Browser { url: String, message: String },

    #[error("empty body from {url}")]
    EmptyBody { url: String },

    #[error("invalid url {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

impl RetrievalError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return RetrievalError::Timeout {
                url: url.to_string(),
            };
        }
        if let Some(status) = err.status() {
            return RetrievalError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            };
        }
        RetrievalError::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

/// Failure while turning retrieved content into events.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("markup shape mismatch: {0}")]
    MarkupMismatch(String),

    #[error("no match for required field `{field}`")]
    NoMatch { field: &'static str },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("external service error (status {status}): {message}")]
    ExternalService { status: u16, message: String },
}

/// Failure reading or writing the response cache or the content store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PersistenceError::Io {
            path: path.into(),
            source,
        }
    }
}

/// What an adapter returns to the registry. Always non-fatal for siblings.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

impl AdapterError {
    /// Short label of the pipeline stage that failed, used in logs.
    pub fn stage(&self) -> &'static str {
        match self {
            AdapterError::Retrieval(RetrievalError::Timeout { .. }) => "timeout",
            AdapterError::Retrieval(RetrievalError::Browser { .. }) => "browser",
            AdapterError::Retrieval(_) => "network",
            AdapterError::Extraction(ExtractionError::MarkupMismatch(_))
            | AdapterError::Extraction(ExtractionError::NoMatch { .. }) => "markup",
            AdapterError::Extraction(ExtractionError::Decode(_)) => "decode",
            AdapterError::Extraction(ExtractionError::ExternalService { .. }) => {
                "external-service"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_labels_follow_variant() {
        let t: AdapterError = RetrievalError::Timeout { url: "u".into() }.into();
        assert_eq!(t.stage(), "timeout");
        let s: AdapterError = RetrievalError::Status {
            url: "u".into(),
            status: 503,
        }
        .into();
        assert_eq!(s.stage(), "network");
        let d: AdapterError = ExtractionError::Decode("bad".into()).into();
        assert_eq!(d.stage(), "decode");
        let m: AdapterError = ExtractionError::NoMatch { field: "date" }.into();
        assert_eq!(m.stage(), "markup");
    }
}
