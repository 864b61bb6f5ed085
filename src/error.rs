//! Error types for fetching and loading processing-time documents
//!
//! Errors are classified by recoverability:
//! - Retryable: network issues, timeouts, 5xx and 429 responses
//! - NonRetryable: missing files, malformed JSON, bad configuration

use thiserror::Error;

/// Error types for a single document fetch
#[derive(Debug, Error)]
pub enum FetchError {
    // Retryable errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("HTTP {status} fetching {url}")]
    HttpStatus { status: u16, url: String },

    // Non-retryable errors
    #[error("Failed to parse JSON from {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl FetchError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::Timeout(_) => true,
            FetchError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "Check your internet connection and try again.",
            FetchError::Timeout(_) => {
                "The server took too long. Try again or raise requestTimeoutSecs."
            }
            FetchError::HttpStatus { status, .. } if *status == 404 => {
                "The document does not exist. Check baseUrl and the configured paths."
            }
            FetchError::HttpStatus { .. } => "The data host returned an error. Try again later.",
            FetchError::Parse { .. } => "The published document is malformed. Try again later.",
            FetchError::NotFound(_) => "No recent data has been published yet.",
            FetchError::Io(_) => "Check that the data directory exists and is readable.",
            FetchError::Configuration(_) => "Check your configuration in ~/.proctime/config.json",
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            FetchError::NotFound(err.to_string())
        } else {
            FetchError::Io(err.to_string())
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(|u| u.to_string()).unwrap_or_default();
        if let Some(status) = err.status() {
            FetchError::HttpStatus {
                status: status.as_u16(),
                url,
            }
        } else if err.is_decode() {
            FetchError::Parse {
                url,
                message: err.to_string(),
            }
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(FetchError::Network("reset".into()).is_retryable());
        assert!(FetchError::Timeout(30).is_retryable());
        assert!(FetchError::HttpStatus { status: 503, url: String::new() }.is_retryable());
        assert!(FetchError::HttpStatus { status: 429, url: String::new() }.is_retryable());
        assert!(!FetchError::HttpStatus { status: 404, url: String::new() }.is_retryable());
        assert!(!FetchError::NotFound("x".into()).is_retryable());
        assert!(!FetchError::Parse { url: String::new(), message: String::new() }.is_retryable());
    }

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err: FetchError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, FetchError::NotFound(_)));
    }

    #[test]
    fn test_recovery_suggestion_for_missing_document() {
        let err = FetchError::HttpStatus {
            status: 404,
            url: "https://example.test/a.json".into(),
        };
        assert!(err.recovery_suggestion().contains("baseUrl"));
    }
}
