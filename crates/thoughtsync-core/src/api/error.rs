use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid snapshot payload: {0}")]
    Parse(String),

    #[error("No local data to export")]
    NoData,

    #[error("Snapshot is not newer than the local cache")]
    StaleData,

    #[error("Local cache error: {0}")]
    Storage(String),

    #[error("Operation requires the {0} role")]
    WrongRole(&'static str),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl SyncError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        SyncError::Http {
            status: status.as_u16(),
            body: Self::truncate_body(body),
        }
    }

    pub fn timeout(after: std::time::Duration) -> Self {
        SyncError::Network(format!("request timed out after {}ms", after.as_millis()))
    }

    /// Failures where the remote could not be read at all. These leave the
    /// local cache untouched and fall back to cached data.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            SyncError::Network(_) | SyncError::Http { .. } | SyncError::Parse(_)
        )
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Network(format!("request timed out: {}", err))
        } else if err.is_decode() {
            SyncError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            SyncError::Http {
                status: status.as_u16(),
                body: String::new(),
            }
        } else {
            SyncError::Network(err.to_string())
        }
    }
}

impl From<anyhow::Error> for SyncError {
    fn from(err: anyhow::Error) -> Self {
        SyncError::Storage(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_truncates_body() {
        let body = "x".repeat(2000);
        let err = SyncError::from_status(reqwest::StatusCode::NOT_FOUND, &body);
        match err {
            SyncError::Http { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("truncated, 2000 total bytes"));
                assert!(body.len() < 600);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let body = "é".repeat(400);
        let truncated = SyncError::truncate_body(&body);
        assert!(truncated.starts_with('é'));
    }

    #[test]
    fn test_fetch_failure_classification() {
        assert!(SyncError::Network("down".into()).is_fetch_failure());
        assert!(SyncError::Http { status: 500, body: String::new() }.is_fetch_failure());
        assert!(SyncError::Parse("eof".into()).is_fetch_failure());
        assert!(!SyncError::NoData.is_fetch_failure());
        assert!(!SyncError::StaleData.is_fetch_failure());
    }

    #[test]
    fn test_timeout_is_network_error() {
        let err = SyncError::timeout(std::time::Duration::from_millis(250));
        assert_eq!(err.to_string(), "Network error: request timed out after 250ms");
    }
}
