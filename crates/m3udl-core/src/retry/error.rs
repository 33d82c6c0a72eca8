//! Error returned by a single transfer attempt.

use super::classify::{classify_curl_error, classify_http_status, ErrorKind};

/// Failure of one fetch attempt. A server that ignores `Range` is not an
/// error: the fetcher restarts from byte zero instead.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Connect, read, or timeout failure reported by curl.
    #[error("{0}")]
    Network(#[from] curl::Error),
    /// Response had a non-success status.
    #[error("HTTP {0}")]
    Server(u32),
    /// Stream ended but the staging file does not match the advertised size.
    #[error("size mismatch: expected {expected} bytes, got {received}")]
    SizeMismatch { expected: u64, received: u64 },
    /// Staging or destination file I/O failed.
    #[error("storage: {0}")]
    Storage(#[from] std::io::Error),
    /// Stopped by an external interrupt.
    #[error("interrupted")]
    Cancelled,
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Network(e) => classify_curl_error(e),
            FetchError::Server(code) => classify_http_status(*code),
            FetchError::SizeMismatch { .. } => ErrorKind::Integrity,
            FetchError::Storage(_) => ErrorKind::Storage,
            FetchError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_short_enough_for_the_panel() {
        assert_eq!(FetchError::Server(404).to_string(), "HTTP 404");
        assert_eq!(FetchError::Cancelled.to_string(), "interrupted");
        let e = FetchError::SizeMismatch {
            expected: 10,
            received: 4,
        };
        assert_eq!(e.to_string(), "size mismatch: expected 10 bytes, got 4");
    }

    #[test]
    fn kinds() {
        assert_eq!(FetchError::Server(503).kind(), ErrorKind::Throttled);
        assert_eq!(FetchError::Cancelled.kind(), ErrorKind::Cancelled);
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert_eq!(FetchError::from(io).kind(), ErrorKind::Storage);
        assert!(FetchError::Cancelled.is_cancelled());
        assert!(!FetchError::Server(500).is_cancelled());
    }
}
