use strum_macros::{AsRefStr, Display, IntoStaticStr};

/// Coarse classification used in user-visible error payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Upstream,
    Timeout,
    Decode,
    InvalidParameter,
    Configuration,
    Coalesce,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum Error {
    #[error("Upstream returned HTTP {status} for {url}")]
    Http { status: u16, url: String },
    #[error("Upstream API error {code}: {info}")]
    Api { code: String, info: String },
    #[error("Request to upstream failed: {0}")]
    Transport(String),
    #[error("Request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },
    #[error("Could not decode upstream response: {0}")]
    Decode(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Coalesce(#[from] crate::coalesce::CoalesceError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Http { .. } | Error::Api { .. } | Error::Transport(_) => ErrorKind::Upstream,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Decode(_) => ErrorKind::Decode,
            Error::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::Coalesce(_) => ErrorKind::Coalesce,
        }
    }

    /// Network-class failures worth another attempt: transport errors,
    /// timeouts, throttling and server errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) | Error::Timeout { .. } => true,
            Error::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<crate::cache::CacheError> for Error {
    fn from(err: crate::cache::CacheError) -> Self {
        Error::Configuration(err.to_string())
    }
}

impl From<crate::dedup::DedupError> for Error {
    fn from(err: crate::dedup::DedupError) -> Self {
        Error::InvalidParameter(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let http = |status| Error::Http {
            status,
            url: "https://example.org".to_string(),
        };
        assert!(http(503).is_retryable());
        assert!(http(429).is_retryable());
        assert!(!http(404).is_retryable());
        assert!(!http(400).is_retryable());
        assert!(Error::Transport("reset".to_string()).is_retryable());
        assert!(!Error::Decode("eof".to_string()).is_retryable());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Error::InvalidParameter("x".into()).kind().as_ref(), "invalid_parameter");
        assert_eq!(
            Error::Timeout {
                url: String::new(),
                seconds: 10
            }
            .kind()
            .to_string(),
            "timeout"
        );
    }
}
