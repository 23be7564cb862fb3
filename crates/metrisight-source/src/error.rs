// Remote source error taxonomy

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// What went wrong on the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkErrorKind {
    Connect,
    Timeout,
    /// HTTP 5xx from the metrics source
    Server { status: u16 },
    Transport,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connection failed"),
            Self::Timeout => write!(f, "timed out"),
            Self::Server { status } => write!(f, "server error HTTP {}", status),
            Self::Transport => write!(f, "transport error"),
        }
    }
}

// every failure of a remote call lands in exactly one of these
// Auth carries only the status code, never request headers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Network error ({kind}): {message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },

    #[error("Authentication rejected by metrics source (HTTP {status})")]
    Auth { status: u16 },

    #[error("Query failed: {message}")]
    Query {
        status: Option<u16>,
        message: String,
    },

    #[error("Query returned no data: {query}")]
    EmptyResult { query: String },

    #[error("Invalid response data: {0}")]
    InvalidData(String),

    #[error("Invalid query: {name} - {reason}")]
    InvalidArgument { name: &'static str, reason: String },
}

/// Flat tag of a [`SourceError`], for structured results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Auth,
    Query,
    EmptyResult,
    InvalidData,
    InvalidArgument,
}

impl SourceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Query { .. } => ErrorKind::Query,
            Self::EmptyResult { .. } => ErrorKind::EmptyResult,
            Self::InvalidData(_) => ErrorKind::InvalidData,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
        }
    }

    /// Only transport faults are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    pub fn network_kind(&self) -> Option<NetworkErrorKind> {
        match self {
            Self::Network { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub(crate) fn timeout(message: impl Into<String>) -> Self {
        Self::Network {
            kind: NetworkErrorKind::Timeout,
            message: message.into(),
        }
    }

    // reqwest errors can carry the request URL, drop it before it reaches a message
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            NetworkErrorKind::Timeout
        } else if err.is_connect() {
            NetworkErrorKind::Connect
        } else {
            NetworkErrorKind::Transport
        };
        Self::Network {
            kind,
            message: err.without_url().to_string(),
        }
    }
}

impl From<metrisight_core::Error> for SourceError {
    fn from(err: metrisight_core::Error) -> Self {
        match err {
            metrisight_core::Error::InvalidData(msg) => Self::InvalidData(msg),
            metrisight_core::Error::InvalidArgument { name, reason } => {
                Self::InvalidArgument { name, reason }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_display_has_status_only() {
        let err = SourceError::Auth { status: 401 };
        assert_eq!(
            err.to_string(),
            "Authentication rejected by metrics source (HTTP 401)"
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_only_network_is_retryable() {
        let network = SourceError::Network {
            kind: NetworkErrorKind::Server { status: 503 },
            message: "unavailable".to_string(),
        };
        assert!(network.is_retryable());
        assert_eq!(network.to_string(), "Network error (server error HTTP 503): unavailable");

        let query = SourceError::Query {
            status: None,
            message: "bad query".to_string(),
        };
        assert!(!query.is_retryable());
        assert!(!SourceError::EmptyResult { query: "up".to_string() }.is_retryable());
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(SourceError::Auth { status: 403 }.kind(), ErrorKind::Auth);
        assert_eq!(
            SourceError::InvalidData("x".to_string()).kind(),
            ErrorKind::InvalidData
        );
        assert_eq!(
            serde_json::to_string(&ErrorKind::EmptyResult).unwrap(),
            "\"empty_result\""
        );
    }

    #[test]
    fn test_from_core_error() {
        let err: SourceError = metrisight_core::Error::invalid_data("series is empty").into();
        assert_eq!(err, SourceError::InvalidData("series is empty".to_string()));
    }
}
