//! Error taxonomy for malformed series and bad parameters

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The input series is malformed. No partial result is produced.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A caller supplied a parameter outside its valid range.
    #[error("Invalid argument: {name} - {reason}")]
    InvalidArgument { name: &'static str, reason: String },
}

impl Error {
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_display() {
        let error = Error::invalid_argument("window", "must be at least 2");
        assert_eq!(error.to_string(), "Invalid argument: window - must be at least 2");
    }

    #[test]
    fn test_invalid_data_display() {
        let error = Error::invalid_data("series is empty");
        assert_eq!(error.to_string(), "Invalid data: series is empty");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
