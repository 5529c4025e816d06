//! Error types for the gold ledger

use thiserror::Error;

/// Result type for gold ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Gold ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Storage error (RocksDB, missing balance row, constraint failure)
    #[error("Storage error: {0}")]
    Storage(String),

    /// A blocking queue operation was cancelled by the stop signal or a closed peer
    #[error("Queue interrupted: {0}")]
    QueueInterrupted(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for cooperative cancellation, which workers treat as a clean exit
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::QueueInterrupted(_))
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Storage("balance row missing".to_string());
        assert_eq!(err.to_string(), "Storage error: balance row missing");

        let err = Error::QueueInterrupted("mutations".to_string());
        assert_eq!(err.to_string(), "Queue interrupted: mutations");
    }

    #[test]
    fn test_is_interrupted() {
        assert!(Error::QueueInterrupted("telemetry".to_string()).is_interrupted());
        assert!(!Error::Storage("disk full".to_string()).is_interrupted());
        assert!(!Error::from("boom").is_interrupted());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io_error.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
