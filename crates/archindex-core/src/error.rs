/// Unified error type for archindex.
#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// Connectivity or timeout failure talking to the vector store. Retryable.
    #[error("Transient storage error: {0}")]
    Transient(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IndexerError {
    /// Whether the failure is connectivity/timeout-class and worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transient(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_variant_is_transient() {
        assert!(IndexerError::Transient("connection refused".into()).is_transient());
    }

    #[test]
    fn io_timeout_is_transient() {
        let err = IndexerError::from(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "timed out",
        ));
        assert!(err.is_transient());
    }

    #[test]
    fn other_errors_are_not_transient() {
        assert!(!IndexerError::Storage("bad request".into()).is_transient());
        assert!(!IndexerError::Validation("..".into()).is_transient());
        let err = IndexerError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        assert!(!err.is_transient());
    }

    #[test]
    fn display_includes_message() {
        let err = IndexerError::NotFound("project 42".into());
        assert_eq!(err.to_string(), "Not found: project 42");
    }
}
