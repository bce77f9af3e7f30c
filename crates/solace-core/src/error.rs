use thiserror::Error;

/// Top-level error type for the Solace system.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for SolaceError` where they cross crate boundaries,
/// so the `?` operator works between layers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SolaceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for SolaceError {
    fn from(err: toml::de::Error) -> Self {
        SolaceError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SolaceError {
    fn from(err: toml::ser::Error) -> Self {
        SolaceError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for SolaceError {
    fn from(err: serde_json::Error) -> Self {
        SolaceError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Solace operations.
pub type Result<T> = std::result::Result<T, SolaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SolaceError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SolaceError = io_err.into();
        assert!(matches!(err, SolaceError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_toml_error_becomes_config_error() {
        let toml_err = toml::from_str::<toml::Value>("= nope").unwrap_err();
        let err: SolaceError = toml_err.into();
        assert!(matches!(err, SolaceError::Config(_)));
    }

    #[test]
    fn test_json_error_becomes_serialization_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: SolaceError = json_err.into();
        assert!(matches!(err, SolaceError::Serialization(_)));
        assert!(err.to_string().starts_with("Serialization error: "));
    }

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(SolaceError, &str)> = vec![
            (
                SolaceError::Config("bad key".to_string()),
                "Configuration error: bad key",
            ),
            (
                SolaceError::Storage("disk full".to_string()),
                "Storage error: disk full",
            ),
            (
                SolaceError::Api("bind failed".to_string()),
                "API error: bind failed",
            ),
            (
                SolaceError::Serialization("eof".to_string()),
                "Serialization error: eof",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }
}
