use thiserror::Error;

/// Core error types for record decoding
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid record: {message}")]
    InvalidRecord { message: String },

    #[error("Invalid timestamp: {0}")]
    InvalidDateTime(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new InvalidRecord error
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Create a new InvalidDateTime error
    pub fn invalid_date_time(value: impl Into<String>) -> Self {
        Self::InvalidDateTime(value.into())
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::invalid_record("field 'id' must be a string");
        assert_eq!(
            err.to_string(),
            "Invalid record: field 'id' must be a string"
        );

        let err = CoreError::invalid_date_time("created_at 'x'");
        assert_eq!(err.to_string(), "Invalid timestamp: created_at 'x'");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
        let err: CoreError = json_err.into();
        assert!(matches!(err, CoreError::Json(_)));
    }
}
