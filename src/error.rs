//! Error taxonomy for matrix filtering.

use thiserror::Error;

/// Errors raised while resolving inputs, references and the matrix.
#[derive(Error, Debug)]
pub enum FilterError {
    /// A required input is missing or malformed.
    #[error("{0}")]
    Configuration(String),

    /// The repository input is not an `owner/name` pair.
    #[error("Invalid repository '{0}'. Expected the form owner/name")]
    InvalidRepository(String),

    /// The matrix document could not be read or has the wrong shape.
    #[error("Invalid matrix list: {0}")]
    InputData(String),

    /// A reference could not be turned into a usable commit-ish.
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// The sliced matrix has no group with the requested name.
    #[error("Unknown filter group '{0}' in the matrix list")]
    UnknownFilterGroup(String),

    /// A repository lookup failed.
    #[error("Repository provider request failed: {0}")]
    ProviderUnavailable(String),

    /// The filtered result could not be rendered as JSON.
    #[error("Failed to serialize the filtered result: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for matrix filtering operations.
pub type Result<T> = std::result::Result<T, FilterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_errors_convert_to_serialization() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = FilterError::from(json_error);

        assert!(matches!(err, FilterError::Serialization(_)));
        assert!(err
            .to_string()
            .starts_with("Failed to serialize the filtered result"));
    }
}
