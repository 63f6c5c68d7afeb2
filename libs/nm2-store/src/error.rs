//! Error types for nm2-store

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_invalid_key_error() {
        let err = StoreError::InvalidKey(String::new());
        assert_eq!(err.to_string(), "Invalid key: \"\"");
    }
}
