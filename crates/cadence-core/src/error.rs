//! Registry errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Not registered: {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_registered_error() {
        let err = RegistryError::AlreadyRegistered("jobs::Echo".to_string());
        assert!(err.to_string().contains("Already registered"));
        assert!(err.to_string().contains("jobs::Echo"));
    }

    #[test]
    fn test_not_found_error() {
        let err = RegistryError::NotFound("jobs::Missing".to_string());
        assert!(err.to_string().contains("Not registered"));
    }
}
