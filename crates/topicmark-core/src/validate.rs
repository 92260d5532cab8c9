//! Field checks shared by the HTTP API and the client-side request types.

use thiserror::Error;

/// A request field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Types whose fields can be checked before any work is done with them.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Reject empty or whitespace-only values.
pub fn non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(())
}

/// Require at least `min` characters.
pub fn min_chars(field: &'static str, value: &str, min: usize) -> Result<(), ValidationError> {
    if value.chars().count() < min {
        return Err(ValidationError::new(
            field,
            format!("must be at least {min} characters"),
        ));
    }
    Ok(())
}

/// Require an absolute URL.
pub fn url(field: &'static str, value: &str) -> Result<(), ValidationError> {
    reqwest::Url::parse(value)
        .map(|_| ())
        .map_err(|e| ValidationError::new(field, format!("invalid URL {value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_is_empty() {
        assert!(non_empty("name", "   ").is_err());
        assert!(non_empty("name", "x").is_ok());
    }

    #[test]
    fn min_chars_counts_characters_not_bytes() {
        assert!(min_chars("topic", "héé", 3).is_ok());
        assert!(min_chars("topic", "ab", 3).is_err());
    }

    #[test]
    fn url_requires_scheme() {
        assert!(url("url", "https://example.com/a").is_ok());
        let err = url("url", "example.com").unwrap_err();
        assert_eq!(err.field, "url");
    }
}
