//! Identifier validation for operator-supplied inputs.
//!
//! Everything here runs before the first platform call, so a malformed
//! argument never leaves a half-applied rollout behind.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static IMAGE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^ami-[a-z0-9]{8,17}$").expect("image id pattern is valid")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("machine image id is not in the correct format: {0:?} (expected ami- followed by 8-17 alphanumerics)")]
    InvalidImageId(String),
    #[error("invalid container image reference: {0:?}")]
    InvalidImageReference(String),
    #[error("no value provided for {0}")]
    Missing(&'static str),
}

/// A machine image id that passed format validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageId(String);

impl ImageId {
    pub fn parse(id: &str) -> Result<Self, ValidationError> {
        if IMAGE_ID_RE.is_match(id) {
            Ok(Self(id.to_string()))
        } else {
            Err(ValidationError::InvalidImageId(id.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reject empty or whitespace-only identifiers.
pub fn require<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Missing(field))
    } else {
        Ok(trimmed)
    }
}

/// Check a container image reference such as `registry/repo:tag`.
pub fn container_image(reference: &str) -> Result<&str, ValidationError> {
    let reference = require("image", reference)?;
    let malformed = reference.chars().any(char::is_whitespace)
        || reference.starts_with(':')
        || reference.starts_with('@')
        || reference.ends_with(':')
        || reference.ends_with('/');
    if malformed {
        return Err(ValidationError::InvalidImageReference(reference.to_string()));
    }
    Ok(reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_short_and_long_ids() {
        assert!(ImageId::parse("ami-1234abcd").is_ok());
        assert!(ImageId::parse("ami-0123456789abcdef0").is_ok());
        assert!(ImageId::parse("AMI-1234ABCD").is_ok());
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(
            ImageId::parse("ami-1234abc"),
            Err(ValidationError::InvalidImageId("ami-1234abc".to_string()))
        );
        assert!(ImageId::parse("ami-0123456789abcdef01").is_err());
        assert!(ImageId::parse("ami-").is_err());
    }

    #[test]
    fn rejects_disallowed_characters() {
        assert!(ImageId::parse("ami-1234_abcd").is_err());
        assert!(ImageId::parse("ami-1234abcd!").is_err());
        assert!(ImageId::parse(" ami-1234abcd").is_err());
        assert!(ImageId::parse("img-1234abcd").is_err());
        assert!(ImageId::parse("").is_err());
    }

    #[test]
    fn require_trims_and_rejects_blank() {
        assert_eq!(require("cluster", "  prod "), Ok("prod"));
        assert_eq!(require("cluster", "   "), Err(ValidationError::Missing("cluster")));
    }

    #[test]
    fn container_image_references() {
        assert_eq!(container_image("nginx:1.25"), Ok("nginx:1.25"));
        assert!(container_image("123.dkr.ecr.eu-west-1.amazonaws.com/web@sha256:abc").is_ok());
        assert!(container_image("repo/web :1").is_err());
        assert!(container_image("repo/web:").is_err());
        assert!(container_image("").is_err());
    }
}
