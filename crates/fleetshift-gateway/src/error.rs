//! Error types for platform gateway operations.

use thiserror::Error;

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors surfaced by the platform control plane.
///
/// Gateway operations never retry; every failure is returned to the caller
/// as one of these.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("platform unavailable: {0}")]
    Unavailable(String),

    #[error("{operation} rejected by platform: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },
}

impl GatewayError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn rejected(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_name() {
        let err = GatewayError::not_found("launch template", "workers");
        assert_eq!(err.to_string(), "launch template not found: workers");
        assert!(err.is_not_found());
    }

    #[test]
    fn rejected_names_the_operation() {
        let err = GatewayError::rejected("delete_launch_template", "in use");
        assert_eq!(
            err.to_string(),
            "delete_launch_template rejected by platform: in use"
        );
        assert!(!err.is_not_found());
    }
}
