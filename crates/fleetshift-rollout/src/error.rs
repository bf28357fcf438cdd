//! Rollout error types.

use std::fmt;

use fleetshift_core::ValidationError;
use fleetshift_gateway::GatewayError;
use thiserror::Error;

/// Result type alias for rollout operations.
pub type RolloutResult<T> = Result<T, RolloutError>;

/// A mutating step of a cutover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutoverStep {
    CreateCopyTemplate,
    RepointGroups,
    DeleteOriginalTemplate,
    CreateFinalTemplate,
    CreateReplacementGroups,
    RegisterTaskDefinition,
    UpdateService,
}

impl fmt::Display for CutoverStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CutoverStep::CreateCopyTemplate => "create copy template",
            CutoverStep::RepointGroups => "repoint scaling groups",
            CutoverStep::DeleteOriginalTemplate => "delete original template",
            CutoverStep::CreateFinalTemplate => "create replacement template",
            CutoverStep::CreateReplacementGroups => "create replacement scaling groups",
            CutoverStep::RegisterTaskDefinition => "register task definition",
            CutoverStep::UpdateService => "update service",
        };
        f.write_str(name)
    }
}

/// Errors that end a rollout.
#[derive(Debug, Error)]
pub enum RolloutError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("failed to read current platform state: {0}")]
    Snapshot(#[source] GatewayError),

    #[error("cannot plan rollout: {0}")]
    Plan(String),

    #[error("cutover step '{step}' failed (touched so far: [{}]): {source}", .touched.join(", "))]
    Cutover {
        step: CutoverStep,
        touched: Vec<String>,
        #[source]
        source: GatewayError,
    },

    #[error("{stage} failed after cutover (touched so far: [{}]): {source}", .touched.join(", "))]
    AfterCutover {
        stage: &'static str,
        touched: Vec<String>,
        #[source]
        source: GatewayError,
    },

    #[error(
        "timeout reached after {elapsed_secs}s waiting for {what}; rollback needed (touched so far: [{}])",
        .touched.join(", ")
    )]
    ReadinessTimeout {
        what: String,
        elapsed_secs: u64,
        touched: Vec<String>,
    },

    #[error(
        "timeout reached after {elapsed_secs}s draining tasks from old instances; rollback needed (touched so far: [{}])",
        .touched.join(", ")
    )]
    DrainTimeout {
        elapsed_secs: u64,
        touched: Vec<String>,
    },

    #[error(
        "rollback of service {service} to {revision} failed, manual intervention required (check the platform console)"
    )]
    RollbackFailed {
        service: String,
        revision: String,
        #[source]
        source: Option<GatewayError>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutover_error_lists_touched_resources() {
        let err = RolloutError::Cutover {
            step: CutoverStep::DeleteOriginalTemplate,
            touched: vec![
                "created template workers-copy".to_string(),
                "repointed group asg-a".to_string(),
            ],
            source: GatewayError::Unavailable("throttled".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("delete original template"));
        assert!(msg.contains("created template workers-copy, repointed group asg-a"));
        assert!(msg.contains("throttled"));
    }

    #[test]
    fn drain_timeout_lists_touched_resources() {
        let err = RolloutError::DrainTimeout {
            elapsed_secs: 300,
            touched: vec![
                "created group ASG-1700000000-0".to_string(),
                "marked 3 members draining".to_string(),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("after 300s"));
        assert!(msg.contains("created group ASG-1700000000-0, marked 3 members draining"));
    }

    #[test]
    fn rollback_failure_keeps_gateway_cause() {
        use std::error::Error as _;

        let err = RolloutError::RollbackFailed {
            service: "web".to_string(),
            revision: "arn:td/web:1".to_string(),
            source: Some(GatewayError::Unavailable("throttled".to_string())),
        };
        assert!(err.to_string().contains("check the platform console"));
        let cause = err.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(cause.contains("throttled"));
    }

    #[test]
    fn validation_converts() {
        let err: RolloutError = ValidationError::Missing("cluster").into();
        assert_eq!(err.to_string(), "invalid input: no value provided for cluster");
    }
}
