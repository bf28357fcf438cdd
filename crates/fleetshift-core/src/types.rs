//! Platform resource types shared across fleetshift crates.
//!
//! These mirror what the container platform's control plane reports. The
//! platform owns every one of them; fleetshift only reads them, creates new
//! ones, and repoints consumers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ── Compute ───────────────────────────────────────────────────────

/// A machine image registered with the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineImage {
    pub image_id: String,
    pub name: String,
    /// Platform-reported state, e.g. "available".
    pub state: String,
}

/// A raw compute instance, as seen by the compute API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeInstance {
    pub instance_id: String,
    pub image_id: String,
}

// ── Launch templates & scaling groups ─────────────────────────────

/// Named, immutable bundle of instance-provisioning parameters.
///
/// Never mutated in place: an "update" is create-new, repoint, delete-old.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchTemplate {
    pub name: String,
    pub image_id: String,
    pub key_name: Option<String>,
    #[serde(default)]
    pub security_groups: Vec<String>,
    /// Instance start script. Opaque; base64 on the wire.
    #[serde(default)]
    pub user_data: String,
    pub instance_type: String,
    pub iam_instance_profile: Option<String>,
    #[serde(default)]
    pub monitoring: bool,
    #[serde(default)]
    pub ebs_optimized: bool,
}

/// A pool of compute instances bound to one launch template by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingGroup {
    pub name: String,
    pub launch_template: String,
    pub min_size: u32,
    pub max_size: u32,
    pub desired_capacity: u32,
    /// Subnet / zone identifiers the group places instances into.
    #[serde(default)]
    pub placement: Vec<String>,
    pub health_check_grace_period: u32,
    /// Instance ids currently in the group.
    #[serde(default)]
    pub instances: Vec<String>,
}

// ── Cluster membership ────────────────────────────────────────────

/// Membership status of a container instance in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    Active,
    Draining,
    Inactive,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "ACTIVE",
            MemberStatus::Draining => "DRAINING",
            MemberStatus::Inactive => "INACTIVE",
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One compute instance registered into the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMember {
    /// Platform handle used for describe / drain calls.
    pub arn: String,
    pub instance_id: String,
    pub status: MemberStatus,
    pub running_tasks: u32,
    /// Backing machine image, filled in by joining against compute instances.
    #[serde(default)]
    pub image_id: Option<String>,
}

// ── Services & task definitions ───────────────────────────────────

/// One container inside a task definition.
///
/// Only `name` and `image` are interpreted; every other field is carried
/// through to new revisions untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// An immutable, revisioned task definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub arn: String,
    pub family: String,
    pub revision: u32,
    pub task_role_arn: Option<String>,
    pub containers: Vec<ContainerSpec>,
}

/// Request to register a new revision under a family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinitionRequest {
    pub family: String,
    pub task_role_arn: Option<String>,
    pub containers: Vec<ContainerSpec>,
}

/// Bounds on running task counts while a service deployment is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfiguration {
    pub maximum_percent: u32,
    pub minimum_healthy_percent: u32,
}

impl Default for DeploymentConfiguration {
    fn default() -> Self {
        Self {
            maximum_percent: 200,
            minimum_healthy_percent: 100,
        }
    }
}

/// A long-running binding of a cluster to one task definition revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub cluster: String,
    /// ARN of the bound task definition revision.
    pub task_definition: String,
    pub desired_count: u32,
    pub running_count: u32,
    pub pending_count: u32,
    #[serde(default)]
    pub deployment_configuration: DeploymentConfiguration,
}

/// Parameters for an update-service call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceUpdate {
    pub cluster: String,
    pub service: String,
    pub task_definition: String,
    pub desired_count: u32,
    pub deployment_configuration: DeploymentConfiguration,
}

/// A task running (or pending) in a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub arn: String,
    pub task_definition_arn: String,
    pub last_status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_status_uses_platform_spelling() {
        let json = serde_json::to_string(&MemberStatus::Draining).unwrap();
        assert_eq!(json, "\"DRAINING\"");
        assert_eq!(MemberStatus::Active.to_string(), "ACTIVE");
    }

    #[test]
    fn container_spec_keeps_unknown_fields() {
        let json = r#"{"name":"web","image":"repo/web:1","cpu":256,"essential":true}"#;
        let spec: ContainerSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.image, "repo/web:1");
        assert_eq!(spec.extra.get("cpu"), Some(&serde_json::json!(256)));

        let back = serde_json::to_value(&spec).unwrap();
        assert_eq!(back["essential"], serde_json::json!(true));
    }

    #[test]
    fn deployment_configuration_defaults() {
        let cfg = DeploymentConfiguration::default();
        assert_eq!(cfg.maximum_percent, 200);
        assert_eq!(cfg.minimum_healthy_percent, 100);
    }
}
