//! fleetshift.toml configuration parser.
//!
//! Every key is optional. Accessors fall back to the built-in defaults, and
//! the CLI layers its own flags on top.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::DeploymentConfiguration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_SETTLE_SECS: u64 = 60;
pub const DEFAULT_GROUP_PREFIX: &str = "ASG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetshiftConfig {
    pub rollout: Option<RolloutConfig>,
    pub service: Option<ServiceConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RolloutConfig {
    pub timeout_secs: Option<u64>,
    pub poll_interval_secs: Option<u64>,
    pub settle_secs: Option<u64>,
    pub scaling_group_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub min_healthy_percent: Option<u32>,
    pub max_percent: Option<u32>,
}

impl FleetshiftConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FleetshiftConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn timeout_secs(&self) -> u64 {
        self.rollout
            .as_ref()
            .and_then(|r| r.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    pub fn poll_interval_secs(&self) -> u64 {
        self.rollout
            .as_ref()
            .and_then(|r| r.poll_interval_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS)
    }

    pub fn settle_secs(&self) -> u64 {
        self.rollout
            .as_ref()
            .and_then(|r| r.settle_secs)
            .unwrap_or(DEFAULT_SETTLE_SECS)
    }

    pub fn scaling_group_prefix(&self) -> &str {
        self.rollout
            .as_ref()
            .and_then(|r| r.scaling_group_prefix.as_deref())
            .unwrap_or(DEFAULT_GROUP_PREFIX)
    }

    /// Deployment bounds for service rollouts.
    pub fn deployment_configuration(&self) -> DeploymentConfiguration {
        let defaults = DeploymentConfiguration::default();
        let service = self.service.as_ref();
        DeploymentConfiguration {
            maximum_percent: service
                .and_then(|s| s.max_percent)
                .unwrap_or(defaults.maximum_percent),
            minimum_healthy_percent: service
                .and_then(|s| s.min_healthy_percent)
                .unwrap_or(defaults.minimum_healthy_percent),
        }
    }
}
