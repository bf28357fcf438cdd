//! `fleetshift deploy` — roll a new container image onto a service.

use std::process::ExitCode;

use clap::Args;
use fleetshift_core::{DeploymentConfiguration, FleetshiftConfig};
use fleetshift_gateway::PlatformGateway;
use fleetshift_rollout::{PollPolicy, ServiceOutcome, ServiceRolloutRequest, run_service_rollout};
use tracing::{info, warn};

use crate::EXIT_ROLLED_BACK;

#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Service to update.
    #[arg(long)]
    pub service: String,

    /// Cluster the service runs in.
    #[arg(long)]
    pub cluster: String,

    /// Container image for the service's first container.
    #[arg(long)]
    pub image: String,

    /// Override the service's desired task count.
    #[arg(long)]
    pub desired_count: Option<u32>,

    /// Minimum healthy percent during the deployment.
    #[arg(long)]
    pub min_healthy: Option<u32>,

    /// Maximum percent during the deployment.
    #[arg(long)]
    pub max_percent: Option<u32>,

    /// Seconds to wait for the deployment, and again for a rollback.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Seconds to wait after the update before polling.
    #[arg(long)]
    pub settle: Option<u64>,
}

impl DeployArgs {
    /// Merge flags over config-file values.
    pub fn to_request(&self, config: &FleetshiftConfig) -> ServiceRolloutRequest {
        let configured = config.deployment_configuration();
        ServiceRolloutRequest {
            cluster: self.cluster.clone(),
            service: self.service.clone(),
            image: self.image.clone(),
            desired_count: self.desired_count,
            deployment: DeploymentConfiguration {
                maximum_percent: self.max_percent.unwrap_or(configured.maximum_percent),
                minimum_healthy_percent: self
                    .min_healthy
                    .unwrap_or(configured.minimum_healthy_percent),
            },
            settle_secs: self.settle.unwrap_or_else(|| config.settle_secs()),
            poll: PollPolicy::new(
                config.poll_interval_secs(),
                self.timeout.unwrap_or_else(|| config.timeout_secs()),
            ),
        }
    }
}

pub async fn execute(
    gateway: &dyn PlatformGateway,
    args: &DeployArgs,
    config: &FleetshiftConfig,
) -> anyhow::Result<ExitCode> {
    let request = args.to_request(config);
    let outcome = run_service_rollout(gateway, &request).await?;

    match &outcome {
        ServiceOutcome::Deployed { revision } => {
            info!(service = %request.service, revision = %revision, "deploy complete");
            println!("deployed {} to {revision}", request.service);
            Ok(ExitCode::SUCCESS)
        }
        ServiceOutcome::RolledBack {
            failed_revision,
            restored_revision,
        } => {
            warn!(
                service = %request.service,
                failed = %failed_revision,
                restored = %restored_revision,
                "deploy rolled back"
            );
            println!(
                "rolled back {} from {failed_revision} to {restored_revision}",
                request.service
            );
            Ok(ExitCode::from(EXIT_ROLLED_BACK))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetshift_core::config::{RolloutConfig, ServiceConfig};

    fn args() -> DeployArgs {
        DeployArgs {
            service: "web".to_string(),
            cluster: "prod".to_string(),
            image: "repo/web:2".to_string(),
            desired_count: None,
            min_healthy: None,
            max_percent: None,
            timeout: None,
            settle: None,
        }
    }

    #[test]
    fn defaults_without_config() {
        let request = args().to_request(&FleetshiftConfig::default());
        assert_eq!(request.deployment, DeploymentConfiguration::default());
        assert_eq!(request.settle_secs, 60);
        assert_eq!(request.poll, PollPolicy::new(5, 300));
        assert_eq!(request.desired_count, None);
    }

    #[test]
    fn flags_override_config() {
        let config = FleetshiftConfig {
            rollout: Some(RolloutConfig {
                timeout_secs: Some(600),
                poll_interval_secs: None,
                settle_secs: Some(30),
                scaling_group_prefix: None,
            }),
            service: Some(ServiceConfig {
                min_healthy_percent: Some(50),
                max_percent: Some(150),
            }),
        };

        let from_config = args().to_request(&config);
        assert_eq!(from_config.deployment.minimum_healthy_percent, 50);
        assert_eq!(from_config.deployment.maximum_percent, 150);
        assert_eq!(from_config.settle_secs, 30);
        assert_eq!(from_config.poll.timeout_secs, 600);

        let mut flags = args();
        flags.min_healthy = Some(75);
        flags.settle = Some(0);
        flags.timeout = Some(90);
        flags.desired_count = Some(6);
        let from_flags = flags.to_request(&config);
        assert_eq!(from_flags.deployment.minimum_healthy_percent, 75);
        assert_eq!(from_flags.deployment.maximum_percent, 150);
        assert_eq!(from_flags.settle_secs, 0);
        assert_eq!(from_flags.poll.timeout_secs, 90);
        assert_eq!(from_flags.desired_count, Some(6));
    }
}
