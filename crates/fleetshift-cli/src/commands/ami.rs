//! `fleetshift ami-update` — roll a new machine image through a cluster.

use std::process::ExitCode;

use clap::Args;
use fleetshift_core::FleetshiftConfig;
use fleetshift_gateway::PlatformGateway;
use fleetshift_rollout::{AmiRolloutRequest, PollPolicy, run_ami_rollout};
use tracing::info;

#[derive(Debug, Args)]
pub struct AmiUpdateArgs {
    /// Machine image id to roll out (ami-...).
    #[arg(long)]
    pub ami: String,

    /// Cluster whose members run on the launch template.
    #[arg(long)]
    pub cluster: String,

    /// Launch template to update.
    #[arg(long)]
    pub template: String,

    /// Seconds to wait for new instances, and again for draining.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Replace the instance type in the launch template.
    #[arg(long)]
    pub instance_type: Option<String>,
}

impl AmiUpdateArgs {
    /// Merge flags over config-file values.
    pub fn to_request(&self, config: &FleetshiftConfig) -> AmiRolloutRequest {
        AmiRolloutRequest {
            cluster: self.cluster.clone(),
            template: self.template.clone(),
            image_id: self.ami.clone(),
            instance_type: self.instance_type.clone(),
            scaling_group_prefix: config.scaling_group_prefix().to_string(),
            poll: PollPolicy::new(
                config.poll_interval_secs(),
                self.timeout.unwrap_or_else(|| config.timeout_secs()),
            ),
        }
    }
}

pub async fn execute(
    gateway: &dyn PlatformGateway,
    args: &AmiUpdateArgs,
    config: &FleetshiftConfig,
) -> anyhow::Result<ExitCode> {
    let request = args.to_request(config);
    let report = run_ami_rollout(gateway, &request).await?;

    info!(
        image = %report.image_id,
        previous = ?report.previous_images,
        new_groups = ?report.new_groups,
        retired_groups = ?report.retired_groups,
        "ami update complete"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetshift_core::config::RolloutConfig;

    fn args(timeout: Option<u64>) -> AmiUpdateArgs {
        AmiUpdateArgs {
            ami: "ami-0abcdef1234567890".to_string(),
            cluster: "prod".to_string(),
            template: "workers".to_string(),
            timeout,
            instance_type: None,
        }
    }

    #[test]
    fn defaults_without_config() {
        let request = args(None).to_request(&FleetshiftConfig::default());
        assert_eq!(request.poll, PollPolicy::new(5, 300));
        assert_eq!(request.scaling_group_prefix, "ASG");
    }

    #[test]
    fn flag_overrides_config_timeout() {
        let config = FleetshiftConfig {
            rollout: Some(RolloutConfig {
                timeout_secs: Some(900),
                poll_interval_secs: Some(10),
                settle_secs: None,
                scaling_group_prefix: Some("workers".to_string()),
            }),
            service: None,
        };

        let from_config = args(None).to_request(&config);
        assert_eq!(from_config.poll, PollPolicy::new(10, 900));
        assert_eq!(from_config.scaling_group_prefix, "workers");

        let from_flag = args(Some(120)).to_request(&config);
        assert_eq!(from_flag.poll.timeout_secs, 120);
    }
}
