use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use fleetshift_core::FleetshiftConfig;
use fleetshift_gateway::InMemoryPlatform;
use tracing::error;

mod commands;

/// Exit status of a service rollout that was rolled back cleanly.
const EXIT_ROLLED_BACK: u8 = 3;

#[derive(Parser)]
#[command(
    name = "fleetshift",
    about = "fleetshift — zero-downtime machine image and container image rollouts",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to a fleetshift.toml with rollout defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, global = true)]
    debug: bool,

    /// Run against a simulated platform loaded from a JSON fixture.
    #[arg(long, global = true)]
    platform: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the machine image under a cluster's scaling groups.
    ///
    /// Recreates the launch template with the new image, starts a new
    /// scaling group next to every old one, waits for the new instances to
    /// join the cluster, then drains and deletes the old capacity.
    AmiUpdate(commands::ami::AmiUpdateArgs),
    /// Deploy a new container image to a service, rolling back on timeout.
    Deploy(commands::deploy::DeployArgs),
    /// Print the fleetshift version.
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    if let Commands::Version = cli.command {
        println!("fleetshift {}", env!("CARGO_PKG_VERSION"));
        return Ok(ExitCode::SUCCESS);
    }

    let config = FleetshiftConfig::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("failed to load config from {}", path.display()),
        None => "failed to load config".to_string(),
    })?;
    let platform = load_platform(cli.platform.as_deref())?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::AmiUpdate(args) => commands::ami::execute(&platform, &args, &config).await,
            Commands::Deploy(args) => commands::deploy::execute(&platform, &args, &config).await,
            Commands::Version => Ok(ExitCode::SUCCESS),
        }
    })
}

// The simulated platform is the only binding compiled in; a cloud SDK
// binding implements the same `PlatformGateway` trait.
fn load_platform(path: Option<&Path>) -> anyhow::Result<InMemoryPlatform> {
    let Some(path) = path else {
        bail!("no platform binding available; pass --platform <fixture.json> to run against a simulated platform");
    };
    InMemoryPlatform::from_file(path)
        .with_context(|| format!("failed to load platform fixture {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_ami_update() {
        let cli = Cli::try_parse_from([
            "fleetshift",
            "--debug",
            "ami-update",
            "--ami",
            "ami-0abcdef1234567890",
            "--cluster",
            "prod",
            "--template",
            "workers",
            "--timeout",
            "600",
        ])
        .unwrap();
        assert!(cli.debug);
        match cli.command {
            Commands::AmiUpdate(args) => {
                assert_eq!(args.ami, "ami-0abcdef1234567890");
                assert_eq!(args.timeout, Some(600));
                assert_eq!(args.instance_type, None);
            }
            _ => panic!("expected ami-update"),
        }
    }

    #[test]
    fn deploy_requires_image() {
        let err = Cli::try_parse_from([
            "fleetshift",
            "deploy",
            "--service",
            "web",
            "--cluster",
            "prod",
        ])
        .err()
        .unwrap();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn missing_platform_is_an_error() {
        assert!(load_platform(None).is_err());
    }
}
