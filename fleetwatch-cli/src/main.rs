mod adapters;
mod commands;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use fleetwatch_core::config::{ConfigError, FleetConfig};
use fleetwatch_core::health::validate_color_table;

use commands::{DiscoverArgs, HealthArgs};

#[derive(Parser)]
#[command(name = "fleetwatch")]
#[command(about = "Discover compose projects on a host and report their health", long_about = None)]
struct Cli {
    /// Log filter, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Config file instead of the discovered one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the topology of every project under a root directory
    Discover(DiscoverArgs),
    /// Classify the containers behind one or more services
    Health(HealthArgs),
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(explicit: Option<&Path>) -> Result<FleetConfig, ConfigError> {
    if let Some(path) = explicit {
        return FleetConfig::load(path);
    }
    let cwd = std::env::current_dir()?;
    match FleetConfig::discover(&cwd) {
        Ok((path, config)) => {
            debug!(path = %path.display(), "loaded config");
            Ok(config)
        }
        Err(ConfigError::NotFound { .. }) => Ok(FleetConfig::default()),
        Err(e) => Err(e),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if let Err(e) = validate_color_table() {
        error!(error = %e, "invalid health color table");
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Discover(args) => commands::run_discover(&config, args).await,
        Commands::Health(args) => commands::run_health(&config, args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_flags() {
        let cli = Cli::parse_from([
            "fleetwatch",
            "discover",
            "/srv",
            "--du",
            "--host-labels=false",
            "--health",
            "--json",
        ]);
        let Commands::Discover(args) = cli.command else {
            panic!("expected discover");
        };
        assert_eq!(args.root, Some(PathBuf::from("/srv")));
        assert!(args.du && args.health && args.json);
        assert!(!args.host_labels);
        assert!(!args.short);

        // bare flag, and the next word stays the root
        let cli = Cli::try_parse_from([
            "fleetwatch",
            "discover",
            "--host-labels",
            "/srv",
            "--short",
        ])
        .unwrap();
        let Commands::Discover(args) = cli.command else {
            panic!("expected discover");
        };
        assert!(args.host_labels);
        assert!(args.short);
        assert_eq!(args.root, Some(PathBuf::from("/srv")));
    }

    #[test]
    fn test_host_labels_default_on() {
        let cli = Cli::parse_from(["fleetwatch", "discover"]);
        let Commands::Discover(args) = cli.command else {
            panic!("expected discover");
        };
        assert!(args.host_labels);
        assert_eq!(args.root, None);
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn test_health_requires_names() {
        assert!(Cli::try_parse_from(["fleetwatch", "health"]).is_err());

        let cli = Cli::try_parse_from([
            "fleetwatch",
            "--log-level",
            "debug",
            "health",
            "web",
            "shop/db",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        let Commands::Health(args) = cli.command else {
            panic!("expected health");
        };
        assert_eq!(args.names, vec!["web", "shop/db"]);
    }

    #[test]
    fn test_explicit_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.yml");
        std::fs::write(&path, "server_name: edge-07\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.server_name.as_deref(), Some("edge-07"));

        assert!(load_config(Some(&dir.path().join("missing.yml"))).is_err());
    }
}
