use std::path::PathBuf;

use clap::{ArgAction, Args};
use sysinfo::System;
use tracing::{debug, info};

use fleetwatch_core::config::FleetConfig;
use fleetwatch_core::model::HostReport;
use fleetwatch_core::render::{TextOptions, render_json, render_text};
use fleetwatch_core::scanner::{ScanOptions, TopologyScanner};

use super::{CommandError, use_color};
use crate::adapters::{CommandSettings, ComposeCli, DockerCli};

#[derive(Args, Debug, Clone)]
pub struct DiscoverArgs {
    /// Directory holding one compose project per subdirectory
    pub root: Option<PathBuf>,

    /// Measure disk usage of each project directory
    #[arg(long)]
    pub du: bool,

    /// Show exposed container ports
    #[arg(long)]
    pub exposes: bool,

    /// Show published port mappings
    #[arg(long)]
    pub ports: bool,

    /// Show routing domains from Host(...) labels
    #[arg(
        long,
        default_value_t = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    pub host_labels: bool,

    /// Only list projects and their domains
    #[arg(long)]
    pub short: bool,

    /// Run each project's settings command
    #[arg(long)]
    pub settings: bool,

    /// Classify container health per service
    #[arg(long)]
    pub health: bool,

    /// Print the report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    #[arg(long)]
    pub no_color: bool,
}

fn server_name(config: &FleetConfig) -> String {
    config
        .server_name
        .clone()
        .or_else(System::host_name)
        .unwrap_or_else(|| "localhost".to_string())
}

pub async fn run_discover(config: &FleetConfig, args: DiscoverArgs) -> Result<(), CommandError> {
    let root = args.root.clone().unwrap_or_else(|| config.root.clone());
    let options = ScanOptions {
        exposes: args.exposes,
        ports: args.ports,
        disk_usage: args.du,
        settings: args.settings,
        health: args.health,
        env_file: config.env_file.clone(),
    };
    debug!(?options, root = %root.display(), "starting discovery");

    let resolver = ComposeCli::new(config.compose_command.clone());
    let settings = CommandSettings::new(config.settings_command.clone());
    let runtime = DockerCli::new(config.docker_command.clone());
    let scanner = TopologyScanner::new(&options, &resolver, &settings, &runtime);

    let report = HostReport {
        server_name: server_name(config),
        projects: scanner.scan(&root).await?,
    };
    info!(
        projects = report.projects.len(),
        services = report.service_count(),
        "discovery finished"
    );

    let text_options = TextOptions {
        host_labels: args.host_labels,
        short: args.short,
        color: use_color(args.no_color),
    };
    eprint!("{}", render_text(&report, &text_options));
    if args.json {
        println!("{}", render_json(&report)?);
    }
    Ok(())
}
