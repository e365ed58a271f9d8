use clap::Args;

use fleetwatch_core::config::FleetConfig;
use fleetwatch_core::render::{render_health_json, render_health_text};
use fleetwatch_core::runtime::inspect_health;

use super::{CommandError, use_color};
use crate::adapters::DockerCli;

#[derive(Args, Debug, Clone)]
pub struct HealthArgs {
    /// Service names, optionally scoped as `project/service`
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Print the containers as JSON on stdout
    #[arg(long)]
    pub json: bool,

    #[arg(long)]
    pub no_color: bool,
}

pub async fn run_health(config: &FleetConfig, args: HealthArgs) -> Result<(), CommandError> {
    let runtime = DockerCli::new(config.docker_command.clone());
    let grouped = inspect_health(&runtime, &args.names).await?;
    let containers: Vec<_> = grouped
        .into_iter()
        .flat_map(|(_, containers)| containers)
        .collect();

    eprint!("{}", render_health_text(&containers, use_color(args.no_color)));
    if args.json {
        println!("{}", render_health_json(&containers)?);
    }
    Ok(())
}
