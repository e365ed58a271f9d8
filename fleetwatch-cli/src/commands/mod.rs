mod discover;
mod health;

use std::io::IsTerminal;

use thiserror::Error;

use fleetwatch_core::runtime::RuntimeError;
use fleetwatch_core::scanner::ScanError;

pub use discover::{DiscoverArgs, run_discover};
pub use health::{HealthArgs, run_health};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Colors go to stderr only when it is a terminal and nobody opted out
fn use_color(no_color: bool) -> bool {
    !no_color && std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal()
}
