use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use fleetwatch_core::compose::ComposeConfig;
use fleetwatch_core::health::{PROJECT_LABEL, RawContainerState, SERVICE_LABEL};
use fleetwatch_core::runtime::{
    ConfigResolver, IdExpression, ResolveError, RuntimeError, RuntimeQuery, parse_inspect_output,
};

use super::{shell_join, shell_quote, stderr_text};

/// Runtime queries through the docker CLI.
///
/// A logical name is a compose service name, optionally scoped to a
/// project as `project/service`.
pub struct DockerCli {
    docker: String,
}

impl DockerCli {
    pub fn new(docker: impl Into<String>) -> Self {
        Self {
            docker: docker.into(),
        }
    }

    fn ps_args(logical_name: &str) -> Vec<String> {
        let mut args: Vec<String> = ["ps", "-a", "-q", "--no-trunc"]
            .into_iter()
            .map(String::from)
            .collect();
        let filters = match logical_name.split_once('/') {
            Some((project, service)) => vec![
                format!("label={}={}", PROJECT_LABEL, project),
                format!("label={}={}", SERVICE_LABEL, service),
            ],
            None => vec![format!("label={}={}", SERVICE_LABEL, logical_name)],
        };
        for filter in filters {
            args.push("--filter".into());
            args.push(filter);
        }
        args
    }
}

#[async_trait]
impl RuntimeQuery for DockerCli {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn list_ids(&self, logical_name: &str) -> Result<Vec<String>, RuntimeError> {
        let output = Command::new(&self.docker)
            .args(Self::ps_args(logical_name))
            .output()
            .await
            .map_err(|e| {
                RuntimeError::Unavailable(format!("failed to run {}: {}", self.docker, e))
            })?;

        if !output.status.success() {
            return Err(RuntimeError::Unavailable(stderr_text(&output)));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    /// One `$(docker ps ...)` substitution per name, expanded by the shell
    /// right before `docker inspect` runs
    fn id_expression(&self, logical_names: &[String]) -> IdExpression {
        let substitutions: Vec<String> = logical_names
            .iter()
            .map(|name| {
                let mut argv = vec![self.docker.clone()];
                argv.extend(Self::ps_args(name));
                format!("$({})", shell_join(&argv))
            })
            .collect();
        IdExpression::new(substitutions.join(" "))
    }

    async fn batch_inspect(
        &self,
        expr: &IdExpression,
    ) -> Result<BTreeMap<String, RawContainerState>, RuntimeError> {
        let script = format!("{} inspect {}", shell_quote(&self.docker), expr.as_str());
        let output = Command::new("sh")
            .arg("-c")
            .arg(&script)
            .output()
            .await
            .map_err(|e| RuntimeError::Unavailable(format!("failed to run sh: {}", e)))?;

        match parse_inspect_output(&output.stdout) {
            Ok(states) => {
                if !output.status.success() {
                    // some ids vanished between expansion and inspection
                    debug!(stderr = %stderr_text(&output), "partial inspect result");
                }
                Ok(states)
            }
            Err(e) if output.status.success() => Err(e),
            Err(_) => Err(RuntimeError::Unavailable(stderr_text(&output))),
        }
    }
}

/// Resolves the merged configuration with `<compose_command> config`
pub struct ComposeCli {
    command: Vec<String>,
}

impl ComposeCli {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl ConfigResolver for ComposeCli {
    async fn resolve(&self) -> Result<ComposeConfig, ResolveError> {
        let Some((program, prefix)) = self.command.split_first() else {
            return Err(RuntimeError::Unavailable("empty compose command".into()).into());
        };

        let output = Command::new(program)
            .args(prefix)
            .arg("config")
            .output()
            .await
            .map_err(|e| RuntimeError::Unavailable(format!("failed to run {}: {}", program, e)))?;

        if !output.status.success() {
            return Err(ResolveError::ProjectConfigInvalid(stderr_text(&output)));
        }

        ComposeConfig::from_yaml(&String::from_utf8_lossy(&output.stdout))
            .map_err(|e| ResolveError::ProjectConfigInvalid(e.to_string()))
    }
}
