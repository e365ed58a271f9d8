//! Topology scanning
//!
//! Finds compose projects one directory below the scan root, resolves each
//! project's merged configuration from inside its directory and turns it
//! into a [`ProjectReport`]. Projects are visited one at a time because the
//! scan changes the process working directory.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::compose::{COMPOSE_FILES, ComposeConfig, ComposeService};
use crate::disk;
use crate::env_file;
use crate::health::ContainerHealth;
use crate::model::{ProjectReport, ServiceReport};
use crate::runtime::{
    ConfigResolver, ResolveError, RuntimeError, RuntimeQuery, SettingsSource, inspect_health,
};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("cannot read scan root {path}: {source}")]
    Root { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Which optional facts to collect
#[derive(Clone, Debug)]
pub struct ScanOptions {
    pub exposes: bool,
    pub ports: bool,
    pub disk_usage: bool,
    pub settings: bool,
    pub health: bool,
    /// Env file looked up inside each project directory
    pub env_file: PathBuf,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            exposes: false,
            ports: false,
            disk_usage: false,
            settings: false,
            health: false,
            env_file: PathBuf::from(".env"),
        }
    }
}

/// Changes the working directory and restores the previous one on drop
pub struct WorkingDirGuard {
    previous: PathBuf,
}

impl WorkingDirGuard {
    pub fn enter(dir: &Path) -> io::Result<Self> {
        let previous = std::env::current_dir()?;
        std::env::set_current_dir(dir)?;
        Ok(Self { previous })
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.previous) {
            warn!(
                dir = %self.previous.display(),
                error = %e,
                "failed to restore working directory"
            );
        }
    }
}

/// Immediate subdirectories of `root` holding a compose file, sorted
pub fn discover_projects(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut projects = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if COMPOSE_FILES.iter().any(|name| path.join(name).is_file()) {
            projects.push(path);
        }
    }
    projects.sort();
    Ok(projects)
}

/// Build the report entry for one service
pub fn service_report(
    name: &str,
    service: &ComposeService,
    options: &ScanOptions,
) -> ServiceReport {
    ServiceReport {
        name: name.to_string(),
        exposed_ports: if options.exposes {
            service.exposed_ports()
        } else {
            Vec::new()
        },
        published_ports: if options.ports {
            service.published_ports()
        } else {
            Vec::new()
        },
        domains: service.domains(),
        health: None,
    }
}

/// Label value compose uses for a project when the config has no `name`
fn default_project_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect()
}

pub struct TopologyScanner<'a> {
    options: &'a ScanOptions,
    resolver: &'a dyn ConfigResolver,
    settings: &'a dyn SettingsSource,
    runtime: &'a dyn RuntimeQuery,
}

impl<'a> TopologyScanner<'a> {
    pub fn new(
        options: &'a ScanOptions,
        resolver: &'a dyn ConfigResolver,
        settings: &'a dyn SettingsSource,
        runtime: &'a dyn RuntimeQuery,
    ) -> Self {
        Self {
            options,
            resolver,
            settings,
            runtime,
        }
    }

    /// Scan every project under `root`.
    ///
    /// Projects whose configuration does not resolve are left out. The scan
    /// only fails when the root is unreadable or the compose resolver cannot
    /// be invoked at all. A failed health pass leaves `health` unset on
    /// every service.
    pub async fn scan(&self, root: &Path) -> Result<Vec<ProjectReport>, ScanError> {
        let root = root.canonicalize().map_err(|source| ScanError::Root {
            path: root.to_path_buf(),
            source,
        })?;
        let dirs = discover_projects(&root).map_err(|source| ScanError::Root {
            path: root.clone(),
            source,
        })?;
        info!(root = %root.display(), count = dirs.len(), "discovered projects");

        let mut projects = Vec::with_capacity(dirs.len());
        // compose project name per kept project, for the health pass
        let mut compose_names = Vec::with_capacity(dirs.len());
        for dir in &dirs {
            if let Some((report, compose_name)) = self.scan_project(&root, dir).await? {
                projects.push(report);
                compose_names.push(compose_name);
            }
        }

        if self.options.health {
            if let Err(e) = self.attach_health(&mut projects, &compose_names).await {
                // keep the topology, only the health column is lost
                warn!(runtime = self.runtime.name(), error = %e, "container listing failed");
            }
        }

        Ok(projects)
    }

    async fn scan_project(
        &self,
        root: &Path,
        dir: &Path,
    ) -> Result<Option<(ProjectReport, String)>, ScanError> {
        let name = dir
            .strip_prefix(root)
            .unwrap_or(dir)
            .to_string_lossy()
            .into_owned();

        let _guard = match WorkingDirGuard::enter(dir) {
            Ok(guard) => guard,
            Err(e) => {
                warn!(project = %name, error = %e, "cannot enter project directory");
                return Ok(None);
            }
        };

        let hosting_domain = env_file::hosting_domain(&self.options.env_file);

        let config: ComposeConfig = match self.resolver.resolve().await {
            Ok(config) => config,
            Err(ResolveError::ProjectConfigInvalid(reason)) => {
                warn!(
                    project = %name,
                    reason = %reason,
                    "skipping project with invalid configuration"
                );
                return Ok(None);
            }
            Err(ResolveError::Runtime(e)) => return Err(e.into()),
        };

        let services = config
            .services
            .iter()
            .map(|(service_name, service)| service_report(service_name, service, self.options))
            .collect();

        let (disk_usage_human, disk_usage_bytes) = if self.options.disk_usage {
            let usage = disk::measure(Path::new("."));
            (Some(usage.human), Some(usage.bytes))
        } else {
            (None, None)
        };

        let settings = if self.options.settings {
            match self.settings.fetch().await {
                Ok(settings) => Some(settings),
                Err(e) => {
                    warn!(project = %name, error = %e, "no settings for project");
                    None
                }
            }
        } else {
            None
        };

        let compose_name = config.name.clone().unwrap_or_else(|| default_project_name(dir));
        debug!(project = %name, compose = %compose_name, "scanned project");

        Ok(Some((
            ProjectReport {
                name,
                hosting_domain,
                disk_usage_human,
                disk_usage_bytes,
                settings,
                services,
            },
            compose_name,
        )))
    }

    /// One batched health pass over every service of every project
    async fn attach_health(
        &self,
        projects: &mut [ProjectReport],
        compose_names: &[String],
    ) -> Result<(), RuntimeError> {
        let mut logical_names = Vec::new();
        for (project, compose_name) in projects.iter().zip(compose_names) {
            for service in &project.services {
                logical_names.push(format!("{}/{}", compose_name, service.name));
            }
        }
        if logical_names.is_empty() {
            return Ok(());
        }

        let mut by_name: BTreeMap<String, Vec<ContainerHealth>> =
            inspect_health(self.runtime, &logical_names)
                .await?
                .into_iter()
                .collect();

        for (project, compose_name) in projects.iter_mut().zip(compose_names) {
            for service in &mut project.services {
                let key = format!("{}/{}", compose_name, service.name);
                let mut containers = by_name.remove(&key).unwrap_or_default();
                // shown under its project, so `shop/web-2` reads as `web-2`
                let prefix = format!("{}/", compose_name);
                for container in &mut containers {
                    if let Some(short) = container.display_name.strip_prefix(&prefix) {
                        container.display_name = short.to_string();
                    }
                }
                service.health = Some(containers);
            }
        }
        Ok(())
    }
}
