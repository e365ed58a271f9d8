//! Container health classification
//!
//! Reduces the raw state reported by `docker inspect` to a single ordered
//! severity per container. Everything here is pure: the same inputs always
//! give the same [`ContainerHealth`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::theme::Color;

/// Label compose assigns to each replica of a service
pub const REPLICA_LABEL: &str = "com.docker.compose.container-number";
pub const PROJECT_LABEL: &str = "com.docker.compose.project";
pub const SERVICE_LABEL: &str = "com.docker.compose.service";

/// Severity of a container, lower is healthier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLevel {
    Healthy,
    Running,
    Degraded,
    Starting,
    Unknown,
    Dying,
    Stopped,
    Critical,
}

/// Level to color mapping, one row per level in severity order
const LEVEL_COLORS: [(HealthLevel, Color); 8] = [
    (HealthLevel::Healthy, Color::Green),
    (HealthLevel::Running, Color::Cyan),
    (HealthLevel::Degraded, Color::Yellow),
    (HealthLevel::Starting, Color::LightYellow),
    (HealthLevel::Unknown, Color::Grey),
    (HealthLevel::Dying, Color::LightRed),
    (HealthLevel::Stopped, Color::Blue),
    (HealthLevel::Critical, Color::Red),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorTableError {
    #[error("health level '{0}' must have exactly one color")]
    NotUnique(HealthLevel),
    #[error("color table has {found} rows, expected {expected}")]
    Size { found: usize, expected: usize },
}

/// Check that every [`HealthLevel`] has exactly one color row.
///
/// Called once at startup by the binary.
pub fn validate_color_table() -> Result<(), ColorTableError> {
    check_color_table(&LEVEL_COLORS)
}

fn check_color_table(table: &[(HealthLevel, Color)]) -> Result<(), ColorTableError> {
    if table.len() != HealthLevel::ALL.len() {
        return Err(ColorTableError::Size {
            found: table.len(),
            expected: HealthLevel::ALL.len(),
        });
    }
    for level in HealthLevel::ALL {
        if table.iter().filter(|(l, _)| *l == level).count() != 1 {
            return Err(ColorTableError::NotUnique(level));
        }
    }
    Ok(())
}

impl HealthLevel {
    /// Every level, healthiest first
    pub const ALL: [HealthLevel; 8] = [
        HealthLevel::Healthy,
        HealthLevel::Running,
        HealthLevel::Degraded,
        HealthLevel::Starting,
        HealthLevel::Unknown,
        HealthLevel::Dying,
        HealthLevel::Stopped,
        HealthLevel::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HealthLevel::Healthy => "healthy",
            HealthLevel::Running => "running",
            HealthLevel::Degraded => "degraded",
            HealthLevel::Starting => "starting",
            HealthLevel::Unknown => "unknown",
            HealthLevel::Dying => "dying",
            HealthLevel::Stopped => "stopped",
            HealthLevel::Critical => "critical",
        }
    }

    pub fn color(self) -> Color {
        LEVEL_COLORS
            .iter()
            .find(|(level, _)| *level == self)
            .map(|(_, color)| *color)
            .unwrap_or(Color::Grey)
    }
}

impl fmt::Display for HealthLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the container's own healthcheck probe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthcheckStatus {
    Starting,
    Unhealthy,
    Healthy,
}

impl HealthcheckStatus {
    /// Parse the runtime's health string. `none` and anything unrecognised
    /// count as no healthcheck.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "starting" => Some(Self::Starting),
            "unhealthy" => Some(Self::Unhealthy),
            "healthy" => Some(Self::Healthy),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Unhealthy => "unhealthy",
            Self::Healthy => "healthy",
        }
    }
}

impl fmt::Display for HealthcheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record of `docker inspect` output, reduced to the fields we read
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawContainerState {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: RawLifecycle,
    #[serde(default)]
    pub config: Option<RawConfig>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawLifecycle {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub exit_code: Option<i64>,
    #[serde(default)]
    pub health: Option<RawHealth>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawHealth {
    #[serde(default)]
    pub status: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawConfig {
    #[serde(default)]
    pub labels: Option<BTreeMap<String, String>>,
}

impl RawContainerState {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.config
            .as_ref()
            .and_then(|c| c.labels.as_ref())
            .and_then(|labels| labels.get(key))
            .map(String::as_str)
    }

    pub fn healthcheck(&self) -> Option<HealthcheckStatus> {
        self.state
            .health
            .as_ref()
            .and_then(|h| HealthcheckStatus::parse(&h.status))
    }
}

/// Classified state of one container
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerHealth {
    pub container_id: String,
    pub display_name: String,
    pub lifecycle_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck_status: Option<HealthcheckStatus>,
    pub level: HealthLevel,
}

impl ContainerHealth {
    /// `"{name}: {status}"`, with `" & {healthcheck}"` appended when present
    pub fn status_line(&self) -> String {
        match self.healthcheck_status {
            Some(health) => format!(
                "{}: {} & {}",
                self.display_name, self.lifecycle_status, health
            ),
            None => format!("{}: {}", self.display_name, self.lifecycle_status),
        }
    }
}

/// Synthetic lifecycle status for a container that exited with code 0
pub const EXITED_OK: &str = "exited ok";

/// Rewrite `exited` with a zero exit code to [`EXITED_OK`]
pub fn normalize_status(status: &str, exit_code: Option<i64>) -> String {
    if status == "exited" && exit_code == Some(0) {
        EXITED_OK.to_string()
    } else {
        status.to_string()
    }
}

/// Map a normalized lifecycle status and optional healthcheck to a level.
///
/// First match wins. Lifecycle states that mean the container is not
/// serving are checked before the healthcheck, so a stale `healthy` on a
/// restarting container still reads as dying.
pub fn level_for(status: &str, health: Option<HealthcheckStatus>) -> HealthLevel {
    match (status, health) {
        (EXITED_OK, _) => HealthLevel::Stopped,
        ("exited" | "dead", _) => HealthLevel::Critical,
        ("restarting" | "removing" | "paused", _) => HealthLevel::Dying,
        (_, Some(HealthcheckStatus::Healthy)) => HealthLevel::Healthy,
        (_, Some(HealthcheckStatus::Unhealthy)) => HealthLevel::Degraded,
        (_, Some(HealthcheckStatus::Starting)) => HealthLevel::Starting,
        ("running", None) => HealthLevel::Running,
        _ => HealthLevel::Unknown,
    }
}

fn display_name(logical_name: &str, replica_count: usize, ordinal: Option<&str>) -> String {
    if replica_count <= 1 {
        logical_name.to_string()
    } else {
        format!("{}-{}", logical_name, ordinal.unwrap_or("1"))
    }
}

/// Classify one container from an inspection snapshot.
///
/// An id missing from `raw_state_by_id` means the container is gone, so it
/// classifies as critical and dead.
pub fn classify(
    container_id: &str,
    logical_name: &str,
    raw_state_by_id: &BTreeMap<String, RawContainerState>,
    replica_count: usize,
) -> ContainerHealth {
    let Some(raw) = raw_state_by_id.get(container_id) else {
        return ContainerHealth {
            container_id: container_id.to_string(),
            display_name: display_name(logical_name, replica_count, None),
            lifecycle_status: "dead".into(),
            healthcheck_status: None,
            level: HealthLevel::Critical,
        };
    };

    let lifecycle_status = normalize_status(&raw.state.status, raw.state.exit_code);
    let healthcheck_status = raw.healthcheck();
    let level = level_for(&lifecycle_status, healthcheck_status);

    ContainerHealth {
        container_id: container_id.to_string(),
        display_name: display_name(logical_name, replica_count, raw.label(REPLICA_LABEL)),
        lifecycle_status,
        healthcheck_status,
        level,
    }
}

/// Classify every listed id, grouped by logical name in listing order.
///
/// `listed` pairs each logical name with the ids the runtime returned for
/// it. The replica count for a name is the number of ids listed for it.
/// When the ids of one name span several compose projects, each container
/// is named `project/name` and counted among its own project's replicas.
pub fn classify_all(
    listed: &[(String, Vec<String>)],
    raw_state_by_id: &BTreeMap<String, RawContainerState>,
) -> Vec<(String, Vec<ContainerHealth>)> {
    listed
        .iter()
        .map(|(name, ids)| (name.clone(), classify_group(name, ids, raw_state_by_id)))
        .collect()
}

fn classify_group(
    name: &str,
    ids: &[String],
    raw_state_by_id: &BTreeMap<String, RawContainerState>,
) -> Vec<ContainerHealth> {
    let project_of = |id: &String| {
        raw_state_by_id
            .get(id)
            .and_then(|raw| raw.label(PROJECT_LABEL))
    };
    let projects: BTreeSet<&str> = ids.iter().filter_map(project_of).collect();

    ids.iter()
        .map(|id| match project_of(id) {
            Some(project) if projects.len() > 1 => {
                let replicas = ids
                    .iter()
                    .filter(|other| project_of(*other) == Some(project))
                    .count();
                let qualified = format!("{}/{}", project, name);
                classify(id, &qualified, raw_state_by_id, replicas)
            }
            _ => classify(id, name, raw_state_by_id, ids.len()),
        })
        .collect()
}
