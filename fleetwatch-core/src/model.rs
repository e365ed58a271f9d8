use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::health::ContainerHealth;

/// Free-form settings reported by a project's settings command
pub type Settings = BTreeMap<String, serde_json::Value>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceReport {
    pub name: String,
    #[serde(default)]
    pub exposed_ports: Vec<u16>,
    #[serde(default)]
    pub published_ports: Vec<String>,
    #[serde(default)]
    pub domains: BTreeSet<String>,
    /// Containers backing this service, only filled when health was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<Vec<ContainerHealth>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectReport {
    /// Project directory relative to the scan root
    pub name: String,
    #[serde(default)]
    pub hosting_domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_usage_human: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_usage_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    #[serde(default)]
    pub services: Vec<ServiceReport>,
}

impl ProjectReport {
    /// Every domain routed to any service of this project
    pub fn domains(&self) -> BTreeSet<&str> {
        self.services
            .iter()
            .flat_map(|s| s.domains.iter().map(String::as_str))
            .collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HostReport {
    #[serde(rename = "server")]
    pub server_name: String,
    pub projects: Vec<ProjectReport>,
}

impl HostReport {
    pub fn service_count(&self) -> usize {
        self.projects.iter().map(|p| p.services.len()).sum()
    }
}

/// Top-level JSON envelope, `{"data": ...}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document<T> {
    pub data: T,
}

/// Payload of the `health` command's JSON output
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub containers: Vec<ContainerHealth>,
}
