//! Merged compose configuration
//!
//! Parses the output of `docker compose config` and pulls out the facts the
//! report needs: exposed ports, published port mappings and routing domains.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

/// Candidate compose file names, in lookup order
pub const COMPOSE_FILES: [&str; 4] = [
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// The resolved configuration of one project
#[derive(Clone, Debug, Default)]
pub struct ComposeConfig {
    /// Compose project name, when the resolver reports one
    pub name: Option<String>,
    /// Services in the order the resolver printed them
    pub services: Vec<(String, ComposeService)>,
}

#[derive(Debug, Deserialize)]
struct RawCompose {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    services: serde_yaml::Mapping,
}

impl ComposeConfig {
    /// Parse resolver output. JSON output parses too since it is valid YAML.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        let raw: RawCompose = serde_yaml::from_str(content)?;

        let mut services = Vec::with_capacity(raw.services.len());
        for (key, value) in raw.services {
            let Some(name) = key.as_str() else {
                continue;
            };
            let service: ComposeService = if value.is_null() {
                ComposeService::default()
            } else {
                serde_yaml::from_value(value)?
            };
            services.push((name.to_string(), service));
        }

        Ok(Self {
            name: raw.name,
            services,
        })
    }

    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.services.iter().map(|(name, _)| name.as_str())
    }
}

/// The parts of a service definition the scanner reads
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ComposeService {
    #[serde(default)]
    pub expose: Vec<Scalar>,
    #[serde(default)]
    pub ports: Vec<PortMapping>,
    #[serde(default)]
    pub labels: Labels,
}

/// A YAML scalar that may be written as a number or a string
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(u64),
    Text(String),
}

impl Scalar {
    fn as_text(&self) -> String {
        match self {
            Scalar::Number(n) => n.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }
}

/// One entry under `ports:`, short or long syntax
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum PortMapping {
    Short(Scalar),
    Long {
        target: u64,
        #[serde(default)]
        published: Option<Scalar>,
        #[serde(default)]
        host_ip: Option<String>,
        #[serde(default)]
        protocol: Option<String>,
    },
}

impl PortMapping {
    /// Render as the short `[ip:]published:target[/proto]` form
    pub fn to_short(&self) -> String {
        match self {
            PortMapping::Short(s) => s.as_text(),
            PortMapping::Long {
                target,
                published,
                host_ip,
                protocol,
            } => {
                let mut out = String::new();
                if let Some(ip) = host_ip.as_deref().filter(|ip| !ip.is_empty()) {
                    out.push_str(ip);
                    out.push(':');
                }
                if let Some(published) = published {
                    let published = published.as_text();
                    if !published.is_empty() {
                        out.push_str(&published);
                        out.push(':');
                    }
                }
                out.push_str(&target.to_string());
                if let Some(proto) = protocol.as_deref().filter(|p| *p != "tcp") {
                    out.push('/');
                    out.push_str(proto);
                }
                out
            }
        }
    }
}

/// Service labels, either a mapping or a list of `key=value`
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Labels {
    Map(BTreeMap<String, serde_yaml::Value>),
    List(Vec<String>),
}

impl Default for Labels {
    fn default() -> Self {
        Labels::Map(BTreeMap::new())
    }
}

impl Labels {
    /// Every label as `(key, value)`; non-scalar values are dropped
    pub fn pairs(&self) -> Vec<(String, String)> {
        match self {
            Labels::Map(map) => map
                .iter()
                .filter_map(|(k, v)| {
                    let value = match v {
                        serde_yaml::Value::String(s) => s.clone(),
                        serde_yaml::Value::Number(n) => n.to_string(),
                        serde_yaml::Value::Bool(b) => b.to_string(),
                        serde_yaml::Value::Null => String::new(),
                        _ => return None,
                    };
                    Some((k.clone(), value))
                })
                .collect(),
            Labels::List(list) => list
                .iter()
                .map(|entry| match entry.split_once('=') {
                    Some((k, v)) => (k.to_string(), v.to_string()),
                    None => (entry.clone(), String::new()),
                })
                .collect(),
        }
    }
}

impl ComposeService {
    /// Ports from `expose:`, ranges expanded, protocol suffixes dropped
    pub fn exposed_ports(&self) -> Vec<u16> {
        let mut ports = Vec::new();
        for entry in &self.expose {
            let text = entry.as_text();
            let spec = text.split('/').next().unwrap_or_default().trim();
            match spec.split_once('-') {
                Some((start, end)) => {
                    if let (Ok(start), Ok(end)) = (start.parse::<u16>(), end.parse::<u16>()) {
                        ports.extend(start..=end);
                    }
                }
                None => {
                    if let Ok(port) = spec.parse::<u16>() {
                        ports.push(port);
                    }
                }
            }
        }
        ports
    }

    pub fn published_ports(&self) -> Vec<String> {
        self.ports.iter().map(PortMapping::to_short).collect()
    }

    /// Routing domains found in any label value
    pub fn domains(&self) -> BTreeSet<String> {
        self.labels
            .pairs()
            .iter()
            .flat_map(|(_, value)| host_rule_domains(value))
            .collect()
    }
}

/// Extract host names from a routing rule such as
/// ``Host(`a.com`) || Host(`b.com`, `c.com`)``.
///
/// Only backtick tokens inside a `Host(...)` matcher count, so a
/// `PathPrefix` combined with `&&` contributes nothing.
pub fn host_rule_domains(rule: &str) -> Vec<String> {
    const MATCHER: &str = "Host(";

    let mut domains = Vec::new();
    let mut rest = rule;
    while let Some(start) = rest.find(MATCHER) {
        // `HostRegexp(` and `HostSNI(` do not match since `(` must follow `Host`
        let args = &rest[start + MATCHER.len()..];
        let Some(close) = args.find(')') else {
            break;
        };
        let parts: Vec<&str> = args[..close].split('`').collect();
        // odd indices sit between a pair of backticks
        for (idx, token) in parts.iter().enumerate() {
            if idx % 2 == 1 && idx + 1 < parts.len() && !token.trim().is_empty() {
                domains.push(token.trim().to_string());
            }
        }
        rest = &args[close + 1..];
    }
    domains
}
