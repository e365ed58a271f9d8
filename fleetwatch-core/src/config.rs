use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Optional `fleetwatch.yml` file. Every key has a default, so a missing
/// file is the same as an empty one.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FleetConfig {
    /// Directory whose immediate subdirectories are scanned for projects
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Name reported as the server; defaults to the host name
    #[serde(default)]
    pub server_name: Option<String>,

    /// Per-project env file holding `HOSTINGDOMAIN`
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,

    /// Docker CLI binary used for `ps` and `inspect`
    #[serde(default = "default_docker_command")]
    pub docker_command: String,

    /// Command prefix for compose; `config` is appended
    #[serde(default = "default_compose_command")]
    pub compose_command: Vec<String>,

    /// Project-local command printing the project's settings
    #[serde(default = "default_settings_command")]
    pub settings_command: Vec<String>,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_env_file() -> PathBuf {
    PathBuf::from(".env")
}
fn default_docker_command() -> String {
    "docker".into()
}
fn default_compose_command() -> Vec<String> {
    vec!["docker".into(), "compose".into()]
}
fn default_settings_command() -> Vec<String> {
    vec!["./settings".into(), "--json".into()]
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            server_name: None,
            env_file: default_env_file(),
            docker_command: default_docker_command(),
            compose_command: default_compose_command(),
            settings_command: default_settings_command(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("'{key}' must not be empty")]
    EmptyCommand { key: &'static str },
    #[error("no config file found, searched: {searched:?}")]
    NotFound { searched: Vec<PathBuf> },
}

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV: &str = "FLEETWATCH_CONFIG";

const CONFIG_NAMES: [&str; 4] = [
    "fleetwatch.yml",
    "fleetwatch.yaml",
    ".fleetwatch.yml",
    ".fleetwatch.yaml",
];

impl FleetConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load configuration from a string
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // an empty document deserializes as unit, not as a mapping
        let config: FleetConfig = if content.trim().is_empty() {
            FleetConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Search for a config file: `$FLEETWATCH_CONFIG` first, then the
    /// standard names in `start_dir` and its parents
    pub fn discover(start_dir: &Path) -> Result<(PathBuf, Self), ConfigError> {
        let mut searched = Vec::new();

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Ok((path.clone(), Self::load(&path)?));
            }
            searched.push(path);
        }

        let mut dir = Some(start_dir);
        while let Some(current) = dir {
            for name in &CONFIG_NAMES {
                let path = current.join(name);
                if path.exists() {
                    return Ok((path.clone(), Self::load(&path)?));
                }
                searched.push(path);
            }
            dir = current.parent();
        }

        Err(ConfigError::NotFound { searched })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.docker_command.trim().is_empty() {
            return Err(ConfigError::EmptyCommand {
                key: "docker_command",
            });
        }
        if self.compose_command.is_empty() {
            return Err(ConfigError::EmptyCommand {
                key: "compose_command",
            });
        }
        if self.settings_command.is_empty() {
            return Err(ConfigError::EmptyCommand {
                key: "settings_command",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_config() {
        let yaml = r#"
root: /srv/stacks
server_name: edge-01
compose_command: ["docker-compose"]
"#;
        let config = FleetConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.root, PathBuf::from("/srv/stacks"));
        assert_eq!(config.server_name.as_deref(), Some("edge-01"));
        assert_eq!(config.compose_command, vec!["docker-compose"]);
        assert_eq!(config.env_file, PathBuf::from(".env"));
        assert_eq!(config.docker_command, "docker");
        assert_eq!(config.settings_command, vec!["./settings", "--json"]);
    }

    #[test]
    fn test_empty_file_is_defaults() {
        let config = FleetConfig::from_yaml("\n").unwrap();
        assert_eq!(config.root, PathBuf::from("."));
        assert!(config.server_name.is_none());
    }

    #[test]
    fn test_empty_command_rejected() {
        let result = FleetConfig::from_yaml("compose_command: []\n");
        assert!(matches!(
            result,
            Err(ConfigError::EmptyCommand {
                key: "compose_command"
            })
        ));
    }

    #[test]
    fn test_discover_walks_parents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fleetwatch.yml"), "server_name: box\n").unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let (path, config) = FleetConfig::discover(&nested).unwrap();
        assert_eq!(path, dir.path().join("fleetwatch.yml"));
        assert_eq!(config.server_name.as_deref(), Some("box"));
    }
}
