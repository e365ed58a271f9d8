//! Contracts over the container runtime
//!
//! The engine never talks to docker directly. The binary provides
//! implementations of these traits that shell out to the docker CLI;
//! tests provide in-memory ones.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::compose::ComposeConfig;
use crate::health::{ContainerHealth, RawContainerState, classify_all};
use crate::model::Settings;

/// The runtime could not be invoked or answered with garbage
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("container runtime unavailable: {0}")]
    Unavailable(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    /// Malformed or missing compose definition
    #[error("invalid project configuration: {0}")]
    ProjectConfigInvalid(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("settings unavailable: {0}")]
    Unavailable(String),
}

/// A runtime-side expression that expands to a set of container ids when
/// the inspection runs, e.g. a shell command substitution
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdExpression(String);

impl IdExpression {
    pub fn new(expr: impl Into<String>) -> Self {
        Self(expr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Queries against the container runtime
#[async_trait]
pub trait RuntimeQuery: Send + Sync {
    /// Human-readable name of this runtime
    fn name(&self) -> &'static str;

    /// Ids of every container, running or not, for a logical name.
    /// No match is an empty list, not an error.
    async fn list_ids(&self, logical_name: &str) -> Result<Vec<String>, RuntimeError>;

    /// Build the expression that resolves every container of the given
    /// logical names at inspection time
    fn id_expression(&self, logical_names: &[String]) -> IdExpression;

    /// Inspect everything `expr` resolves to, in one round trip.
    ///
    /// A non-zero exit with parseable output is still a success; ids that
    /// vanished simply are not in the map.
    async fn batch_inspect(
        &self,
        expr: &IdExpression,
    ) -> Result<BTreeMap<String, RawContainerState>, RuntimeError>;
}

/// Produces the merged compose configuration of the project in the
/// current working directory
#[async_trait]
pub trait ConfigResolver: Send + Sync {
    async fn resolve(&self) -> Result<ComposeConfig, ResolveError>;
}

/// Fetches the settings of the project in the current working directory
#[async_trait]
pub trait SettingsSource: Send + Sync {
    async fn fetch(&self) -> Result<Settings, SettingsError>;
}

/// Parse `docker inspect` output into a map keyed by container id
pub fn parse_inspect_output(
    stdout: &[u8],
) -> Result<BTreeMap<String, RawContainerState>, RuntimeError> {
    let records: Vec<RawContainerState> = serde_json::from_slice(stdout)
        .map_err(|e| RuntimeError::Unavailable(format!("unparseable inspect output: {}", e)))?;
    Ok(records.into_iter().map(|r| (r.id.clone(), r)).collect())
}

/// Parse settings command output.
///
/// A JSON object is taken as is. Anything else is read as a table: one
/// entry per line, split at the first `=`, `:` or whitespace.
pub fn parse_settings_output(stdout: &str) -> Result<Settings, SettingsError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(SettingsError::Unavailable("empty output".into()));
    }

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return serde_json::from_str::<Settings>(trimmed)
            .map_err(|e| SettingsError::Unavailable(format!("invalid JSON: {}", e)));
    }

    let mut settings = Settings::new();
    for line in trimmed.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(at) = line.find(|c: char| c == '=' || c == ':' || c.is_whitespace()) else {
            continue;
        };
        let (key, value) = line.split_at(at);
        let value = value
            .trim_start()
            .trim_start_matches(['=', ':'])
            .trim();
        settings.insert(key.to_string(), serde_json::Value::String(value.to_string()));
    }

    if settings.is_empty() {
        return Err(SettingsError::Unavailable("no settings in output".into()));
    }
    Ok(settings)
}

/// List the containers of each logical name, inspect them all in one query
/// and classify them, grouped by logical name.
///
/// A listing failure means the runtime is unreachable and is returned. An
/// inspection failure is logged and every listed container then classifies
/// as dead.
pub async fn inspect_health(
    runtime: &dyn RuntimeQuery,
    logical_names: &[String],
) -> Result<Vec<(String, Vec<ContainerHealth>)>, RuntimeError> {
    let mut listed = Vec::with_capacity(logical_names.len());
    for name in logical_names {
        let ids = runtime.list_ids(name).await?;
        debug!(name = %name, count = ids.len(), "listed containers");
        listed.push((name.clone(), ids));
    }

    let raw = if listed.iter().all(|(_, ids)| ids.is_empty()) {
        BTreeMap::new()
    } else {
        let expr = runtime.id_expression(logical_names);
        match runtime.batch_inspect(&expr).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(runtime = runtime.name(), error = %e, "container inspection failed");
                BTreeMap::new()
            }
        }
    };

    Ok(classify_all(&listed, &raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthLevel;
    use std::sync::Mutex;

    /// In-memory runtime; `inspect` answers the batch query
    struct FakeRuntime {
        ids: BTreeMap<String, Vec<String>>,
        inspect: Result<Vec<String>, RuntimeError>,
        inspect_calls: Mutex<usize>,
    }

    #[async_trait]
    impl RuntimeQuery for FakeRuntime {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn list_ids(&self, logical_name: &str) -> Result<Vec<String>, RuntimeError> {
            Ok(self.ids.get(logical_name).cloned().unwrap_or_default())
        }

        fn id_expression(&self, logical_names: &[String]) -> IdExpression {
            IdExpression::new(logical_names.join(" "))
        }

        async fn batch_inspect(
            &self,
            _expr: &IdExpression,
        ) -> Result<BTreeMap<String, RawContainerState>, RuntimeError> {
            *self.inspect_calls.lock().unwrap() += 1;
            let records = self.inspect.clone()?;
            let json = format!("[{}]", records.join(","));
            parse_inspect_output(json.as_bytes())
        }
    }

    fn record(id: &str, status: &str) -> String {
        format!(r#"{{"Id":"{}","State":{{"Status":"{}"}}}}"#, id, status)
    }

    #[test]
    fn test_parse_inspect_output() {
        let json = format!("[{},{}]", record("a", "running"), record("b", "exited"));
        let map = parse_inspect_output(json.as_bytes()).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["b"].state.status, "exited");
    }

    #[test]
    fn test_parse_inspect_output_rejects_garbage() {
        assert!(matches!(
            parse_inspect_output(b""),
            Err(RuntimeError::Unavailable(_))
        ));
        assert!(parse_inspect_output(b"Error: No such object").is_err());
    }

    #[test]
    fn test_parse_settings_json() {
        let settings = parse_settings_output(r#"{"theme": "dark", "workers": 4}"#).unwrap();
        assert_eq!(settings["theme"], serde_json::json!("dark"));
        assert_eq!(settings["workers"], serde_json::json!(4));
    }

    #[test]
    fn test_parse_settings_table() {
        let output = "SITE_NAME  My Shop\nDEBUG = false\nlang: en\nURL http://x:80\n\n";
        let settings = parse_settings_output(output).unwrap();
        assert_eq!(settings["SITE_NAME"], serde_json::json!("My Shop"));
        assert_eq!(settings["URL"], serde_json::json!("http://x:80"));
        assert_eq!(settings["DEBUG"], serde_json::json!("false"));
        assert_eq!(settings["lang"], serde_json::json!("en"));
    }

    #[test]
    fn test_parse_settings_failures() {
        assert!(parse_settings_output("   ").is_err());
        assert!(parse_settings_output("{not json").is_err());
        assert!(parse_settings_output("[1, 2]").is_err());
    }

    #[tokio::test]
    async fn test_inspect_health_vanished_container_is_dead() {
        let runtime = FakeRuntime {
            ids: BTreeMap::from([(
                "web".to_string(),
                vec!["a".to_string(), "gone".to_string()],
            )]),
            inspect: Ok(vec![record("a", "running")]),
            inspect_calls: Mutex::new(0),
        };

        let grouped = inspect_health(&runtime, &["web".to_string()]).await.unwrap();
        assert_eq!(grouped.len(), 1);
        let result = &grouped[0].1;
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].level, HealthLevel::Running);
        assert_eq!(result[0].display_name, "web-1");
        assert_eq!(result[1].level, HealthLevel::Critical);
        assert_eq!(result[1].lifecycle_status, "dead");
        assert_eq!(*runtime.inspect_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_inspect_health_survives_inspect_failure() {
        let runtime = FakeRuntime {
            ids: BTreeMap::from([("db".to_string(), vec!["d1".to_string()])]),
            inspect: Err(RuntimeError::Unavailable("boom".into())),
            inspect_calls: Mutex::new(0),
        };

        let grouped = inspect_health(&runtime, &["db".to_string()]).await.unwrap();
        assert_eq!(grouped[0].1.len(), 1);
        assert_eq!(grouped[0].1[0].level, HealthLevel::Critical);
    }

    #[tokio::test]
    async fn test_inspect_health_skips_query_when_nothing_listed() {
        let runtime = FakeRuntime {
            ids: BTreeMap::new(),
            inspect: Ok(vec![]),
            inspect_calls: Mutex::new(0),
        };

        let grouped = inspect_health(&runtime, &["api".to_string()]).await.unwrap();
        assert_eq!(grouped.len(), 1);
        assert!(grouped[0].1.is_empty());
        assert_eq!(*runtime.inspect_calls.lock().unwrap(), 0);
    }
}
