use async_trait::async_trait;
use tokio::process::Command;

use fleetwatch_core::model::Settings;
use fleetwatch_core::runtime::{SettingsError, SettingsSource, parse_settings_output};

use super::stderr_text;

/// Runs the project-local settings command from the project directory
pub struct CommandSettings {
    command: Vec<String>,
}

impl CommandSettings {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl SettingsSource for CommandSettings {
    async fn fetch(&self) -> Result<Settings, SettingsError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(SettingsError::Unavailable("empty settings command".into()));
        };

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| SettingsError::Unavailable(format!("failed to run {}: {}", program, e)))?;

        if !output.status.success() {
            return Err(SettingsError::Unavailable(stderr_text(&output)));
        }

        parse_settings_output(&String::from_utf8_lossy(&output.stdout))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_parses_command_output() {
        let source = CommandSettings::new(vec![
            "sh".into(),
            "-c".into(),
            r#"echo '{"mode": "prod"}'"#.into(),
        ]);
        let settings = source.fetch().await.unwrap();
        assert_eq!(settings["mode"], serde_json::json!("prod"));
    }

    #[tokio::test]
    async fn test_fetch_failures_are_unavailable() {
        let failing = CommandSettings::new(vec!["sh".into(), "-c".into(), "exit 3".into()]);
        assert!(failing.fetch().await.is_err());

        let missing = CommandSettings::new(vec!["./definitely-not-a-settings-script".into()]);
        assert!(missing.fetch().await.is_err());
    }
}
