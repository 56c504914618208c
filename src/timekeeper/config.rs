use serde::Deserialize;
use std::time::Duration;

/// Bot settings, loaded from `timekeeper.toml` (or any format the config
/// crate understands) next to the binary. Only the Discord token is
/// mandatory; everything else has a default matching the data files the bot
/// has always used.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Discord bot token; the process cannot start without it
    pub discord_token: String,
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// Voice-time document path
    #[serde(default = "default_voice_data_file")]
    pub voice_data_file: String,
    /// Honor-role document path
    #[serde(default = "default_honor_data_file")]
    pub honor_data_file: String,
    /// Cadence of the open-session reconciliation task, in seconds
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,
    /// How long the setup wizard waits for each answer, in seconds
    #[serde(default = "default_setup_timeout_secs")]
    pub setup_timeout_secs: u64,
}

fn default_command_prefix() -> String {
    "!".to_string()
}

fn default_voice_data_file() -> String {
    "data.json".to_string()
}

fn default_honor_data_file() -> String {
    "pd_data.json".to_string()
}

fn default_reconcile_interval_secs() -> u64 {
    60
}

fn default_setup_timeout_secs() -> u64 {
    60
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("timekeeper"))
            .add_source(config::Environment::with_prefix("TIMEKEEPER"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    pub fn setup_timeout(&self) -> Duration {
        Duration::from_secs(self.setup_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialize_from_toml() {
        // Arrange
        let toml_str = r#"
            discord_token = "token-value"
            command_prefix = "~"
            voice_data_file = "voice.json"
            honor_data_file = "honor.json"
            reconcile_interval_secs = 30
            setup_timeout_secs = 120
        "#;

        // Act
        let config: Config = toml::from_str(toml_str).unwrap();

        // Assert
        assert_eq!(config.discord_token, "token-value");
        assert_eq!(config.command_prefix, "~");
        assert_eq!(config.voice_data_file, "voice.json");
        assert_eq!(config.honor_data_file, "honor.json");
        assert_eq!(config.reconcile_interval(), Duration::from_secs(30));
        assert_eq!(config.setup_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_config_defaults_everything_but_the_token() {
        // Arrange
        let toml_str = r#"
            discord_token = "token-value"
        "#;

        // Act
        let config: Config = toml::from_str(toml_str).unwrap();

        // Assert
        assert_eq!(config.command_prefix, "!");
        assert_eq!(config.voice_data_file, "data.json");
        assert_eq!(config.honor_data_file, "pd_data.json");
        assert_eq!(config.reconcile_interval(), Duration::from_secs(60));
        assert_eq!(config.setup_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_config_requires_the_token() {
        // Arrange
        let toml_str = r#"
            command_prefix = "~"
        "#;

        // Act
        let result = toml::from_str::<Config>(toml_str);

        // Assert
        assert!(result.is_err(), "a config without a token must not load");
    }
}
