use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Dispatch loop cadence in seconds. One tick per interval scans for due schedules.
pub const DEFAULT_DISPATCH_INTERVAL_SECS: u64 = 30;
/// Buffered generation requests before `try_send` starts dropping.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Top-level config (quillcast.toml + QUILLCAST_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Dispatch engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Seconds between due-schedule scans.
    /// Override with env var: QUILLCAST_DISPATCH_INTERVAL=10
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// Capacity of the generation-request channel.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_DISPATCH_INTERVAL_SECS,
            capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

fn default_interval() -> u64 {
    DEFAULT_DISPATCH_INTERVAL_SECS
}
fn default_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.quillcast/quillcast.db", home)
}

impl EngineConfig {
    /// Load config from a TOML file with QUILLCAST_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.quillcast/quillcast.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: EngineConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("QUILLCAST_").split("_"))
            .extract()
            .map_err(|e| crate::error::QuillcastError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.quillcast/quillcast.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_file_is_absent() {
        let config = EngineConfig::load(Some("/nonexistent/quillcast.toml"))
            .expect("missing file should fall back to defaults");
        assert_eq!(config.dispatch.interval, DEFAULT_DISPATCH_INTERVAL_SECS);
        assert_eq!(config.dispatch.capacity, DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn env_override_beats_toml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "quillcast.toml",
                r#"
                [dispatch]
                interval = 15
                "#,
            )?;
            jail.set_env("QUILLCAST_DISPATCH_INTERVAL", "5");

            let config = EngineConfig::load(Some("quillcast.toml")).expect("load failed");
            assert_eq!(config.dispatch.interval, 5);
            Ok(())
        });
    }

    #[test]
    fn toml_values_survive_without_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "quillcast.toml",
                r#"
                [database]
                path = "/srv/quillcast/quillcast.db"
                "#,
            )?;
            let config = EngineConfig::load(Some("quillcast.toml")).expect("load failed");
            assert_eq!(config.database.path, "/srv/quillcast/quillcast.db");
            assert_eq!(config.dispatch.interval, DEFAULT_DISPATCH_INTERVAL_SECS);
            Ok(())
        });
    }
}
