// ABOUTME: Configuration management for the insightflow application
// ABOUTME: Loads engine, agent, and logging settings from YAML and INSIGHTFLOW_* environment variables

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::agents::AgentsConfig;
use crate::engine::EngineConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub agents: AgentsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// One of `pretty`, `compact`, or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from file path or default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(&p)?,
            None => match Self::find_config_file() {
                Some(p) => Self::from_file(&p)?,
                None => Config::default(),
            },
        };

        config.merge_env()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let local = [
            PathBuf::from("insightflow.yaml"),
            PathBuf::from("insightflow.yml"),
            PathBuf::from(".insightflow.yaml"),
            PathBuf::from(".insightflow.yml"),
        ];

        if let Some(path) = local.into_iter().find(|p| p.exists()) {
            return Some(path);
        }

        dirs::home_dir()
            .map(|home| home.join(".insightflow").join("config.yaml"))
            .filter(|p| p.exists())
    }

    /// Merge environment variables into configuration
    fn merge_env(&mut self) -> Result<()> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("INSIGHTFLOW_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("INSIGHTFLOW_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(max) = lookup("INSIGHTFLOW_MAX_PARALLEL") {
            self.engine.max_parallel_nodes = max
                .parse()
                .context("INSIGHTFLOW_MAX_PARALLEL must be a positive integer")?;
        }
        if let Some(timeout) = lookup("INSIGHTFLOW_NODE_TIMEOUT") {
            self.engine.node_timeout = humantime::parse_duration(&timeout)
                .context("INSIGHTFLOW_NODE_TIMEOUT must be a duration like 30s")?;
        }
        if let Some(timeout) = lookup("INSIGHTFLOW_EXECUTION_TIMEOUT") {
            self.engine.execution_timeout = Some(
                humantime::parse_duration(&timeout)
                    .context("INSIGHTFLOW_EXECUTION_TIMEOUT must be a duration like 5m")?,
            );
        }
        if let Some(tick) = lookup("INSIGHTFLOW_TICK_INTERVAL") {
            self.engine.tick_interval = humantime::parse_duration(&tick)
                .context("INSIGHTFLOW_TICK_INTERVAL must be a duration like 100ms")?;
        }
        if let Some(attempts) = lookup("INSIGHTFLOW_MAX_ATTEMPTS") {
            self.engine.retry.max_attempts = attempts
                .parse()
                .context("INSIGHTFLOW_MAX_ATTEMPTS must be a positive integer")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.engine.max_parallel_nodes, 4);
        assert!(config.agents.use_defaults);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("insightflow.yaml");
        std::fs::write(
            &path,
            r#"
engine:
  max_parallel_nodes: 8
  node_timeout: 30s
  retry:
    max_attempts: 3
agents:
  use_defaults: false
  agents:
    - id: solo
      name: Solo
      role: generalist
      capabilities: [data_extraction]
logging:
  level: debug
  format: json
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.engine.max_parallel_nodes, 8);
        assert_eq!(config.engine.node_timeout, Duration::from_secs(30));
        assert_eq!(config.engine.retry.max_attempts, 3);
        assert!(!config.agents.use_defaults);
        assert_eq!(config.agents.agents[0].id, "solo");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(Config::load(Some(dir.path().join("absent.yaml"))).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("INSIGHTFLOW_LOG_LEVEL", "trace"),
            ("INSIGHTFLOW_MAX_PARALLEL", "2"),
            ("INSIGHTFLOW_EXECUTION_TIMEOUT", "5m"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.engine.max_parallel_nodes, 2);
        assert_eq!(
            config.engine.execution_timeout,
            Some(Duration::from_secs(300))
        );
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = Config::default();
        let result = config.apply_env(|key| {
            (key == "INSIGHTFLOW_MAX_PARALLEL").then(|| "many".to_string())
        });
        assert!(result.is_err());
    }
}
