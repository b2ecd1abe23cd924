//! Watcher configuration

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;
use watcher_lib::WatchConfig;

/// Watcher configuration, read from the process environment
#[derive(Debug, Clone, Deserialize)]
pub struct WatcherConfig {
    /// Namespace to watch
    #[serde(default = "default_namespace")]
    pub watch_namespace: String,

    /// StatefulSet names, in restart order
    #[serde(default, deserialize_with = "comma_separated")]
    pub target_sts: Vec<String>,

    /// Poll interval in seconds
    #[serde(default = "default_sleep_seconds")]
    pub sleep_seconds: u64,

    /// Delay after restarting the first StatefulSet, in seconds
    #[serde(default = "default_restart_delay_seconds")]
    pub restart_delay_seconds: u64,

    /// Verbose diagnostics
    #[serde(default)]
    pub debug: bool,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_sleep_seconds() -> u64 {
    30
}

fn default_restart_delay_seconds() -> u64 {
    30
}

fn default_api_port() -> u16 {
    8080
}

/// Split a comma-separated list, trimming names and dropping blank entries
fn comma_separated<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect())
}

impl WatcherConfig {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self> {
        Self::from_source(config::Environment::default())
    }

    fn from_source(env: config::Environment) -> Result<Self> {
        // Values stay strings until deserialized, so a name like "123" is
        // still a StatefulSet name. Empty variables fall back to defaults.
        let config = config::Config::builder()
            .add_source(env.ignore_empty(true))
            .build()
            .context("Failed to read watcher environment")?;

        let mut loaded: WatcherConfig = config
            .try_deserialize()
            .context("Invalid watcher configuration")?;
        loaded.validate()?;
        Ok(loaded)
    }

    fn validate(&self) -> Result<()> {
        if self.sleep_seconds == 0 {
            bail!("SLEEP_SECONDS must be greater than zero");
        }
        if self.watch_namespace.trim().is_empty() {
            bail!("WATCH_NAMESPACE must not be empty");
        }
        Ok(())
    }

    /// Immutable loop configuration handed to the watcher core
    pub fn watch_config(&self) -> WatchConfig {
        WatchConfig::new(&self.watch_namespace, self.target_sts.iter().cloned())
            .with_poll_interval(Duration::from_secs(self.sleep_seconds))
            .with_stagger_delay(Duration::from_secs(self.restart_delay_seconds))
            .with_verbose(self.debug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<WatcherConfig> {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WatcherConfig::from_source(config::Environment::default().source(Some(source)))
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = load(&[]).unwrap();

        assert_eq!(config.watch_namespace, "default");
        assert!(config.target_sts.is_empty());
        assert_eq!(config.sleep_seconds, 30);
        assert_eq!(config.restart_delay_seconds, 30);
        assert!(!config.debug);
        assert_eq!(config.api_port, 8080);
    }

    #[test]
    fn test_targets_parsed_in_order() {
        let config = load(&[
            ("WATCH_NAMESPACE", "data"),
            ("TARGET_STS", "kafka, zookeeper,,"),
            ("SLEEP_SECONDS", "10"),
            ("RESTART_DELAY_SECONDS", "0"),
            ("DEBUG", "true"),
        ])
        .unwrap();

        assert_eq!(config.target_sts, vec!["kafka", "zookeeper"]);

        let watch = config.watch_config();
        assert_eq!(watch.namespace, "data");
        assert_eq!(watch.targets, vec!["kafka", "zookeeper"]);
        assert_eq!(watch.poll_interval, Duration::from_secs(10));
        assert_eq!(watch.stagger_delay, Duration::ZERO);
        assert!(watch.verbose);
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        assert!(load(&[("SLEEP_SECONDS", "0")]).is_err());
    }

    #[test]
    fn test_non_numeric_interval_rejected() {
        assert!(load(&[("SLEEP_SECONDS", "soon")]).is_err());
    }

    #[test]
    fn test_numeric_and_boolean_looking_names_kept_as_names() {
        let config = load(&[("TARGET_STS", "123")]).unwrap();
        assert_eq!(config.target_sts, vec!["123"]);

        let config = load(&[("TARGET_STS", "true")]).unwrap();
        assert_eq!(config.target_sts, vec!["true"]);

        let config = load(&[("TARGET_STS", "007,kafka")]).unwrap();
        assert_eq!(config.target_sts, vec!["007", "kafka"]);
    }

    #[test]
    fn test_empty_variables_use_defaults() {
        let config = load(&[
            ("SLEEP_SECONDS", ""),
            ("RESTART_DELAY_SECONDS", ""),
            ("API_PORT", ""),
            ("TARGET_STS", ""),
        ])
        .unwrap();

        assert_eq!(config.sleep_seconds, 30);
        assert_eq!(config.restart_delay_seconds, 30);
        assert_eq!(config.api_port, 8080);
        assert!(config.target_sts.is_empty());
    }
}
