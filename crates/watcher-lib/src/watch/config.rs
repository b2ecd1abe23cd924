//! Watch loop configuration

use std::time::Duration;

/// Immutable configuration of the watch loop, fixed for the process lifetime
#[derive(Debug, Clone, PartialEq)]
pub struct WatchConfig {
    /// Namespace to observe and remediate in
    pub namespace: String,
    /// StatefulSets to restart, in restart order
    pub targets: Vec<String>,
    /// Pause between cycles (default: 30 seconds)
    pub poll_interval: Duration,
    /// Pause after restarting the first target (default: 30 seconds)
    pub stagger_delay: Duration,
    /// Emit per-cycle diagnostic detail
    pub verbose: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            targets: Vec::new(),
            poll_interval: Duration::from_secs(30),
            stagger_delay: Duration::from_secs(30),
            verbose: false,
        }
    }
}

impl WatchConfig {
    pub fn new<I, S>(namespace: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespace: namespace.into(),
            targets: targets.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_stagger_delay(mut self, delay: Duration) -> Self {
        self.stagger_delay = delay;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_config_default() {
        let config = WatchConfig::default();
        assert_eq!(config.namespace, "default");
        assert!(config.targets.is_empty());
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.stagger_delay, Duration::from_secs(30));
        assert!(!config.verbose);
    }

    #[test]
    fn test_watch_config_builder_keeps_target_order() {
        let config = WatchConfig::new("ns", ["b", "a"])
            .with_poll_interval(Duration::from_secs(5))
            .with_stagger_delay(Duration::ZERO)
            .with_verbose(true);

        assert_eq!(config.targets, vec!["b", "a"]);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.stagger_delay, Duration::ZERO);
        assert!(config.verbose);
    }
}
