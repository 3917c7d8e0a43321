//! Runtime parameters resolved from the environment.
//!
//! Every option has a default. Missing, empty or unparsable values fall back
//! to it, so reading the configuration never fails.

use std::time::Duration;

/// Label filter value that disables label restriction.
pub const ALL_CONTAINERS: &str = "all";

const DEFAULT_DOCKER_SOCK: &str = "/var/run/docker.sock";
const DEFAULT_INTERVAL_SECS: u64 = 5;
const DEFAULT_START_PERIOD_SECS: u64 = 0;
pub const DEFAULT_STOP_TIMEOUT: &str = "10";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_WEBHOOK_KEY: &str = "text";
const DEFAULT_METRICS_PORT: u16 = 2333;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutohealConfig {
    /// Unix socket of the docker daemon.
    pub docker_sock: String,
    /// `all`, or a label key that must be set to `true` on a container.
    pub container_label: String,
    pub interval: Duration,
    /// Pause before the first poll.
    pub start_period: Duration,
    /// Stop timeout in seconds used when a container has no override.
    pub default_stop_timeout: String,
    /// Applied to both docker and webhook requests.
    pub request_timeout: Duration,
    pub webhook_url: Option<String>,
    pub webhook_key: String,
    pub metrics_port: u16,
    pub metrics_enabled: bool,
}

impl Default for AutohealConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl AutohealConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty variables are treated the same as unset ones
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let string = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        let seconds = |name: &str, default: u64| {
            let secs = get(name).and_then(|v| match v.trim().parse::<u64>() {
                Ok(secs) => Some(secs),
                Err(e) => {
                    log::debug!("Invalid value {v:?} for {name} ({e}), using {default}");
                    None
                }
            });
            Duration::from_secs(secs.unwrap_or(default))
        };

        // A zero timeout would leave docker and webhook calls unbounded
        let request_timeout = Some(seconds("CURL_TIMEOUT", DEFAULT_REQUEST_TIMEOUT_SECS))
            .filter(|timeout| !timeout.is_zero())
            .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));

        let metrics_port = get("METRICS_PORT")
            .and_then(|v| match v.trim().parse::<u16>() {
                Ok(port) => Some(port),
                Err(e) => {
                    log::debug!("Invalid value {v:?} for METRICS_PORT ({e})");
                    None
                }
            })
            .unwrap_or(DEFAULT_METRICS_PORT);

        let metrics_enabled = get("METRICS_ENABLED")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(true);

        Self {
            docker_sock: string("DOCKER_SOCK", DEFAULT_DOCKER_SOCK),
            container_label: string("AUTOHEAL_CONTAINER_LABEL", ALL_CONTAINERS),
            interval: seconds("AUTOHEAL_INTERVAL", DEFAULT_INTERVAL_SECS),
            start_period: seconds("AUTOHEAL_START_PERIOD", DEFAULT_START_PERIOD_SECS),
            default_stop_timeout: string("AUTOHEAL_DEFAULT_STOP_TIMEOUT", DEFAULT_STOP_TIMEOUT),
            request_timeout,
            webhook_url: get("WEBHOOK_URL"),
            webhook_key: string("WEBHOOK_KEY", DEFAULT_WEBHOOK_KEY),
            metrics_port,
            metrics_enabled,
        }
    }

    /// Whether the label filter restricts the listing at all.
    pub fn filters_by_label(&self) -> bool {
        self.container_label != ALL_CONTAINERS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> AutohealConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AutohealConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = AutohealConfig::default();
        assert_eq!(config.docker_sock, "/var/run/docker.sock");
        assert_eq!(config.container_label, "all");
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.start_period, Duration::ZERO);
        assert_eq!(config.default_stop_timeout, "10");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.webhook_url, None);
        assert_eq!(config.webhook_key, "text");
        assert_eq!(config.metrics_port, 2333);
        assert!(config.metrics_enabled);
        assert!(!config.filters_by_label());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DOCKER_SOCK", "/run/user/1000/docker.sock"),
            ("AUTOHEAL_CONTAINER_LABEL", "autoheal"),
            ("AUTOHEAL_INTERVAL", "15"),
            ("AUTOHEAL_START_PERIOD", "60"),
            ("AUTOHEAL_DEFAULT_STOP_TIMEOUT", "20"),
            ("CURL_TIMEOUT", "3"),
            ("WEBHOOK_URL", "https://hooks.example.com/abc"),
            ("WEBHOOK_KEY", "content"),
            ("METRICS_PORT", "9100"),
            ("METRICS_ENABLED", "false"),
        ]);
        assert_eq!(config.docker_sock, "/run/user/1000/docker.sock");
        assert_eq!(config.container_label, "autoheal");
        assert!(config.filters_by_label());
        assert_eq!(config.interval, Duration::from_secs(15));
        assert_eq!(config.start_period, Duration::from_secs(60));
        assert_eq!(config.default_stop_timeout, "20");
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(
            config.webhook_url.as_deref(),
            Some("https://hooks.example.com/abc")
        );
        assert_eq!(config.webhook_key, "content");
        assert_eq!(config.metrics_port, 9100);
        assert!(!config.metrics_enabled);
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = config_from(&[
            ("AUTOHEAL_INTERVAL", "five"),
            ("AUTOHEAL_START_PERIOD", "-3"),
            ("CURL_TIMEOUT", "0"),
            ("METRICS_PORT", "70000"),
        ]);
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.start_period, Duration::ZERO);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.metrics_port, 2333);

        let config = config_from(&[("CURL_TIMEOUT", "1.5")]);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let config = config_from(&[
            ("WEBHOOK_URL", ""),
            ("AUTOHEAL_CONTAINER_LABEL", ""),
            ("METRICS_ENABLED", ""),
        ]);
        assert_eq!(config.webhook_url, None);
        assert_eq!(config.container_label, "all");
        assert!(config.metrics_enabled);
    }

    #[test]
    fn test_metrics_enabled_flag() {
        assert!(config_from(&[("METRICS_ENABLED", "TRUE")]).metrics_enabled);
        assert!(!config_from(&[("METRICS_ENABLED", "1")]).metrics_enabled);
        assert!(!config_from(&[("METRICS_ENABLED", "no")]).metrics_enabled);
    }
}
