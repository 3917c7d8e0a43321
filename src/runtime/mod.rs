//! Access to the container runtime.
//!
//! The health loop only needs two things from docker: the list of unhealthy
//! containers and a way to restart one of them. Both sit behind
//! [`ContainerRuntime`] so the loop can be driven without a daemon.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

pub mod docker;

pub use docker::DockerRuntime;

/// Per-container label overriding the default stop timeout.
pub const STOP_TIMEOUT_LABEL: &str = "autoheal.stop.timeout";

/// Used when neither the override nor the configured default is a valid
/// number of seconds.
const FALLBACK_STOP_TIMEOUT: i32 = 10;

const SHORT_ID_LEN: usize = 12;

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Socket failure, timeout, error status or any other failure talking
    /// to the daemon.
    #[error("Docker transport error: {0}")]
    Transport(#[source] BoxedError),
    /// The daemon answered with something that is not the expected JSON.
    #[error("Docker response decode error: {0}")]
    Decode(#[source] BoxedError),
}

impl From<bollard::errors::Error> for RuntimeError {
    fn from(err: bollard::errors::Error) -> Self {
        match err {
            bollard::errors::Error::JsonDataError { .. }
            | bollard::errors::Error::JsonSerdeError { .. } => RuntimeError::Decode(err.into()),
            err => RuntimeError::Transport(err.into()),
        }
    }
}

impl From<reqwest::Error> for RuntimeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RuntimeError::Decode(err.into())
        } else {
            RuntimeError::Transport(err.into())
        }
    }
}

impl From<serde_json::Error> for RuntimeError {
    fn from(err: serde_json::Error) -> Self {
        RuntimeError::Decode(err.into())
    }
}

/// A container as reported by one listing. Never kept across cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerRecord {
    pub id: String,
    pub names: Vec<String>,
    pub state: String,
    pub labels: HashMap<String, String>,
}

impl ContainerRecord {
    /// First 12 characters of the id, as printed by `docker ps`.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(SHORT_ID_LEN) {
            Some((end, _)) => &self.id[..end],
            None => &self.id,
        }
    }

    pub fn display_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or_default()
    }

    pub fn stop_timeout_override(&self) -> Option<&str> {
        self.labels
            .get(STOP_TIMEOUT_LABEL)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }
}

/// One entry of `GET /containers/json`, as far as the loop cares. The state
/// is kept as the daemon's raw string.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListedContainer {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub names: Option<Vec<String>>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub labels: Option<HashMap<String, String>>,
}

impl From<ListedContainer> for ContainerRecord {
    fn from(value: ListedContainer) -> Self {
        ContainerRecord {
            id: value.id,
            names: value.names.unwrap_or_default(),
            state: value.state.unwrap_or_default(),
            labels: value.labels.unwrap_or_default(),
        }
    }
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// List the containers whose health check is currently failing.
    async fn list_unhealthy(&self) -> Result<Vec<ContainerRecord>, RuntimeError>;

    /// Restart a container. `timeout_override` takes precedence over the
    /// configured default stop timeout when it is present and non-empty.
    async fn restart(&self, id: &str, timeout_override: Option<&str>) -> Result<(), RuntimeError>;
}

/// Listing filters: always `health=unhealthy`, plus `label=<label>=true`
/// unless every container is monitored.
pub fn build_filters(container_label: &str) -> HashMap<String, Vec<String>> {
    let mut filters = HashMap::new();
    filters.insert("health".to_string(), vec!["unhealthy".to_string()]);
    if container_label != crate::config::ALL_CONTAINERS {
        filters.insert("label".to_string(), vec![format!("{container_label}=true")]);
    }
    filters
}

/// Pick the stop timeout (in seconds) sent with a restart.
pub fn resolve_stop_timeout(timeout_override: Option<&str>, default_timeout: &str) -> i32 {
    let candidates = timeout_override
        .into_iter()
        .chain(std::iter::once(default_timeout))
        .filter(|t| !t.is_empty());

    for candidate in candidates {
        match candidate.trim().parse::<i32>() {
            Ok(timeout) if timeout >= 0 => return timeout,
            _ => log::warn!("Ignoring invalid stop timeout {candidate:?}"),
        }
    }
    FALLBACK_STOP_TIMEOUT
}
