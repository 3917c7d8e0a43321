//! Docker runtime client.
//!
//! Restarts go through bollard. The listing is fetched over the same socket
//! with reqwest and decoded into [`ListedContainer`], because bollard's
//! `ContainerSummary` rejects any state it does not know about.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::{RestartContainerOptions, RestartContainerOptionsBuilder};
use tokio::sync::OnceCell;

use super::{
    ContainerRecord, ContainerRuntime, ListedContainer, RuntimeError, build_filters,
    resolve_stop_timeout,
};
use crate::config::AutohealConfig;

/// Requests over a Unix socket still need an authority; dockerd ignores it.
const LIST_URL: &str = "http://localhost/containers/json";

/// Talks to the docker daemon over its Unix control socket.
///
/// The bollard connection is opened on first use, so a daemon that is not
/// up yet only fails the current cycle instead of the whole process.
pub struct DockerRuntime {
    docker: OnceCell<Docker>,
    http: OnceCell<reqwest::Client>,
    socket: String,
    request_timeout: Duration,
    filters: String,
    default_stop_timeout: String,
}

impl DockerRuntime {
    pub fn new(config: &AutohealConfig) -> Self {
        if config.filters_by_label() {
            log::info!(
                "Only monitoring containers labelled {}=true",
                config.container_label
            );
        }
        Self {
            docker: OnceCell::new(),
            http: OnceCell::new(),
            socket: config.docker_sock.clone(),
            request_timeout: config.request_timeout,
            filters: encode_filters(&build_filters(&config.container_label)),
            default_stop_timeout: config.default_stop_timeout.clone(),
        }
    }

    async fn docker(&self) -> Result<&Docker, RuntimeError> {
        let docker = self
            .docker
            .get_or_try_init(|| async {
                log::debug!("Connecting to docker at {}", self.socket);
                Docker::connect_with_unix(
                    &self.socket,
                    self.request_timeout.as_secs(),
                    bollard::API_DEFAULT_VERSION,
                )
            })
            .await?;
        Ok(docker)
    }

    async fn http(&self) -> Result<&reqwest::Client, RuntimeError> {
        let client = self
            .http
            .get_or_try_init(|| async {
                reqwest::Client::builder()
                    .unix_socket(self.socket.as_str())
                    .timeout(self.request_timeout)
                    .build()
            })
            .await?;
        Ok(client)
    }
}

fn encode_filters(filters: &HashMap<String, Vec<String>>) -> String {
    // Serializing a map of strings cannot fail
    serde_json::to_string(filters).unwrap_or_default()
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_unhealthy(&self) -> Result<Vec<ContainerRecord>, RuntimeError> {
        let body = self
            .http()
            .await?
            .get(LIST_URL)
            .query(&[("filters", self.filters.as_str())])
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let containers: Vec<ListedContainer> = serde_json::from_slice(&body)?;
        Ok(containers.into_iter().map(ContainerRecord::from).collect())
    }

    async fn restart(&self, id: &str, timeout_override: Option<&str>) -> Result<(), RuntimeError> {
        let docker = self.docker().await?;
        let timeout = resolve_stop_timeout(timeout_override, &self.default_stop_timeout);

        let options: RestartContainerOptions =
            RestartContainerOptionsBuilder::new().t(timeout).build();

        match docker.restart_container(id, Some(options)).await {
            Ok(_) => Ok(()),
            // Only transport failures count as a failed restart. An error
            // status from the daemon is reported but not acted upon.
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code,
                message,
            }) => {
                log::warn!("Docker answered {status_code} to the restart of {id}: {message}");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
