//! The health check loop.
//!
//! Each cycle lists the unhealthy containers, handles them one after the
//! other in listing order, then sleeps for the configured interval. Cycles
//! never overlap and nothing is retried within a cycle.

use std::time::Duration;

use crate::metrics::RestartMetrics;
use crate::notifier::Notify;
use crate::runtime::{ContainerRecord, ContainerRuntime};

mod outcome;

pub use outcome::{Decision, Outcome, OutcomeKind};

const TIME_FORMAT: &str = "%Y.%m.%d %H:%M:%S";

/// Local time formatted the way every log and webhook message starts.
pub fn timestamp() -> String {
    chrono::Local::now().format(TIME_FORMAT).to_string()
}

pub struct HealthLoop<R, N> {
    runtime: R,
    notifier: N,
    metrics: RestartMetrics,
    interval: Duration,
}

impl<R, N> HealthLoop<R, N>
where
    R: ContainerRuntime,
    N: Notify,
{
    pub fn new(runtime: R, notifier: N, metrics: RestartMetrics, interval: Duration) -> Self {
        Self {
            runtime,
            notifier,
            metrics,
            interval,
        }
    }

    /// Run cycles until the process is terminated.
    pub async fn run(&self) {
        loop {
            self.run_cycle().await;
            tokio::time::sleep(self.interval).await;
        }
    }

    /// One poll of the runtime. Returns the outcome of every listed
    /// container, in listing order. A failed listing abandons the cycle.
    pub async fn run_cycle(&self) -> Vec<Outcome> {
        let containers = match self.runtime.list_unhealthy().await {
            Ok(containers) => containers,
            Err(e) => {
                log::error!("Failed to list containers. {e}");
                return Vec::new();
            }
        };

        let mut outcomes = Vec::with_capacity(containers.len());
        for container in &containers {
            outcomes.push(self.handle_container(container).await);
        }

        if !outcomes.is_empty() {
            let restarts = outcomes.iter().filter(|o| o.is_restart()).count();
            log::debug!(
                "Cycle handled {} unhealthy containers, {restarts} restart attempts",
                outcomes.len()
            );
        }
        outcomes
    }

    async fn handle_container(&self, container: &ContainerRecord) -> Outcome {
        let now = timestamp();

        let kind = match Decision::for_container(container) {
            Decision::NoName => OutcomeKind::SkippedNoName,
            Decision::AlreadyRestarting => OutcomeKind::SkippedAlreadyRestarting,
            Decision::Restart => {
                log::info!(
                    "{now} Container {} ({}) found to be unhealthy - Restarting container now.",
                    container.display_name(),
                    container.short_id()
                );
                match self
                    .runtime
                    .restart(&container.id, container.stop_timeout_override())
                    .await
                {
                    Ok(()) => OutcomeKind::Restarted,
                    Err(e) => {
                        log::warn!("Restart of {} failed: {e}", container.short_id());
                        OutcomeKind::RestartFailed
                    }
                }
            }
        };

        let outcome = Outcome::new(kind, container, now);
        match outcome.result_label() {
            // Skips are only logged
            None => log::info!("{}", outcome.message()),
            Some(result) => {
                self.metrics.record(&outcome.name, result);
                if let Err(e) = self.notifier.notify(&outcome.message()).await {
                    log::warn!("Failed to call webhook. {e}");
                }
            }
        }
        outcome
    }
}
