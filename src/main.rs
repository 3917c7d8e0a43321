use std::process::ExitCode;

use config::AutohealConfig;
use health::HealthLoop;
use metrics::{MetricsServer, RestartMetrics};
use notifier::WebhookNotifier;
use runtime::DockerRuntime;

mod cli;
mod config;
mod health;
mod metrics;
mod notifier;
mod runtime;
mod signals;

#[tokio::main]
async fn main() -> ExitCode {
    // Load the env file first so it can set RUST_LOG
    let env_file = cli::load_env_file();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match env_file {
        Ok(path) => log::debug!("Loaded environment from {path:?}"),
        Err(e) if cli::get_cli_args().env_file.is_some() => {
            log::warn!("Unable to load env file: {e}")
        }
        Err(_) => {}
    }

    let config = AutohealConfig::from_env();
    log::debug!("{config:?}");

    let notifier = match WebhookNotifier::new(&config) {
        Ok(notifier) => notifier,
        Err(e) => {
            log::error!("Unable to create the webhook client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let metrics = RestartMetrics::from_enabled(config.metrics_enabled);
    if metrics.is_enabled() {
        let server = match MetricsServer::bind(metrics.clone(), config.metrics_port).await {
            Ok(server) => server,
            Err(e) => {
                log::error!("{e}");
                return ExitCode::FAILURE;
            }
        };
        log::info!(
            "{} Serving metrics at : {} /metrics",
            health::timestamp(),
            config.metrics_port
        );
        // Runs for the lifetime of the process; never joined
        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                log::error!("{e}");
                std::process::exit(1);
            }
        });
    }

    if let Err(e) = signals::handle_termination() {
        log::warn!("Unable to install signal handlers: {e}");
    }

    log::info!(
        "Monitoring containers for unhealthy status in {:?}",
        config.start_period
    );
    tokio::time::sleep(config.start_period).await;
    let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Ready]);

    let health = HealthLoop::new(
        DockerRuntime::new(&config),
        notifier,
        metrics,
        config.interval,
    );
    health.run().await;

    ExitCode::SUCCESS
}
