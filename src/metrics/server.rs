use std::net::SocketAddr;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::net::TcpListener;

use super::{MetricsError, RestartMetrics};

const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Serves `GET /metrics` on all interfaces.
pub struct MetricsServer {
    metrics: RestartMetrics,
    listener: TcpListener,
}

impl MetricsServer {
    /// Bind the listener up front so a port conflict is reported at startup.
    pub async fn bind(metrics: RestartMetrics, port: u16) -> Result<Self, MetricsError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await.map_err(MetricsError::Bind)?;
        Ok(Self { metrics, listener })
    }

    #[cfg(test)]
    pub fn local_addr(&self) -> Result<SocketAddr, MetricsError> {
        self.listener.local_addr().map_err(MetricsError::Bind)
    }

    pub async fn run(self) -> Result<(), MetricsError> {
        let app = router(self.metrics);
        axum::serve(self.listener, app)
            .await
            .map_err(MetricsError::Serve)
    }
}

fn router(metrics: RestartMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<RestartMetrics>) -> Response {
    match metrics.encode() {
        Ok(body) => (StatusCode::OK, [(CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            log::warn!("{e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn spawn_server(metrics: RestartMetrics) -> SocketAddr {
        let server = MetricsServer::bind(metrics, 0)
            .await
            .expect("Failed to bind metrics server");
        let port = server.local_addr().expect("No local address").port();
        tokio::spawn(server.run());
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[tokio::test]
    async fn test_serves_metrics() {
        let metrics = RestartMetrics::new();
        metrics.record("/web", "Failed to restart the container");
        let addr = spawn_server(metrics).await;

        let response = reqwest::get(format!("http://{addr}/metrics"))
            .await
            .expect("Request failed");
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some(OPENMETRICS_CONTENT_TYPE)
        );

        let body = response.text().await.expect("No body");
        assert!(
            body.contains(
                r#"containers_restarts_total{container="/web",result="Failed to restart the container"} 1"#
            ),
            "{body}"
        );
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let addr = spawn_server(RestartMetrics::new()).await;

        let response = reqwest::get(format!("http://{addr}/"))
            .await
            .expect("Request failed");
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let first = MetricsServer::bind(RestartMetrics::new(), 0)
            .await
            .expect("Failed to bind metrics server");
        let port = first.local_addr().expect("No local address").port();

        let second = MetricsServer::bind(RestartMetrics::new(), port).await;
        assert!(matches!(second, Err(MetricsError::Bind(_))));
    }
}
