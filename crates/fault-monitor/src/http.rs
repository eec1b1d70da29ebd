//! HTTP server exposing Prometheus metrics and the current monitor status.

use axum::{extract::State, routing::get, Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::verifier::MonitorStatus;

/// Configuration for the HTTP server
#[derive(Clone)]
pub struct HttpConfig {
    /// Host and port binding for the HTTP server (e.g., "127.0.0.1:7300")
    pub metrics_host: String,
}

/// HTTP server that serves `/metrics` and `/status`
pub struct HttpServer {
    config: HttpConfig,
    state: AppState,
    rx_shutdown: broadcast::Receiver<()>,
}

#[derive(Clone)]
pub struct AppState {
    prometheus: PrometheusHandle,
    rx_status: watch::Receiver<MonitorStatus>,
}

impl HttpServer {
    pub fn new(
        config: HttpConfig,
        prometheus: PrometheusHandle,
        rx_status: watch::Receiver<MonitorStatus>,
        rx_shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            state: AppState {
                prometheus,
                rx_status,
            },
            rx_shutdown,
        }
    }

    async fn run_inner(&self) -> Result<(), std::io::Error> {
        info!("Starting HTTP server on {}", self.config.metrics_host);

        let app = router(self.state.clone());
        let listener = TcpListener::bind(&self.config.metrics_host).await?;
        let mut rx_shutdown = self.rx_shutdown.resubscribe();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { rx_shutdown.recv().await.unwrap_or_default() })
            .await
    }

    pub async fn run(&self) -> Result<(), ()> {
        match self.run_inner().await {
            Err(err) => {
                error!("HTTP server exited: {}", err);
                Err(())
            }
            Ok(()) => {
                info!("HTTP server terminated");
                Ok(())
            }
        }
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(get_metrics))
        .route("/status", get(get_status))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Render all registered metrics in the Prometheus text format
pub async fn get_metrics(State(state): State<AppState>) -> String {
    state.prometheus.render()
}

/// Get the status published after the latest tick
///
/// # Returns
/// * `Json<MonitorStatus>` - Cursor position, gauge values and the alarm state
pub async fn get_status(State(state): State<AppState>) -> Json<MonitorStatus> {
    Json(*state.rx_status.borrow())
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, http::StatusCode};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    use super::*;

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn state(status: MonitorStatus) -> (AppState, watch::Sender<MonitorStatus>) {
        let (tx_status, rx_status) = watch::channel(status);
        let prometheus = PrometheusBuilder::new().build_recorder().handle();
        (
            AppState {
                prometheus,
                rx_status,
            },
            tx_status,
        )
    }

    #[tokio::test]
    async fn test_status_reflects_latest_snapshot() {
        let (state, tx_status) = state(MonitorStatus::default());
        let app = router(state);

        let response = app
            .clone()
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["current_output_index"], 0);
        assert_eq!(json["highest_checked_index"], serde_json::Value::Null);
        assert_eq!(json["is_mismatched"], false);

        tx_status.send_modify(|status| {
            status.current_output_index = 5;
            status.metrics.set_highest_known_index(9);
            status.metrics.set_mismatched(true);
        });

        let response = app
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["current_output_index"], 5);
        assert_eq!(json["highest_known_index"], 9);
        assert_eq!(json["is_mismatched"], true);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (state, _tx_status) = state(MonitorStatus::default());
        let response = router(state)
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
