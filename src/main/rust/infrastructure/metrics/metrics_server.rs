use tokio::sync::watch;
use warp::Filter;

use super::PrometheusReporter;
use crate::domain::entities::SessionSnapshot;

const SERVICE_NAME: &str = "pipeline-vcast";

/// Health check response structure
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

/// Broadcast session view served on /status
#[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct StatusResponse {
    pub status: String,
    pub session_id: Option<String>,
    pub broadcast_time: Option<String>,
}

impl From<&SessionSnapshot> for StatusResponse {
    fn from(snapshot: &SessionSnapshot) -> Self {
        Self {
            status: snapshot.status.to_string(),
            session_id: snapshot.session_id.clone(),
            broadcast_time: snapshot.broadcast_time(),
        }
    }
}

pub fn routes(
    snapshots: watch::Receiver<SessionSnapshot>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection>
       + Clone
       + Send
       + Sync
       + 'static {
    // CORS configuration for browser access
    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "OPTIONS"])
        .allow_headers(vec!["Content-Type"]);

    let metrics_route = warp::path("metrics").map(|| {
        let body = PrometheusReporter::gather_metrics();
        warp::reply::with_header(body, "content-type", "text/plain; version=0.0.4; charset=utf-8")
    });

    let health_route = warp::path("health").map(|| {
        let response = HealthResponse {
            status: "healthy",
            service: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
        };
        warp::reply::json(&response)
    });

    // Liveness probe endpoint (minimal check - is the process running?)
    let liveness_route =
        warp::path("livez").map(|| warp::reply::with_status("OK", warp::http::StatusCode::OK));

    // Readiness probe endpoint (can the service accept traffic?)
    let readiness_route = warp::path("readyz").map(|| {
        let response = HealthResponse {
            status: "ready",
            service: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
        };
        warp::reply::json(&response)
    });

    let status_route = warp::path("status").map(move || {
        let response = StatusResponse::from(&*snapshots.borrow());
        warp::reply::json(&response)
    });

    metrics_route
        .or(health_route)
        .or(liveness_route)
        .or(readiness_route)
        .or(status_route)
        .with(cors)
}

pub async fn serve_metrics(port: u16, snapshots: watch::Receiver<SessionSnapshot>) {
    tracing::info!("Metrics server starting on port {}", port);

    warp::serve(routes(snapshots))
        .run(([0, 0, 0, 0], port))
        .await;
}
