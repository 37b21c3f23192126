//! Liveness and readiness probes (§6).

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

/// Liveness probe body.
#[derive(Debug, Serialize)]
pub struct LivenessBody {
    status: &'static str,
}

/// `GET /health`, `GET /health/live` — the process is running. Does not
/// touch any dependency.
#[allow(clippy::unused_async)]
pub async fn live() -> Json<LivenessBody> {
    Json(LivenessBody { status: "ok" })
}

/// Readiness probe body.
#[derive(Debug, Serialize)]
pub struct ReadinessBody {
    status: &'static str,
    database: &'static str,
}

/// `GET /health/ready` — can the service actually serve traffic. Opens and
/// immediately rolls back a unit of work as a database round-trip check.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadinessBody>) {
    match state.uow_factory.begin().await {
        Ok(uow) => {
            let _ = uow.rollback().await;
            (StatusCode::OK, Json(ReadinessBody { status: "ok", database: "ok" }))
        }
        Err(err) => {
            tracing::error!(error = %err, "readiness check failed: database unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessBody { status: "unavailable", database: "unreachable" }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn live_always_reports_ok() {
        let Json(body) = live().await;
        assert_eq!(body.status, "ok");
    }
}
