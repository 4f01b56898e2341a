use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use switchboard_slack::CorrelationStore;

#[derive(Clone)]
pub struct HealthState {
    correlation: CorrelationStore,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub correlation: HealthCheck,
    pub checked_at: String,
}

pub fn router(correlation: CorrelationStore) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { correlation })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let correlation = correlation_check(&state.correlation).await;
    let ready = correlation.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "switchboard-server runtime initialized".to_string(),
        },
        correlation,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn correlation_check(store: &CorrelationStore) -> HealthCheck {
    let backend = store.backend_name();
    match store.check().await {
        Ok(()) => HealthCheck { status: "ready", detail: format!("{backend} backend reachable") },
        Err(error) => HealthCheck {
            status: "degraded",
            detail: format!("{backend} backend check failed: {error}"),
        },
    }
}
