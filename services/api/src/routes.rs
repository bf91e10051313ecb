use crate::infra::AppState;
use applicant_intake::workflows::onboarding::{
    onboarding_router, ApplicantRepository, OnboardingState,
};
use axum::extract::DefaultBodyLimit;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;

/// Onboarding routes plus the operational endpoints. Anything unmatched is
/// served from the public directory (`home.html` and the admin assets).
pub(crate) fn with_onboarding_routes<R>(state: OnboardingState<R>, public_dir: &Path) -> Router
where
    R: ApplicantRepository + 'static,
{
    onboarding_router(state)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .fallback_service(ServeDir::new(public_dir))
}

/// Caps request bodies at `max_body_bytes` (413 beyond it) and aborts
/// requests that outlive `timeout` (408).
pub(crate) fn with_request_limits(router: Router, max_body_bytes: usize, timeout: Duration) -> Router {
    router
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TimeoutLayer::new(timeout))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
