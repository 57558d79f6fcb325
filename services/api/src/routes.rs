use crate::infra::{AppState, Services};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use movement::workflows::admin::admin_router;
use movement::workflows::applications::application_router;
use movement::workflows::members::member_router;
use movement::workflows::recovery::recovery_router;
use serde_json::json;

/// Every workflow router plus the operational endpoints.
pub(crate) fn app_routes(services: &Services) -> Router {
    Router::new()
        .merge(application_router(services.intake.clone()))
        .merge(member_router(services.members.clone()))
        .merge(recovery_router(
            services.recovery.clone(),
            services.auth.issuer(),
        ))
        .merge(admin_router(services.admin.clone()))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
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
