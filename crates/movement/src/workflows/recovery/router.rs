use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::domain::RecoveryEntry;
use super::service::RecoveryService;
use crate::http::{error_response, rejection_response, success};
use crate::workflows::admin::auth::{require_admin, TokenIssuer};
use crate::workflows::members::{MemberProfile, MemberRepository};
use crate::workflows::recovery::RecoveryRepository;

#[derive(Debug, Deserialize)]
pub(crate) struct BulkCreateRequest {
    pub entries: Vec<RecoveryEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SendInvitesRequest {
    #[serde(default)]
    pub emails: Vec<String>,
}

/// Public token endpoints plus the admin-only management endpoints.
pub fn recovery_router<R>(service: Arc<RecoveryService<R>>, issuer: Arc<TokenIssuer>) -> Router
where
    R: RecoveryRepository + MemberRepository + 'static,
{
    let admin = Router::new()
        .route("/api/v1/recovery/bulk-create", post(bulk_create_handler::<R>))
        .route("/api/v1/recovery/pending", get(pending_handler::<R>))
        .route("/api/v1/recovery/send-invites", post(send_invites_handler::<R>))
        .route_layer(middleware::from_fn_with_state(issuer, require_admin));

    Router::new()
        .route("/api/v1/recovery/validate/:token", get(validate_handler::<R>))
        .route("/api/v1/recovery/complete/:token", post(complete_handler::<R>))
        .merge(admin)
        .with_state(service)
}

pub(crate) async fn bulk_create_handler<R>(
    State(service): State<Arc<RecoveryService<R>>>,
    payload: Result<Json<BulkCreateRequest>, JsonRejection>,
) -> Response
where
    R: RecoveryRepository + MemberRepository + 'static,
{
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    let outcome = service.bulk_create(request.entries);
    let message = format!(
        "Created {} recovery entries, {} failed",
        outcome.success.len(),
        outcome.failed.len()
    );
    success(StatusCode::CREATED, outcome, message)
}

pub(crate) async fn pending_handler<R>(State(service): State<Arc<RecoveryService<R>>>) -> Response
where
    R: RecoveryRepository + MemberRepository + 'static,
{
    match service.pending() {
        Ok(pending) => success(StatusCode::OK, pending, "Pending recoveries retrieved"),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn send_invites_handler<R>(
    State(service): State<Arc<RecoveryService<R>>>,
    payload: Option<Json<SendInvitesRequest>>,
) -> Response
where
    R: RecoveryRepository + MemberRepository + 'static,
{
    let request = payload.map(|Json(body)| body).unwrap_or_default();
    match service.send_invites(&request.emails).await {
        Ok(report) => {
            let message = report.message.clone();
            success(StatusCode::OK, report, message)
        }
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn validate_handler<R>(
    State(service): State<Arc<RecoveryService<R>>>,
    Path(token): Path<String>,
) -> Response
where
    R: RecoveryRepository + MemberRepository + 'static,
{
    match service.validate(&token) {
        Ok(validation) => success(StatusCode::OK, validation, "Recovery token is valid"),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn complete_handler<R>(
    State(service): State<Arc<RecoveryService<R>>>,
    Path(token): Path<String>,
    payload: Result<Json<MemberProfile>, JsonRejection>,
) -> Response
where
    R: RecoveryRepository + MemberRepository + 'static,
{
    let Json(profile) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match service.complete(&token, profile).await {
        Ok(member) => success(StatusCode::OK, member, "Profile updated successfully"),
        Err(err) => error_response(&err),
    }
}
