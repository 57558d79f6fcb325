use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::domain::MemberRegistration;
use super::repository::MemberRepository;
use super::service::MemberService;
use crate::http::{error_response, rejection_response, success};

/// Public member registration endpoints.
pub fn member_router<R>(service: Arc<MemberService<R>>) -> Router
where
    R: MemberRepository + 'static,
{
    Router::new()
        .route("/api/v1/members/join-movement", post(register_handler::<R>))
        .route(
            "/api/v1/members/registration-status",
            get(registration_status_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn register_handler<R>(
    State(service): State<Arc<MemberService<R>>>,
    payload: Result<Json<MemberRegistration>, JsonRejection>,
) -> Response
where
    R: MemberRepository + 'static,
{
    let Json(registration) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match service.register(registration).await {
        Ok(member) => success(
            StatusCode::CREATED,
            member,
            "Welcome to the movement! Your membership has been registered",
        ),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn registration_status_handler<R>(
    State(service): State<Arc<MemberService<R>>>,
) -> Response
where
    R: MemberRepository + 'static,
{
    match service.registration_open() {
        Ok(enabled) => success(
            StatusCode::OK,
            json!({ "enabled": enabled }),
            "Registration status retrieved",
        ),
        Err(err) => error_response(&err),
    }
}
