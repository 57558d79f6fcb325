use super::common::*;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use crate::workflows::members::member_router;

fn join_request(body: String) -> Request<Body> {
    Request::post("/api/v1/members/join-movement")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .expect("request builds")
}

#[tokio::test]
async fn join_route_returns_created_member() {
    let harness = build_service();
    let router = member_router(harness.service.clone());

    let response = router
        .oneshot(join_request(registration_json().to_string()))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["success"], true);
    assert_eq!(payload["data"]["workEmail"], "ada.lovelace@sugria.com");
    assert_eq!(payload["data"]["dateOfBirth"], "1990-12-10");
    assert!(payload["data"]["education"]
        .get("otherCertifications")
        .is_none());
}

#[tokio::test]
async fn join_route_reports_closed_registration() {
    let harness = build_service();
    harness.gate.set_open(false).expect("toggle");
    let router = member_router(harness.service.clone());

    let response = router
        .oneshot(join_request(registration_json().to_string()))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "forbidden");
}

#[tokio::test]
async fn join_route_rejects_malformed_json() {
    let harness = build_service();
    let router = member_router(harness.service.clone());

    let response = router
        .oneshot(join_request("{\"firstName\":".to_string()))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["success"], false);
}

#[tokio::test]
async fn registration_status_reflects_the_gate() {
    let harness = build_service();
    let router = member_router(harness.service.clone());

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/v1/members/registration-status")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    let payload = read_json_body(response).await;
    assert_eq!(payload["data"]["enabled"], true);

    harness.gate.set_open(false).expect("toggle");
    let response = router
        .oneshot(
            Request::get("/api/v1/members/registration-status")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    let payload = read_json_body(response).await;
    assert_eq!(payload["data"]["enabled"], false);
}
