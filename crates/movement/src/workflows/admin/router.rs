use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;

use super::auth::{require_admin, LoginRequest};
use super::repository::DirectoryKind;
use super::service::{AdminService, AdminStore, BulkEmailRequest, CohortEmailRequest};
use crate::http::{error_response, failure, rejection_response, success, ErrorClass};
use crate::paging::PageRequest;
use crate::workflows::applications::{
    ApplicantCohort, ApplicationId, ApplicationQuery, ApplicationStatus, DocumentKind,
};
use crate::workflows::members::{MemberCohort, MemberQuery};

const DEFAULT_SYNC_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MemberListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApplicationListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DirectoryParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: DirectoryKind,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DocumentParams {
    pub disposition: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusUpdate {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MembershipToggle {
    pub enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SyncParams {
    pub limit: Option<usize>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `POST /api/v1/admin/login` plus every bearer-protected admin endpoint.
pub fn admin_router<R>(service: Arc<AdminService<R>>) -> Router
where
    R: AdminStore + 'static,
{
    let protected = Router::new()
        .route("/api/v1/admin/members", get(list_members_handler::<R>))
        .route(
            "/api/v1/admin/members/:id",
            get(get_member_handler::<R>).delete(delete_member_handler::<R>),
        )
        .route("/api/v1/admin/applications", get(list_applications_handler::<R>))
        .route(
            "/api/v1/admin/applications/:id",
            get(get_application_handler::<R>).delete(delete_application_handler::<R>),
        )
        .route(
            "/api/v1/admin/applications/:id/status",
            patch(update_status_handler::<R>),
        )
        .route(
            "/api/v1/admin/applications/:id/documents/:kind",
            get(document_handler::<R>),
        )
        .route("/api/v1/admin/users", get(directory_handler::<R>))
        .route("/api/v1/admin/stats/counts", get(counts_handler::<R>))
        .route("/api/v1/admin/email/members", post(email_members_handler::<R>))
        .route(
            "/api/v1/admin/email/applicants",
            post(email_applicants_handler::<R>),
        )
        .route("/api/v1/admin/email/send-bulk", post(send_bulk_handler::<R>))
        .route(
            "/api/v1/admin/membership-endpoint",
            patch(membership_handler::<R>),
        )
        .route("/api/v1/admin/email-templates", get(templates_handler::<R>))
        .route("/api/v1/admin/email-tracking", get(tracking_handler::<R>))
        .route(
            "/api/v1/admin/email-tracking/sync",
            post(sync_tracking_handler::<R>),
        )
        .route_layer(middleware::from_fn_with_state(
            service.issuer(),
            require_admin,
        ));

    Router::new()
        .route("/api/v1/admin/login", post(login_handler::<R>))
        .merge(protected)
        .with_state(service)
}

pub(crate) async fn login_handler<R>(
    State(service): State<Arc<AdminService<R>>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response
where
    R: AdminStore + 'static,
{
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match service.login(&request) {
        Ok(token) => success(StatusCode::OK, token, "Login successful"),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn list_members_handler<R>(
    State(service): State<Arc<AdminService<R>>>,
    params: Result<Query<MemberListParams>, QueryRejection>,
) -> Response
where
    R: AdminStore + 'static,
{
    let Query(params) = match params {
        Ok(query) => query,
        Err(rejection) => return rejection_response(rejection),
    };
    let paging = PageRequest {
        page: params.page,
        limit: params.limit,
    }
    .resolve();
    let query = MemberQuery {
        search: non_empty(params.search),
    };
    match service.members(&query, paging) {
        Ok(page) => success(StatusCode::OK, page, "Members retrieved"),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn get_member_handler<R>(
    State(service): State<Arc<AdminService<R>>>,
    Path(id): Path<i64>,
) -> Response
where
    R: AdminStore + 'static,
{
    match service.member(id) {
        Ok(member) => success(StatusCode::OK, member, "Member retrieved"),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn delete_member_handler<R>(
    State(service): State<Arc<AdminService<R>>>,
    Path(id): Path<i64>,
) -> Response
where
    R: AdminStore + 'static,
{
    match service.delete_member(id) {
        Ok(()) => success(StatusCode::OK, serde_json::Value::Null, "Member deleted"),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn list_applications_handler<R>(
    State(service): State<Arc<AdminService<R>>>,
    params: Result<Query<ApplicationListParams>, QueryRejection>,
) -> Response
where
    R: AdminStore + 'static,
{
    let Query(params) = match params {
        Ok(query) => query,
        Err(rejection) => return rejection_response(rejection),
    };
    let status = match non_empty(params.status) {
        None => None,
        Some(raw) => match ApplicationStatus::parse(&raw) {
            Some(status) => Some(status),
            None => return invalid_status(&raw),
        },
    };
    let paging = PageRequest {
        page: params.page,
        limit: params.limit,
    }
    .resolve();
    let query = ApplicationQuery {
        search: non_empty(params.search),
        status,
        category: non_empty(params.category),
    };
    match service.applications(&query, paging) {
        Ok(page) => success(StatusCode::OK, page, "Applications retrieved"),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn get_application_handler<R>(
    State(service): State<Arc<AdminService<R>>>,
    Path(id): Path<String>,
) -> Response
where
    R: AdminStore + 'static,
{
    match service.application(&ApplicationId(id)) {
        Ok(record) => success(StatusCode::OK, record, "Application retrieved"),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn delete_application_handler<R>(
    State(service): State<Arc<AdminService<R>>>,
    Path(id): Path<String>,
) -> Response
where
    R: AdminStore + 'static,
{
    match service.delete_application(&ApplicationId(id)) {
        Ok(()) => success(StatusCode::OK, serde_json::Value::Null, "Application deleted"),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn update_status_handler<R>(
    State(service): State<Arc<AdminService<R>>>,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Response
where
    R: AdminStore + 'static,
{
    let Json(update) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    let Some(status) = ApplicationStatus::parse(&update.status) else {
        return invalid_status(&update.status);
    };
    match service.set_application_status(&ApplicationId(id), status) {
        Ok(record) => success(StatusCode::OK, record, "Application status updated"),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn document_handler<R>(
    State(service): State<Arc<AdminService<R>>>,
    Path((id, kind)): Path<(String, String)>,
    params: Result<Query<DocumentParams>, QueryRejection>,
) -> Response
where
    R: AdminStore + 'static,
{
    let Query(params) = match params {
        Ok(query) => query,
        Err(rejection) => return rejection_response(rejection),
    };
    let Some(kind) = DocumentKind::parse(&kind) else {
        return failure(
            ErrorClass::Validation,
            format!("unknown document kind '{kind}', expected budget or identity"),
            None,
        );
    };
    let download = match service.document(&ApplicationId(id), kind).await {
        Ok(download) => download,
        Err(err) => return error_response(&err),
    };
    let disposition = match params.disposition.as_deref() {
        Some("attachment") => "attachment",
        _ => "inline",
    };
    let file_name = download.metadata.file_name.replace('"', "");
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, download.metadata.mime_type),
            (
                header::CONTENT_DISPOSITION,
                format!("{disposition}; filename=\"{file_name}\""),
            ),
        ],
        download.bytes,
    )
        .into_response()
}

pub(crate) async fn directory_handler<R>(
    State(service): State<Arc<AdminService<R>>>,
    params: Result<Query<DirectoryParams>, QueryRejection>,
) -> Response
where
    R: AdminStore + 'static,
{
    let Query(params) = match params {
        Ok(query) => query,
        Err(rejection) => return rejection_response(rejection),
    };
    let paging = PageRequest {
        page: params.page,
        limit: params.limit,
    }
    .resolve();
    let search = non_empty(params.search);
    match service.directory(params.kind, search.as_deref(), paging) {
        Ok(page) => success(StatusCode::OK, page, "Users retrieved"),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn counts_handler<R>(State(service): State<Arc<AdminService<R>>>) -> Response
where
    R: AdminStore + 'static,
{
    match service.counts() {
        Ok(counts) => success(StatusCode::OK, counts, "Counts retrieved"),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn email_members_handler<R>(
    State(service): State<Arc<AdminService<R>>>,
    payload: Result<Json<CohortEmailRequest<MemberCohort>>, JsonRejection>,
) -> Response
where
    R: AdminStore + 'static,
{
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match service.email_members(request).await {
        Ok(report) => {
            let message = format!("Sent {} of {} emails", report.sent, report.total);
            success(StatusCode::OK, report, message)
        }
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn email_applicants_handler<R>(
    State(service): State<Arc<AdminService<R>>>,
    payload: Result<Json<CohortEmailRequest<ApplicantCohort>>, JsonRejection>,
) -> Response
where
    R: AdminStore + 'static,
{
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match service.email_applicants(request).await {
        Ok(report) => {
            let message = format!("Sent {} of {} emails", report.sent, report.total);
            success(StatusCode::OK, report, message)
        }
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn send_bulk_handler<R>(
    State(service): State<Arc<AdminService<R>>>,
    payload: Result<Json<BulkEmailRequest>, JsonRejection>,
) -> Response
where
    R: AdminStore + 'static,
{
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match service.send_bulk(request).await {
        Ok(report) => {
            let message = format!("Sent {} of {} emails", report.sent, report.total);
            success(StatusCode::OK, report, message)
        }
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn membership_handler<R>(
    State(service): State<Arc<AdminService<R>>>,
    payload: Result<Json<MembershipToggle>, JsonRejection>,
) -> Response
where
    R: AdminStore + 'static,
{
    let Json(toggle) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match service.set_membership(toggle.enabled) {
        Ok(enabled) => {
            let message = if enabled {
                "Membership registration enabled"
            } else {
                "Membership registration disabled"
            };
            success(StatusCode::OK, serde_json::json!({ "enabled": enabled }), message)
        }
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn templates_handler<R>(State(service): State<Arc<AdminService<R>>>) -> Response
where
    R: AdminStore + 'static,
{
    match service.email_templates() {
        Ok(templates) => success(StatusCode::OK, templates, "Email templates retrieved"),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn tracking_handler<R>(
    State(service): State<Arc<AdminService<R>>>,
    params: Result<Query<PageRequest>, QueryRejection>,
) -> Response
where
    R: AdminStore + 'static,
{
    let Query(request) = match params {
        Ok(query) => query,
        Err(rejection) => return rejection_response(rejection),
    };
    match service.email_tracking(request.resolve()) {
        Ok(page) => success(StatusCode::OK, page, "Tracked emails retrieved"),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn sync_tracking_handler<R>(
    State(service): State<Arc<AdminService<R>>>,
    params: Result<Query<SyncParams>, QueryRejection>,
) -> Response
where
    R: AdminStore + 'static,
{
    let Query(params) = match params {
        Ok(query) => query,
        Err(rejection) => return rejection_response(rejection),
    };
    let limit = params.limit.unwrap_or(DEFAULT_SYNC_LIMIT).clamp(1, 500);
    match service.sync_email_tracking(limit).await {
        Ok(report) => success(StatusCode::OK, report, "Email statuses synchronised"),
        Err(err) => error_response(&err),
    }
}

fn invalid_status(raw: &str) -> Response {
    failure(
        ErrorClass::Validation,
        format!("unknown application status '{raw}'"),
        None,
    )
}
