use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Response,
    routing::post,
    Router,
};
use serde_json::{Map, Value};
use tracing::debug;

use super::domain::{ApplicationSubmission, Attachment, DocumentKind, IntakeAttachments};
use super::repository::ApplicationRepository;
use super::service::{ApplicationIntakeService, IntakeError};
use crate::http::{error_response, success};

/// Multipart overhead allowed on top of the two attachments.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Router builder exposing the public intake endpoint.
pub fn application_router<R>(service: Arc<ApplicationIntakeService<R>>) -> Router
where
    R: ApplicationRepository + 'static,
{
    let body_limit = service.config().max_attachment_bytes * 2 + FORM_OVERHEAD_BYTES;
    Router::new()
        .route(
            "/api/v1/programs/applications",
            post(submit_handler::<R>).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(service)
}

pub(crate) async fn submit_handler<R>(
    State(service): State<Arc<ApplicationIntakeService<R>>>,
    multipart: Multipart,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    let form = match ApplicationForm::read(multipart).await {
        Ok(form) => form,
        Err(err) => return error_response(&err),
    };
    if form.attachments.budget.is_none() || form.attachments.identity.is_none() {
        return error_response(&IntakeError::MissingFiles);
    }
    let submission = match form.submission() {
        Ok(submission) => submission,
        Err(err) => return error_response(&err),
    };

    match service.submit(submission, form.attachments).await {
        Ok(record) => success(
            StatusCode::CREATED,
            record,
            "Application submitted successfully",
        ),
        Err(err) => error_response(&err),
    }
}

/// Multipart body split into nested text sections and the two uploads.
#[derive(Debug, Default)]
pub(crate) struct ApplicationForm {
    sections: Map<String, Value>,
    attachments: IntakeAttachments,
}

impl ApplicationForm {
    pub(crate) async fn read(mut multipart: Multipart) -> Result<Self, IntakeError> {
        let mut form = ApplicationForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| IntakeError::MalformedForm(err.body_text()))?
        {
            let Some(name) = field.name().map(normalize_field_name) else {
                continue;
            };
            if let Some(kind) = file_field(&name) {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| IntakeError::MalformedForm(err.body_text()))?;
                let attachment = Attachment::new(file_name, content_type, bytes);
                match kind {
                    DocumentKind::Budget => form.attachments.budget = Some(attachment),
                    DocumentKind::Identity => form.attachments.identity = Some(attachment),
                }
                continue;
            }
            let text = field
                .text()
                .await
                .map_err(|err| IntakeError::MalformedForm(err.body_text()))?;
            form.insert_text(&name, text)?;
        }
        debug!(sections = form.sections.len(), "application form parsed");
        Ok(form)
    }

    /// `personal.fullName` sets one key; a bare `personal` holds the whole section as JSON.
    fn insert_text(&mut self, name: &str, text: String) -> Result<(), IntakeError> {
        match name.split_once('.') {
            Some((section, key)) => {
                let entry = self
                    .sections
                    .entry(section.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(map) = entry {
                    map.insert(key.to_string(), Value::String(text));
                }
            }
            None => {
                let parsed: Value = serde_json::from_str(&text).map_err(|err| {
                    IntakeError::MalformedForm(format!("section '{name}' is not valid JSON: {err}"))
                })?;
                let Value::Object(incoming) = parsed else {
                    return Err(IntakeError::MalformedForm(format!(
                        "section '{name}' must be a JSON object"
                    )));
                };
                let entry = self
                    .sections
                    .entry(name.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(map) = entry {
                    map.extend(incoming);
                }
            }
        }
        Ok(())
    }

    pub(crate) fn submission(&self) -> Result<ApplicationSubmission, IntakeError> {
        serde_json::from_value(Value::Object(self.sections.clone()))
            .map_err(|err| IntakeError::MalformedForm(err.to_string()))
    }
}

/// `personal[fullName]` becomes `personal.fullName`.
fn normalize_field_name(raw: &str) -> String {
    raw.trim().replace('[', ".").replace(']', "")
}

fn file_field(name: &str) -> Option<DocumentKind> {
    match name {
        "grant.budgetFile" | "grant.budget" | "budgetFile" => Some(DocumentKind::Budget),
        "motivation.identityFile" | "motivation.identity" | "identityFile" => {
            Some(DocumentKind::Identity)
        }
        _ => None,
    }
}
