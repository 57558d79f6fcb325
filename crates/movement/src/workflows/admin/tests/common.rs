use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::notify::{EmailService, LogTransport, Mailer, TemplateRegistry};
use crate::settings::MembershipGate;
use crate::store::SqliteStore;
use crate::testing::{MemoryStorage, RecordingMailer};
use crate::workflows::admin::{
    AdminAuthenticator, AdminCollaborators, AdminService, Broadcaster, LoginRequest, TokenIssuer,
};
use crate::workflows::applications::tests::common::{attachments, intake_config, submission};
use crate::workflows::applications::{ApplicationIntakeService, ApplicationRecord};
use crate::workflows::members::{
    prepare_member, Education, EmergencyContact, MemberProfile, MemberRecord, MemberRepository,
};

pub(super) const SECRET: &str = "admin-tests-secret-with-more-than-32-chars";
pub(super) const ADMIN_EMAIL: &str = "admin@sugria.com";
pub(super) const ADMIN_PASSWORD: &str = "correct-horse-battery";

pub(super) struct Harness {
    pub service: Arc<AdminService<SqliteStore>>,
    pub store: Arc<SqliteStore>,
    pub storage: Arc<MemoryStorage>,
    pub mailer: Arc<RecordingMailer>,
    pub gate: MembershipGate,
    pub intake: ApplicationIntakeService<SqliteStore>,
}

pub(super) fn build_service() -> Harness {
    let store = Arc::new(SqliteStore::open_in_memory().expect("store opens"));
    let storage = Arc::new(MemoryStorage::default());
    let mailer = Arc::new(RecordingMailer::default());
    let gate = MembershipGate::new(store.clone());

    let issuer = Arc::new(TokenIssuer::new(SECRET, 3600).expect("issuer"));
    let auth = Arc::new(AdminAuthenticator::new(store.clone(), issuer));
    auth.provision(ADMIN_EMAIL, ADMIN_PASSWORD, "Programme Admin", "admin")
        .expect("admin provisioned");

    let email = Arc::new(EmailService::new(
        TemplateRegistry::with_defaults(),
        Arc::new(LogTransport),
        store.clone(),
        "noreply@sugria.com",
    ));
    let service = Arc::new(AdminService::new(
        store.clone(),
        AdminCollaborators {
            auth,
            storage: storage.clone(),
            email,
            broadcaster: Broadcaster::new(mailer.clone() as Arc<dyn Mailer>, 4),
            gate: gate.clone(),
        },
    ));
    let intake = ApplicationIntakeService::new(
        store.clone(),
        storage.clone(),
        mailer.clone(),
        intake_config(),
    );
    Harness {
        service,
        store,
        storage,
        mailer,
        gate,
        intake,
    }
}

pub(super) fn login() -> LoginRequest {
    LoginRequest {
        email: ADMIN_EMAIL.to_string(),
        password: ADMIN_PASSWORD.to_string(),
    }
}

pub(super) fn profile(first_name: &str, last_name: &str, phone_number: &str) -> MemberProfile {
    MemberProfile {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        work_email: None,
        date_of_birth: NaiveDate::from_ymd_opt(1990, 12, 10).expect("valid date"),
        gender: "female".to_string(),
        nationality: "Nigerian".to_string(),
        phone_number: phone_number.to_string(),
        residential_address: "1 Analytical Way, Lagos".to_string(),
        emergency_contact: EmergencyContact {
            name: "Charles Babbage".to_string(),
            relationship: "Colleague".to_string(),
            phone_number: None,
        },
        education: Education {
            highest_level: "BSc".to_string(),
            institution_name: "University of Lagos".to_string(),
            field_of_study: "Mathematics".to_string(),
            other_certifications: None,
        },
    }
}

pub(super) fn seed_member(
    harness: &Harness,
    email: &str,
    first_name: &str,
    last_name: &str,
    phone_number: &str,
) -> MemberRecord {
    let member = prepare_member(
        email,
        profile(first_name, last_name, phone_number),
        "sugria.com",
    )
    .expect("valid member");
    MemberRepository::insert(&*harness.store, member).expect("member inserted")
}

pub(super) async fn seed_application(harness: &Harness) -> ApplicationRecord {
    harness
        .intake
        .submit(submission(), attachments())
        .await
        .expect("application submitted")
}

pub(super) fn bearer(harness: &Harness) -> String {
    let token = harness.service.login(&login()).expect("login");
    format!("Bearer {}", token.access_token)
}

pub(super) fn authorised(method: &str, uri: &str, auth: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, auth);
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
