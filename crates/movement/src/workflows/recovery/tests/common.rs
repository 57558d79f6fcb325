use std::sync::Arc;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::notify::Mailer;
use crate::store::SqliteStore;
use crate::testing::RecordingMailer;
use crate::workflows::admin::auth::TokenIssuer;
use crate::workflows::members::{Education, EmergencyContact, MemberProfile};
use crate::workflows::recovery::{
    RecoveryEntry, RecoveryRecord, RecoveryRepository, RecoveryService, RecoverySettings,
};

pub(super) const SECRET: &str = "recovery-tests-secret-with-32-plus-chars";

pub(super) fn entry(email: &str, kind: &str) -> RecoveryEntry {
    RecoveryEntry {
        email: email.to_string(),
        kind: kind.to_string(),
    }
}

pub(super) fn profile() -> MemberProfile {
    MemberProfile {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        work_email: None,
        date_of_birth: NaiveDate::from_ymd_opt(1990, 12, 10).expect("valid date"),
        gender: "female".to_string(),
        nationality: "Nigerian".to_string(),
        phone_number: "08012345678".to_string(),
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
            other_certifications: Some("PMP".to_string()),
        },
    }
}

pub(super) fn profile_json() -> Value {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "dateOfBirth": "1990-12-10",
        "gender": "female",
        "nationality": "Nigerian",
        "phoneNumber": "08012345678",
        "residentialAddress": "1 Analytical Way, Lagos",
        "emergencyContact": { "name": "Charles Babbage", "relationship": "Colleague" },
        "education": {
            "highestLevel": "BSc",
            "institutionName": "University of Lagos",
            "fieldOfStudy": "Mathematics"
        }
    })
}

pub(super) fn settings() -> RecoverySettings {
    RecoverySettings {
        link_base: "https://www.sugria.com/update".to_string(),
        ..RecoverySettings::default()
    }
}

pub(super) struct Harness {
    pub service: Arc<RecoveryService<SqliteStore>>,
    pub store: Arc<SqliteStore>,
    pub mailer: Arc<RecordingMailer>,
    pub issuer: Arc<TokenIssuer>,
}

pub(super) fn build_service() -> Harness {
    build_service_with(Arc::new(RecordingMailer::default()))
}

pub(super) fn build_service_with(mailer: Arc<RecordingMailer>) -> Harness {
    let store = Arc::new(SqliteStore::open_in_memory().expect("store opens"));
    let service = Arc::new(RecoveryService::new(
        store.clone(),
        mailer.clone() as Arc<dyn Mailer>,
        settings(),
    ));
    Harness {
        service,
        store,
        mailer,
        issuer: Arc::new(TokenIssuer::new(SECRET, 3600).expect("issuer")),
    }
}

/// Seeds entries and returns the stored record for `email`.
pub(super) fn seeded(harness: &Harness, email: &str, kind: &str) -> RecoveryRecord {
    let outcome = harness.service.bulk_create(vec![entry(email, kind)]);
    assert_eq!(outcome.success, vec![email.to_string()]);
    harness
        .store
        .pending(Some(&[email.to_string()]))
        .expect("pending")
        .into_iter()
        .next()
        .expect("seeded entry")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
