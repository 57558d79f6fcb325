use std::sync::Arc;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::notify::Mailer;
use crate::settings::MembershipGate;
use crate::store::SqliteStore;
use crate::testing::RecordingMailer;
use crate::workflows::members::{
    Education, EmergencyContact, MemberRegistration, MemberService, MemberSettings,
};

pub(super) fn registration() -> MemberRegistration {
    MemberRegistration {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 12, 10).expect("valid date"),
        gender: "female".to_string(),
        nationality: "Nigerian".to_string(),
        phone_number: "08012345678".to_string(),
        residential_address: "1 Analytical Way, Lagos".to_string(),
        emergency_contact: EmergencyContact {
            name: "Charles Babbage".to_string(),
            relationship: "Colleague".to_string(),
            phone_number: Some("08087654321".to_string()),
        },
        education: Education {
            highest_level: "BSc".to_string(),
            institution_name: "University of Lagos".to_string(),
            field_of_study: "Mathematics".to_string(),
            other_certifications: None,
        },
    }
}

pub(super) fn registration_json() -> Value {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": "ada@example.com",
        "dateOfBirth": "1990-12-10",
        "gender": "female",
        "nationality": "Nigerian",
        "phoneNumber": "08012345678",
        "residentialAddress": "1 Analytical Way, Lagos",
        "emergencyContact": { "name": "Charles Babbage", "relationship": "Colleague" },
        "education": {
            "highestLevel": "BSc",
            "institutionName": "University of Lagos",
            "fieldOfStudy": "Mathematics",
            "otherCertifications": ""
        }
    })
}

pub(super) struct Harness {
    pub service: Arc<MemberService<SqliteStore>>,
    pub store: Arc<SqliteStore>,
    pub gate: MembershipGate,
    pub mailer: Arc<RecordingMailer>,
}

pub(super) fn build_service() -> Harness {
    let mailer = Arc::new(RecordingMailer::default());
    build_service_with(mailer.clone(), mailer)
}

pub(super) fn build_service_with(
    mailer: Arc<dyn Mailer>,
    recording: Arc<RecordingMailer>,
) -> Harness {
    let store = Arc::new(SqliteStore::open_in_memory().expect("store opens"));
    let gate = MembershipGate::new(store.clone());
    let service = Arc::new(MemberService::new(
        store.clone(),
        gate.clone(),
        mailer,
        MemberSettings::default(),
    ));
    Harness {
        service,
        store,
        gate,
        mailer: recording,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
