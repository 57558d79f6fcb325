use super::common::*;
use std::sync::Arc;

use crate::testing::{FailingMailer, RecordingMailer};
use crate::workflows::members::{MemberField, MemberRepository, MemberServiceError};

#[tokio::test]
async fn register_generates_work_email_and_welcomes() {
    let harness = build_service();

    let member = harness
        .service
        .register(registration())
        .await
        .expect("registration succeeds");

    assert_eq!(member.work_email, "ada.lovelace@sugria.com");
    assert_eq!(member.education.institution_name, "University of Lagos");
    assert_eq!(member.emergency_contact.name, "Charles Babbage");
    assert!(harness.store.fetch(member.id).expect("fetch").is_some());

    let sent = harness.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].template, "welcome-email");
    assert_eq!(sent[0].data["name"], "Ada Lovelace");
    assert_eq!(sent[0].data["workEmail"], "ada.lovelace@sugria.com");
    assert_eq!(sent[0].envelope.reply_to.as_deref(), Some("support@sugria.com"));
}

#[tokio::test]
async fn closed_registration_is_forbidden() {
    let harness = build_service();
    harness.gate.set_open(false).expect("toggle");

    let err = harness
        .service
        .register(registration())
        .await
        .expect_err("registration closed");
    assert!(matches!(err, MemberServiceError::RegistrationClosed));
    assert_eq!(harness.store.count().expect("count"), 0);
}

#[tokio::test]
async fn duplicates_name_the_colliding_field() {
    let harness = build_service();
    harness
        .service
        .register(registration())
        .await
        .expect("first registration");

    let mut same_email = registration();
    same_email.email = "ADA@example.com".to_string();
    same_email.phone_number = "08099999999".to_string();
    same_email.first_name = "Augusta".to_string();
    let err = harness
        .service
        .register(same_email)
        .await
        .expect_err("email taken");
    assert!(matches!(
        err,
        MemberServiceError::DuplicateMember {
            field: MemberField::Email
        }
    ));

    let mut same_phone = registration();
    same_phone.email = "augusta@example.com".to_string();
    same_phone.first_name = "Augusta".to_string();
    let err = harness
        .service
        .register(same_phone)
        .await
        .expect_err("phone taken");
    assert_eq!(err.to_string(), "Member with this phone number already exists");

    let mut same_name = registration();
    same_name.email = "ada.two@example.com".to_string();
    same_name.phone_number = "08011111111".to_string();
    let err = harness
        .service
        .register(same_name)
        .await
        .expect_err("work email taken");
    assert!(matches!(
        err,
        MemberServiceError::DuplicateMember {
            field: MemberField::WorkEmail
        }
    ));
    assert_eq!(harness.store.count().expect("count"), 1);
}

#[tokio::test]
async fn invalid_phone_is_rejected() {
    let harness = build_service();
    let mut input = registration();
    input.phone_number = "12345".to_string();

    let err = harness
        .service
        .register(input)
        .await
        .expect_err("short phone");
    match err {
        MemberServiceError::Invalid(validation) => assert_eq!(validation.field, "phoneNumber"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn welcome_failure_is_swallowed() {
    let harness = build_service_with(Arc::new(FailingMailer), Arc::new(RecordingMailer::default()));

    harness
        .service
        .register(registration())
        .await
        .expect("registration still succeeds");
    assert_eq!(harness.store.count().expect("count"), 1);
}

#[test]
fn unique_violations_map_to_member_fields() {
    use crate::store::RepositoryError;

    let err = MemberServiceError::from_write(RepositoryError::Conflict("work_email".to_string()));
    assert!(matches!(
        err,
        MemberServiceError::DuplicateMember {
            field: MemberField::WorkEmail
        }
    ));
    let err = MemberServiceError::from_write(RepositoryError::Conflict("unknown".to_string()));
    assert!(matches!(err, MemberServiceError::Repository(_)));
}
