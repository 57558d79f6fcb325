use super::common::*;
use std::sync::Arc;

use crate::testing::RecordingMailer;
use crate::workflows::members::{MemberField, MemberRepository};
use crate::workflows::recovery::{RecoveryError, RecoveryKind, RecoveryRepository, RecoveryToken};

#[test]
fn bulk_create_reports_each_rejection() {
    let harness = build_service();
    seeded(&harness, "existing@example.com", "application");

    let outcome = harness.service.bulk_create(vec![
        entry("Ada@Example.com", "join-movement"),
        entry("not-an-email", "application"),
        entry("bob@example.com", "volunteer"),
        entry("ada@example.com", "application"),
        entry("existing@example.com", "join-movement"),
    ]);

    assert_eq!(outcome.success, vec!["ada@example.com".to_string()]);
    let errors: Vec<(&str, &str)> = outcome
        .failed
        .iter()
        .map(|failed| (failed.email.as_str(), failed.error.as_str()))
        .collect();
    assert_eq!(
        errors,
        vec![
            ("not-an-email", "Invalid email address"),
            ("bob@example.com", "Invalid recovery type"),
            ("ada@example.com", "Email appears more than once in this batch"),
            (
                "existing@example.com",
                "A recovery entry already exists for this email"
            ),
        ]
    );
}

#[tokio::test]
async fn send_invites_emails_link_and_advances_status() {
    let harness = build_service();
    let record = seeded(&harness, "ada@example.com", "join-movement");

    let report = harness.service.send_invites(&[]).await.expect("invites");
    assert_eq!(report.success, vec!["ada@example.com".to_string()]);
    assert!(report.failed.is_empty());
    assert_eq!(report.message, "Successfully sent 1 invites, 0 failed");

    let sent = harness.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].template, "recovery-email");
    assert_eq!(sent[0].envelope.subject, "Complete Your SUGRiA Profile");
    assert_eq!(
        sent[0].data["recoveryLink"],
        format!("https://www.sugria.com/update?token={}", record.token.as_str())
    );

    assert!(harness.service.pending().expect("pending").is_empty());
    let again = harness.service.send_invites(&[]).await.expect("invites");
    assert_eq!(again.message, "No pending invites found to process");
}

#[tokio::test]
async fn failed_invites_stay_pending() {
    let harness = build_service_with(Arc::new(RecordingMailer::rejecting(&[
        "bounce@example.com",
    ])));
    seeded(&harness, "bounce@example.com", "application");
    seeded(&harness, "ada@example.com", "join-movement");

    let report = harness.service.send_invites(&[]).await.expect("invites");
    assert_eq!(report.success, vec!["ada@example.com".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].email, "bounce@example.com");
    assert_eq!(report.message, "Successfully sent 1 invites, 1 failed");

    let pending = harness.service.pending().expect("pending");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].email, "bounce@example.com");
}

#[tokio::test]
async fn send_invites_can_target_specific_emails() {
    let harness = build_service();
    seeded(&harness, "ada@example.com", "join-movement");
    seeded(&harness, "bob@example.com", "application");

    let report = harness
        .service
        .send_invites(&["BOB@example.com ".to_string()])
        .await
        .expect("invites");
    assert_eq!(report.success, vec!["bob@example.com".to_string()]);
    assert_eq!(harness.service.count_pending().expect("count"), 1);
}

#[tokio::test]
async fn blank_email_filter_invites_nobody() {
    let harness = build_service();
    seeded(&harness, "ada@example.com", "join-movement");
    seeded(&harness, "bob@example.com", "application");

    let report = harness
        .service
        .send_invites(&["   ".to_string(), String::new()])
        .await
        .expect("invites");
    assert!(report.success.is_empty());
    assert_eq!(report.message, "No pending invites found to process");
    assert!(harness.mailer.sent().is_empty());
    assert_eq!(harness.service.count_pending().expect("count"), 2);
}

#[tokio::test]
async fn invited_token_can_still_be_completed() {
    let harness = build_service();
    let record = seeded(&harness, "ada@example.com", "join-movement");
    harness.service.send_invites(&[]).await.expect("invites");
    let invited = harness
        .store
        .find_by_token(record.token.as_str())
        .expect("lookup")
        .expect("stored");
    assert_eq!(invited.status.label(), "invited");

    harness
        .service
        .complete(record.token.as_str(), profile())
        .await
        .expect("invited token completes");
    assert_eq!(harness.service.count_pending().expect("count"), 0);
}

#[test]
fn validate_reports_email_and_kind_without_side_effects() {
    let harness = build_service();
    let record = seeded(&harness, "ada@example.com", "join-movement");

    for _ in 0..2 {
        let validation = harness
            .service
            .validate(record.token.as_str())
            .expect("token valid");
        assert_eq!(validation.email, "ada@example.com");
        assert_eq!(validation.kind, RecoveryKind::JoinMovement);
    }
    assert!(matches!(
        harness.service.validate("test-token-123"),
        Err(RecoveryError::InvalidToken)
    ));
}

#[tokio::test]
async fn complete_creates_member_and_retires_token() {
    let harness = build_service();
    let record = seeded(&harness, "ada@example.com", "join-movement");

    let member = harness
        .service
        .complete(record.token.as_str(), profile())
        .await
        .expect("completion succeeds");
    assert_eq!(member.email, "ada@example.com");
    assert_eq!(member.work_email, "ada.lovelace@sugria.com");
    assert!(harness
        .store
        .fetch(member.id)
        .expect("fetch")
        .is_some());

    let stored = harness
        .store
        .find_by_token(record.token.as_str())
        .expect("lookup")
        .expect("still stored");
    assert_eq!(stored.status.label(), "recovered");

    assert!(matches!(
        harness.service.validate(record.token.as_str()),
        Err(RecoveryError::TokenAlreadyUsed)
    ));
    let err = harness
        .service
        .complete(record.token.as_str(), profile())
        .await
        .expect_err("second completion");
    assert!(matches!(err, RecoveryError::TokenAlreadyUsed));

    let sent = harness.mailer.sent();
    assert_eq!(
        sent.last().map(|mail| mail.template.as_str()),
        Some("member-update-confirmation")
    );
}

#[tokio::test]
async fn complete_rejects_details_owned_by_another_member() {
    let harness = build_service();
    let record = seeded(&harness, "ada@example.com", "join-movement");
    let first = harness
        .service
        .complete(record.token.as_str(), profile())
        .await
        .expect("first completion");

    let second_record = harness
        .store
        .insert_recovery(
            "ada.second@example.com",
            RecoveryKind::JoinMovement,
            &RecoveryToken::generate(),
        )
        .expect("insert");
    let mut clash = profile();
    clash.first_name = "Augusta".to_string();
    let err = harness
        .service
        .complete(second_record.token.as_str(), clash)
        .await
        .expect_err("phone owned by another member");
    assert!(matches!(
        err,
        RecoveryError::DuplicateMember {
            field: MemberField::PhoneNumber
        }
    ));
    assert_eq!(harness.store.count().expect("count"), 1);
    assert_eq!(
        harness
            .store
            .fetch(first.id)
            .expect("fetch")
            .map(|member| member.first_name),
        Some("Ada".to_string())
    );
}

#[tokio::test]
async fn application_recoveries_cannot_complete_membership() {
    let harness = build_service();
    let record = seeded(&harness, "ada@example.com", "application");

    let err = harness
        .service
        .complete(record.token.as_str(), profile())
        .await
        .expect_err("wrong kind");
    assert!(matches!(err, RecoveryError::InvalidRecoveryType));
    assert_eq!(harness.store.count().expect("count"), 0);
}
