//! Integration specifications for member registration and the recovery-token lifecycle.

mod common {
    use std::sync::{Arc, Mutex};

    use chrono::NaiveDate;
    use serde_json::Value;

    use movement::notify::{EmailEnvelope, EmailReceipt, MailError, Mailer};
    use movement::settings::MembershipGate;
    use movement::store::SqliteStore;
    use movement::workflows::members::{
        Education, EmergencyContact, MemberProfile, MemberRegistration, MemberService,
        MemberSettings,
    };
    use movement::workflows::recovery::{RecoveryEntry, RecoveryService, RecoverySettings};

    #[derive(Debug, Clone)]
    pub(super) struct Delivered {
        pub template: String,
        pub data: Value,
    }

    #[derive(Default)]
    pub(super) struct InboxMailer {
        inbox: Mutex<Vec<Delivered>>,
    }

    impl InboxMailer {
        pub(super) fn delivered(&self) -> Vec<Delivered> {
            self.inbox.lock().expect("inbox mutex").clone()
        }
    }

    #[async_trait::async_trait]
    impl Mailer for InboxMailer {
        async fn send_templated(
            &self,
            template: &str,
            data: Value,
            _envelope: EmailEnvelope,
        ) -> Result<EmailReceipt, MailError> {
            self.inbox.lock().expect("inbox mutex").push(Delivered {
                template: template.to_string(),
                data,
            });
            Ok(EmailReceipt {
                id: "inbox".to_string(),
            })
        }

        fn has_template(&self, _template: &str) -> bool {
            true
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
                other_certifications: None,
            },
        }
    }

    pub(super) fn registration(email: &str) -> MemberRegistration {
        let profile = profile();
        MemberRegistration {
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: email.to_string(),
            date_of_birth: profile.date_of_birth,
            gender: profile.gender,
            nationality: profile.nationality,
            phone_number: profile.phone_number,
            residential_address: profile.residential_address,
            emergency_contact: profile.emergency_contact,
            education: profile.education,
        }
    }

    pub(super) fn entry(email: &str, kind: &str) -> RecoveryEntry {
        RecoveryEntry {
            email: email.to_string(),
            kind: kind.to_string(),
        }
    }

    pub(super) struct Platform {
        pub store: Arc<SqliteStore>,
        pub mailer: Arc<InboxMailer>,
        pub members: MemberService<SqliteStore>,
        pub recovery: RecoveryService<SqliteStore>,
    }

    pub(super) fn platform() -> Platform {
        let store = Arc::new(SqliteStore::open_in_memory().expect("store opens"));
        let mailer = Arc::new(InboxMailer::default());
        let members = MemberService::new(
            store.clone(),
            MembershipGate::new(store.clone()),
            mailer.clone(),
            MemberSettings::default(),
        );
        let recovery = RecoveryService::new(store.clone(), mailer.clone(), RecoverySettings::default());
        Platform {
            store,
            mailer,
            members,
            recovery,
        }
    }
}

use common::*;
use movement::workflows::members::MemberRepository;
use movement::workflows::recovery::RecoveryError;

#[tokio::test]
async fn registration_derives_the_work_email_from_the_name() {
    let platform = platform();

    let member = platform
        .members
        .register(registration("ada@example.com"))
        .await
        .expect("registration accepted");

    assert_eq!(member.work_email, "ada.lovelace@sugria.com");
    let delivered = platform.mailer.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].template, "welcome-email");
    assert_eq!(delivered[0].data["workEmail"], "ada.lovelace@sugria.com");
}

#[test]
fn bulk_create_rejects_repeats_within_one_batch() {
    let platform = platform();

    let outcome = platform.recovery.bulk_create(vec![
        entry("ada@example.com", "join-movement"),
        entry("ADA@example.com", "join-movement"),
        entry("grace@example.com", "application"),
    ]);

    assert_eq!(
        outcome.success,
        vec!["ada@example.com".to_string(), "grace@example.com".to_string()]
    );
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].email, "ada@example.com");
    assert_eq!(platform.recovery.count_pending().expect("count"), 2);
}

#[tokio::test]
async fn recovered_tokens_are_terminal() {
    let platform = platform();
    platform
        .recovery
        .bulk_create(vec![entry("ada@example.com", "join-movement")]);
    let report = platform.recovery.send_invites(&[]).await.expect("invites");
    assert_eq!(report.success, vec!["ada@example.com".to_string()]);

    let link = platform.mailer.delivered()[0].data["recoveryLink"]
        .as_str()
        .expect("link present")
        .to_string();
    let token = link
        .split("token=")
        .nth(1)
        .expect("token in link")
        .to_string();

    let first = platform.recovery.validate(&token).expect("valid token");
    let second = platform.recovery.validate(&token).expect("still valid");
    assert_eq!(first, second);

    let member = platform
        .recovery
        .complete(&token, profile())
        .await
        .expect("completion succeeds");
    assert_eq!(member.email, "ada@example.com");
    assert_eq!(platform.store.count().expect("count"), 1);

    assert!(matches!(
        platform.recovery.validate(&token),
        Err(RecoveryError::TokenAlreadyUsed)
    ));
    assert!(matches!(
        platform.recovery.complete(&token, profile()).await,
        Err(RecoveryError::TokenAlreadyUsed)
    ));
    assert_eq!(platform.store.count().expect("count"), 1);
}
