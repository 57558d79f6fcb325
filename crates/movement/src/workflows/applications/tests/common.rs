use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::notify::{Mailer, Recipient};
use crate::paging::{Page, Paging};
use crate::storage::DocumentStorage;
use crate::store::{RepositoryError, SqliteStore};
use crate::testing::{MemoryStorage, RecordingMailer};
use crate::workflows::applications::{
    ApplicantCohort, ApplicationId, ApplicationIntakeService, ApplicationQuery,
    ApplicationRecord, ApplicationRepository, ApplicationStatus, ApplicationSubmission,
    ApplicationSummary, Attachment, DeclarationSection, DuplicateField, DuplicateMatch,
    FarmSection, GrantSection, InsertOutcome, IntakeAttachments, IntakeConfig,
    MotivationSection, PersonalSection, ProgramSection, TrainingSection,
};

pub(crate) const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF";
pub(crate) const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n0000IHDR";

pub(crate) fn submission() -> ApplicationSubmission {
    ApplicationSubmission {
        program: ProgramSection {
            category: "Agroecology".to_string(),
            previous_training: false,
            training_id: None,
        },
        personal: PersonalSection {
            full_name: "Amina Bello".to_string(),
            email: "Amina.Bello@Example.com ".to_string(),
            phone_number: "+2348012345678".to_string(),
            address: "12 Market Road, Kaduna".to_string(),
            gender: "female".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1994, 3, 14).expect("valid date"),
        },
        farm: FarmSection {
            location: "Kaduna".to_string(),
            size: 2.5,
            farm_type: "Mixed crop".to_string(),
            practices: "Crop rotation and composting".to_string(),
            challenges: "Irrigation during the dry season".to_string(),
        },
        grant: GrantSection {
            outcomes: "Install drip irrigation for two hectares".to_string(),
        },
        training: TrainingSection {
            preference: "In person".to_string(),
        },
        motivation: MotivationSection {
            statement: "Grow yields sustainably".to_string(),
            implementation: "Phase the install over two seasons".to_string(),
        },
        declaration: DeclarationSection {
            agreed: true,
            officer_name: "Musa Ibrahim".to_string(),
        },
    }
}

pub(crate) fn attachments() -> IntakeAttachments {
    IntakeAttachments {
        budget: Some(Attachment::new("budget.pdf", "application/pdf", PDF_BYTES)),
        identity: Some(Attachment::new("national-id.png", "image/png", PNG_BYTES)),
    }
}

pub(crate) fn intake_config() -> IntakeConfig {
    IntakeConfig {
        max_attachment_bytes: 1024,
        programs_reply_to: "programs@sugria.com".to_string(),
    }
}

pub(super) struct Harness {
    pub service: Arc<ApplicationIntakeService<SqliteStore>>,
    pub store: Arc<SqliteStore>,
    pub storage: Arc<MemoryStorage>,
    pub mailer: Arc<RecordingMailer>,
}

pub(super) fn build_service() -> Harness {
    let store = Arc::new(SqliteStore::open_in_memory().expect("store opens"));
    let storage = Arc::new(MemoryStorage::default());
    let mailer = Arc::new(RecordingMailer::default());
    let service = Arc::new(ApplicationIntakeService::new(
        store.clone(),
        storage.clone(),
        mailer.clone(),
        intake_config(),
    ));
    Harness {
        service,
        store,
        storage,
        mailer,
    }
}

pub(super) fn service_with<R>(
    repository: R,
    storage: Arc<dyn DocumentStorage>,
    mailer: Arc<dyn Mailer>,
) -> Arc<ApplicationIntakeService<R>>
where
    R: ApplicationRepository + 'static,
{
    Arc::new(ApplicationIntakeService::new(
        Arc::new(repository),
        storage,
        mailer,
        intake_config(),
    ))
}

/// What the write step of [`FlakyRepository`] does.
#[derive(Clone, Copy)]
pub(super) enum WriteBehaviour {
    /// A concurrent submission won the race.
    Racing,
    Unavailable,
}

/// Passes every pre-write probe, then misbehaves on insert.
pub(super) struct FlakyRepository(pub WriteBehaviour);

impl ApplicationRepository for FlakyRepository {
    fn find_duplicate(
        &self,
        _personal: &PersonalSection,
    ) -> Result<Option<DuplicateMatch>, RepositoryError> {
        Ok(None)
    }

    fn exists(&self, _id: &ApplicationId) -> Result<bool, RepositoryError> {
        Ok(false)
    }

    fn insert(&self, _record: ApplicationRecord) -> Result<InsertOutcome, RepositoryError> {
        match self.0 {
            WriteBehaviour::Racing => Ok(InsertOutcome::Duplicate(DuplicateMatch {
                field: DuplicateField::PhoneNumber,
                application_id: ApplicationId("APP000001AA".to_string()),
                category: "Agroecology".to_string(),
            })),
            WriteBehaviour::Unavailable => Err(RepositoryError::Unavailable(
                "database offline".to_string(),
            )),
        }
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Ok(None)
    }

    fn search(
        &self,
        _query: &ApplicationQuery,
        paging: Paging,
    ) -> Result<Page<ApplicationSummary>, RepositoryError> {
        Ok(paging.wrap(Vec::new(), 0))
    }

    fn recipients(&self, _cohort: &ApplicantCohort) -> Result<Vec<Recipient>, RepositoryError> {
        Ok(Vec::new())
    }

    fn set_status(
        &self,
        _id: &ApplicationId,
        _status: ApplicationStatus,
    ) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::NotFound)
    }

    fn delete(&self, _id: &ApplicationId) -> Result<(), RepositoryError> {
        Err(RepositoryError::NotFound)
    }

    fn count(&self) -> Result<u64, RepositoryError> {
        Ok(0)
    }
}

pub(super) const BOUNDARY: &str = "movement-test-boundary";

/// Hand-built `multipart/form-data` body.
#[derive(Default)]
pub(super) struct MultipartBody {
    buffer: Vec<u8>,
}

impl MultipartBody {
    pub(super) fn text(mut self, name: &str, value: &str) -> Self {
        self.buffer.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub(super) fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.buffer.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.buffer.extend_from_slice(bytes);
        self.buffer.extend_from_slice(b"\r\n");
        self
    }

    pub(super) fn into_request(mut self, uri: &str) -> Request<Body> {
        self.buffer
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.buffer))
            .expect("request builds")
    }
}

/// Every text section of [`submission`], encoded the way the web form posts it.
pub(super) fn form_fields() -> MultipartBody {
    MultipartBody::default()
        .text("program", r#"{"category":"Agroecology","previousTraining":"false"}"#)
        .text("personal[fullName]", "Amina Bello")
        .text("personal.email", "amina.bello@example.com")
        .text("personal.phoneNumber", "+2348012345678")
        .text("personal.address", "12 Market Road, Kaduna")
        .text("personal.gender", "female")
        .text("personal.dateOfBirth", "1994-03-14T00:00:00.000Z")
        .text(
            "farm",
            r#"{"location":"Kaduna","size":"2.5","type":"Mixed crop","practices":"Rotation","challenges":"Water"}"#,
        )
        .text("grant.outcomes", "Drip irrigation")
        .text("training.preference", "In person")
        .text("motivation.statement", "Grow yields")
        .text("motivation.implementation", "Two seasons")
        .text("declaration.agreed", "true")
        .text("declaration.officerName", "Musa Ibrahim")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
