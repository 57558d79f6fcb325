use metrics_exporter_prometheus::PrometheusHandle;
use movement::config::{AppConfig, EmailDelivery, StorageConfig};
use movement::error::AppError;
use movement::notify::{
    EmailService, EmailTransport, LogTransport, Mailer, ResendTransport, TemplateRegistry,
};
use movement::settings::MembershipGate;
use movement::storage::{CloudinaryStorage, DocumentStorage, LocalDocumentStorage};
use movement::store::SqliteStore;
use movement::workflows::admin::{
    AdminAuthenticator, AdminCollaborators, AdminService, Broadcaster, TokenIssuer,
};
use movement::workflows::applications::{ApplicationIntakeService, IntakeConfig};
use movement::workflows::members::{MemberService, MemberSettings};
use movement::workflows::recovery::{RecoveryService, RecoverySettings};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Every workflow service wired against one SQLite store.
pub(crate) struct Services {
    pub(crate) email: Arc<EmailService>,
    pub(crate) intake: Arc<ApplicationIntakeService<SqliteStore>>,
    pub(crate) members: Arc<MemberService<SqliteStore>>,
    pub(crate) recovery: Arc<RecoveryService<SqliteStore>>,
    pub(crate) admin: Arc<AdminService<SqliteStore>>,
    pub(crate) auth: Arc<AdminAuthenticator>,
}

pub(crate) fn open_store(config: &AppConfig) -> Result<Arc<SqliteStore>, AppError> {
    let store = SqliteStore::open(&config.database.path)?;
    Ok(Arc::new(store))
}

pub(crate) fn build_storage(config: &AppConfig) -> Result<Arc<dyn DocumentStorage>, AppError> {
    let storage: Arc<dyn DocumentStorage> = match &config.storage {
        StorageConfig::Local { root } => {
            info!(root = %root.display(), "using local document storage");
            Arc::new(LocalDocumentStorage::new(root.clone()))
        }
        StorageConfig::Cloudinary {
            cloud_name,
            api_key,
            api_secret,
        } => {
            info!(cloud_name = %cloud_name, "using cloudinary document storage");
            Arc::new(CloudinaryStorage::new(
                cloud_name.clone(),
                api_key.clone(),
                api_secret.clone(),
            )?)
        }
    };
    Ok(storage)
}

pub(crate) fn build_email(
    config: &AppConfig,
    store: Arc<SqliteStore>,
) -> Result<Arc<EmailService>, AppError> {
    let mut templates = TemplateRegistry::with_defaults();
    if let Some(dir) = &config.email.templates_dir {
        let loaded = templates.load_dir(dir)?;
        info!(dir = %dir.display(), loaded, "loaded email templates");
    }

    let transport: Arc<dyn EmailTransport> = match config.email.delivery {
        EmailDelivery::Log => Arc::new(LogTransport),
        EmailDelivery::Resend => {
            let api_key = config.email.resend_api_key.clone().unwrap_or_default();
            Arc::new(ResendTransport::new(
                config.email.resend_base_url.clone(),
                api_key,
            )?)
        }
    };

    Ok(Arc::new(EmailService::new(
        templates,
        transport,
        store,
        config.email.from.clone(),
    )))
}

pub(crate) fn build_issuer(config: &AppConfig) -> Result<Arc<TokenIssuer>, AppError> {
    let ttl = config.auth.token_ttl_seconds;
    let issuer = match &config.auth.jwt_secret {
        Some(secret) => TokenIssuer::new(secret.clone(), ttl)?,
        None => {
            warn!("JWT_SECRET is not set; admin tokens will not survive a restart");
            TokenIssuer::ephemeral(ttl)
        }
    };
    Ok(Arc::new(issuer))
}

pub(crate) fn build_services(config: &AppConfig) -> Result<Services, AppError> {
    let store = open_store(config)?;
    let storage = build_storage(config)?;
    let email = build_email(config, store.clone())?;
    let mailer: Arc<dyn Mailer> = email.clone();
    let gate = MembershipGate::new(store.clone());
    let auth = Arc::new(AdminAuthenticator::new(
        store.clone(),
        build_issuer(config)?,
    ));

    let intake = Arc::new(ApplicationIntakeService::new(
        store.clone(),
        storage.clone(),
        mailer.clone(),
        IntakeConfig {
            max_attachment_bytes: config.intake.max_attachment_bytes,
            programs_reply_to: config.email.programs_reply_to.clone(),
        },
    ));
    let members = Arc::new(MemberService::new(
        store.clone(),
        gate.clone(),
        mailer.clone(),
        MemberSettings {
            domain: config.organisation.domain.clone(),
            reply_to: config.email.members_reply_to.clone(),
        },
    ));
    let recovery = Arc::new(RecoveryService::new(
        store.clone(),
        mailer.clone(),
        RecoverySettings {
            link_base: config.organisation.recovery_link_base.clone(),
            domain: config.organisation.domain.clone(),
            reply_to: config.email.members_reply_to.clone(),
            concurrency: config.email.bulk_concurrency,
        },
    ));
    let admin = Arc::new(AdminService::new(
        store,
        AdminCollaborators {
            auth: auth.clone(),
            storage,
            email: email.clone(),
            broadcaster: Broadcaster::new(mailer, config.email.bulk_concurrency),
            gate,
        },
    ));

    Ok(Services {
        email,
        intake,
        members,
        recovery,
        admin,
        auth,
    })
}
