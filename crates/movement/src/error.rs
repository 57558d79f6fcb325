use crate::config::ConfigError;
use crate::notify::{MailError, TemplateError};
use crate::storage::StorageError;
use crate::store::RepositoryError;
use crate::telemetry::TelemetryError;
use crate::workflows::admin::AuthError;
use crate::workflows::recovery::{RecoveryError, RecoveryImportError};
use std::fmt;

/// Failures surfaced by process startup and the command-line entry points.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Repository(RepositoryError),
    Storage(StorageError),
    Mail(MailError),
    Template(TemplateError),
    Import(RecoveryImportError),
    Recovery(RecoveryError),
    Auth(AuthError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Repository(err) => write!(f, "database error: {}", err),
            AppError::Storage(err) => write!(f, "storage error: {}", err),
            AppError::Mail(err) => write!(f, "email error: {}", err),
            AppError::Template(err) => write!(f, "template error: {}", err),
            AppError::Import(err) => write!(f, "import error: {}", err),
            AppError::Recovery(err) => write!(f, "recovery error: {}", err),
            AppError::Auth(err) => write!(f, "auth error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Repository(err) => Some(err),
            AppError::Storage(err) => Some(err),
            AppError::Mail(err) => Some(err),
            AppError::Template(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Recovery(err) => Some(err),
            AppError::Auth(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Repository(value)
    }
}

impl From<StorageError> for AppError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<MailError> for AppError {
    fn from(value: MailError) -> Self {
        Self::Mail(value)
    }
}

impl From<TemplateError> for AppError {
    fn from(value: TemplateError) -> Self {
        Self::Template(value)
    }
}

impl From<RecoveryImportError> for AppError {
    fn from(value: RecoveryImportError) -> Self {
        Self::Import(value)
    }
}

impl From<RecoveryError> for AppError {
    fn from(value: RecoveryError) -> Self {
        Self::Recovery(value)
    }
}

impl From<AuthError> for AppError {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}
