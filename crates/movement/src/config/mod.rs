use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub organisation: OrganisationConfig,
    pub email: EmailConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub intake: IntakeLimits,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "5001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;
        let cors_origin = optional("CORS_ORIGIN");

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = LogFormat::from_str(&env::var("APP_LOG_FORMAT").unwrap_or_default());

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "movement.db".to_string()),
            ),
        };

        let domain = env::var("ORG_DOMAIN").unwrap_or_else(|_| "sugria.com".to_string());
        let organisation = OrganisationConfig {
            recovery_link_base: env::var("RECOVERY_LINK_BASE")
                .unwrap_or_else(|_| format!("https://www.{domain}/update")),
            domain,
        };

        let email = EmailConfig::load(&organisation.domain, environment)?;
        let storage = StorageConfig::load()?;
        let auth = AuthConfig::load()?;

        let max_attachment_bytes = parse_number("MAX_ATTACHMENT_BYTES", 5 * 1024 * 1024)?;

        Ok(Self {
            environment,
            server: ServerConfig {
                host,
                port,
                cors_origin,
            },
            telemetry: TelemetryConfig {
                log_level,
                format: log_format,
            },
            database,
            organisation,
            email,
            storage,
            auth,
            intake: IntakeLimits {
                max_attachment_bytes,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: Option<String>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn from_str(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Compact
        }
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

/// Organisation identity used for work emails and outbound links.
#[derive(Debug, Clone)]
pub struct OrganisationConfig {
    pub domain: String,
    pub recovery_link_base: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailDelivery {
    /// Render and log messages without contacting a provider.
    Log,
    Resend,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub delivery: EmailDelivery,
    pub from: String,
    pub resend_api_key: Option<String>,
    pub resend_base_url: String,
    pub templates_dir: Option<PathBuf>,
    pub programs_reply_to: String,
    pub members_reply_to: String,
    pub bulk_concurrency: usize,
}

impl EmailConfig {
    fn load(domain: &str, environment: AppEnvironment) -> Result<Self, ConfigError> {
        let api_key = optional("RESEND_API_KEY");
        let default_delivery = if environment.is_production() && api_key.is_some() {
            "resend"
        } else {
            "log"
        };
        let delivery = match env::var("EMAIL_DELIVERY")
            .unwrap_or_else(|_| default_delivery.to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "log" | "dev" => EmailDelivery::Log,
            "resend" => EmailDelivery::Resend,
            other => {
                return Err(ConfigError::InvalidChoice {
                    key: "EMAIL_DELIVERY",
                    value: other.to_string(),
                })
            }
        };
        if delivery == EmailDelivery::Resend && api_key.is_none() {
            return Err(ConfigError::Missing("RESEND_API_KEY"));
        }

        let bulk_concurrency = parse_number("BULK_EMAIL_CONCURRENCY", 5)?.max(1);

        Ok(Self {
            delivery,
            from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| format!("SUGRiA <noreply@{domain}>")),
            resend_api_key: api_key,
            resend_base_url: env::var("RESEND_BASE_URL")
                .unwrap_or_else(|_| "https://api.resend.com".to_string()),
            templates_dir: optional("EMAIL_TEMPLATES_DIR").map(PathBuf::from),
            programs_reply_to: env::var("EMAIL_PROGRAMS_REPLY_TO")
                .unwrap_or_else(|_| format!("programs@{domain}")),
            members_reply_to: env::var("EMAIL_MEMBERS_REPLY_TO")
                .unwrap_or_else(|_| format!("info@{domain}")),
            bulk_concurrency,
        })
    }
}

#[derive(Debug, Clone)]
pub enum StorageConfig {
    Local {
        root: PathBuf,
    },
    Cloudinary {
        cloud_name: String,
        api_key: String,
        api_secret: String,
    },
}

impl StorageConfig {
    fn load() -> Result<Self, ConfigError> {
        match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "local" => Ok(Self::Local {
                root: PathBuf::from(
                    env::var("STORAGE_LOCAL_ROOT").unwrap_or_else(|_| "uploads".to_string()),
                ),
            }),
            "cloudinary" => Ok(Self::Cloudinary {
                cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
                api_key: required("CLOUDINARY_API_KEY")?,
                api_secret: required("CLOUDINARY_API_SECRET")?,
            }),
            other => Err(ConfigError::InvalidChoice {
                key: "STORAGE_BACKEND",
                value: other.to_string(),
            }),
        }
    }
}

/// Admin bearer token settings. A missing secret is generated per process.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub token_ttl_seconds: i64,
}

impl AuthConfig {
    fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            jwt_secret: optional("JWT_SECRET"),
            token_ttl_seconds: parse_number("JWT_EXPIRY_SECONDS", 86_400)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IntakeLimits {
    pub max_attachment_bytes: usize,
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn parse_number<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
        None => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    Missing(&'static str),
    InvalidNumber { key: &'static str, value: String },
    InvalidChoice { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::Missing(key) => write!(f, "{key} must be set"),
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a number, found '{value}'")
            }
            ConfigError::InvalidChoice { key, value } => {
                write!(f, "{key} does not accept '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
