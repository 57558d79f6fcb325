//! Admin authentication: Argon2id password hashes and HS256 bearer tokens.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::{Alphanumeric, DistString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::repository::AdminRepository;
use crate::http::{error_response, Classify, ErrorClass};
use crate::store::RepositoryError;

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Missing bearer token")]
    MissingToken,
    #[error("{0}")]
    InvalidToken(&'static str),
    #[error("JWT secret must be at least {MIN_SECRET_LEN} characters")]
    WeakSecret,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("token signing failed: {0}")]
    Signing(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl Classify for AuthError {
    fn class(&self) -> ErrorClass {
        match self {
            AuthError::InvalidCredentials | AuthError::MissingToken | AuthError::InvalidToken(_) => {
                ErrorClass::Unauthorized
            }
            AuthError::WeakSecret
            | AuthError::Hashing(_)
            | AuthError::Signing(_)
            | AuthError::Repository(_) => ErrorClass::Internal,
        }
    }
}

/// Hash a password using Argon2id, returning the PHC string.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Payload stored in admin tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminClaims {
    /// Admin email.
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Signs and verifies admin bearer tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    ttl_seconds: i64,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, ttl_seconds: i64) -> Result<Self, AuthError> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::WeakSecret);
        }
        Ok(Self {
            secret,
            ttl_seconds,
        })
    }

    /// Per-process random secret; tokens do not survive a restart.
    pub fn ephemeral(ttl_seconds: i64) -> Self {
        warn!("JWT_SECRET not set; using an ephemeral signing secret");
        Self {
            secret: Alphanumeric.sample_string(&mut rand::thread_rng(), 48),
            ttl_seconds,
        }
    }

    pub fn issue(&self, email: &str, role: &str) -> Result<AccessToken, AuthError> {
        let now = Utc::now().timestamp();
        let claims = AdminClaims {
            sub: email.to_string(),
            role: role.to_string(),
            iat: now,
            exp: now + self.ttl_seconds,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Signing(e.to_string()))?;
        Ok(AccessToken {
            access_token: token,
            token_type: "Bearer",
            expires_in: self.ttl_seconds,
        })
    }

    pub fn verify(&self, token: &str) -> Result<AdminClaims, AuthError> {
        decode::<AdminClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|err| {
            use jsonwebtoken::errors::ErrorKind;
            AuthError::InvalidToken(match err.kind() {
                ErrorKind::ExpiredSignature => "Token expired",
                ErrorKind::InvalidSignature => "Invalid signature",
                _ => "Invalid token",
            })
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Checks admin credentials and issues tokens.
pub struct AdminAuthenticator {
    admins: Arc<dyn AdminRepository>,
    issuer: Arc<TokenIssuer>,
}

impl AdminAuthenticator {
    pub fn new(admins: Arc<dyn AdminRepository>, issuer: Arc<TokenIssuer>) -> Self {
        Self { admins, issuer }
    }

    pub fn issuer(&self) -> Arc<TokenIssuer> {
        self.issuer.clone()
    }

    pub fn login(&self, request: &LoginRequest) -> Result<AccessToken, AuthError> {
        let email = request.email.trim().to_lowercase();
        let Some(admin) = self.admins.find_admin(&email)? else {
            debug!(email = %email, "login for unknown admin");
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(&request.password, &admin.password_hash)? {
            warn!(email = %email, "admin login rejected");
            return Err(AuthError::InvalidCredentials);
        }
        info!(email = %email, "admin logged in");
        self.issuer.issue(&admin.email, &admin.role)
    }

    /// Create or replace an admin account; used by the CLI seeding command.
    pub fn provision(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: &str,
    ) -> Result<(), AuthError> {
        let hash = hash_password(password)?;
        self.admins
            .upsert_admin(&email.trim().to_lowercase(), &hash, name, role)?;
        info!(email = %email, role, "admin account provisioned");
        Ok(())
    }
}

/// Middleware rejecting requests without a valid admin bearer token.
pub async fn require_admin(
    State(issuer): State<Arc<TokenIssuer>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);
    let Some(token) = token else {
        return error_response(&AuthError::MissingToken);
    };
    match issuer.verify(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(err) => error_response(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-at-least-32-characters";

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("correct-horse-battery-staple").expect("hash");
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct-horse-battery-staple", &hash).expect("verify"));
        assert!(!verify_password("wrong", &hash).expect("verify"));
        assert!(verify_password("x", "not-a-hash").is_err());
    }

    #[test]
    fn tokens_round_trip_claims() {
        let issuer = TokenIssuer::new(SECRET, 3600).expect("issuer");
        let token = issuer.issue("admin@sugria.com", "admin").expect("issue");
        assert_eq!(token.token_type, "Bearer");
        let claims = issuer.verify(&token.access_token).expect("verify");
        assert_eq!(claims.sub, "admin@sugria.com");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn foreign_and_expired_tokens_are_rejected() {
        let issuer = TokenIssuer::new(SECRET, 3600).expect("issuer");
        let other = TokenIssuer::new("another-secret-that-is-also-32-chars-long", 3600)
            .expect("issuer");
        let token = other.issue("admin@sugria.com", "admin").expect("issue");
        assert!(matches!(
            issuer.verify(&token.access_token),
            Err(AuthError::InvalidToken("Invalid signature"))
        ));

        let expired = TokenIssuer::new(SECRET, -3600).expect("issuer");
        let token = expired.issue("admin@sugria.com", "admin").expect("issue");
        assert!(matches!(
            issuer.verify(&token.access_token),
            Err(AuthError::InvalidToken("Token expired"))
        ));
    }

    #[test]
    fn short_secrets_are_refused() {
        assert!(matches!(
            TokenIssuer::new("short", 60),
            Err(AuthError::WeakSecret)
        ));
    }
}
