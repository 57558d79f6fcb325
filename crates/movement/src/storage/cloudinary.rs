use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

use bytes::Bytes;
use regex::Regex;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::{DocumentStorage, DocumentUpload, StorageError, StoredDocument};

const ROOT_FOLDER: &str = "sugria";

/// Cloudinary upload API client using signed requests.
#[derive(Debug, Clone)]
pub struct CloudinaryStorage {
    http: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn versioned_path() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"/v(\d+)/(.+?)(?:\.[^./]+)?$").expect("valid cloudinary url regex")
    })
}

impl CloudinaryStorage {
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            api_base: "https://api.cloudinary.com/v1_1".to_string(),
        })
    }

    /// Hex SHA-256 over `k=v` pairs sorted by key and joined by `&`, then the secret.
    pub(crate) fn sign(&self, params: &BTreeMap<&str, String>) -> String {
        let joined = params
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn timestamp() -> String {
        chrono::Utc::now().timestamp().to_string()
    }
}

/// `(version, public_id)` from a delivery URL such as `.../v1712/sugria/applications/x.pdf`.
pub(crate) fn parse_delivery_url(url: &str) -> Option<(String, String)> {
    let path = url.split('?').next()?;
    let captures = versioned_path().captures(path)?;
    Some((captures.get(1)?.as_str().to_string(), captures.get(2)?.as_str().to_string()))
}

#[async_trait::async_trait]
impl DocumentStorage for CloudinaryStorage {
    async fn upload(&self, document: DocumentUpload) -> Result<StoredDocument, StorageError> {
        let folder = format!("{ROOT_FOLDER}/{}", document.folder.trim_matches('/'));
        let public_id = std::path::Path::new(&document.file_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&document.file_name)
            .to_string();

        let mut params = BTreeMap::new();
        params.insert("folder", folder);
        params.insert("public_id", public_id);
        params.insert("timestamp", Self::timestamp());
        params.insert("type", "upload".to_string());
        let signature = self.sign(&params);

        let part = reqwest::multipart::Part::bytes(document.bytes.to_vec())
            .file_name(document.file_name.clone())
            .mime_str(&document.content_type)?;
        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in params {
            form = form.text(key, value);
        }

        let endpoint = format!("{}/{}/auto/upload", self.api_base, self.cloud_name);
        let response = self.http.post(&endpoint).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| status.to_string());
            warn!(%status, %message, "cloudinary upload rejected");
            return Err(StorageError::Backend(message));
        }

        let body: UploadResponse = response.json().await?;
        debug!(url = %body.secure_url, "document uploaded to cloudinary");
        Ok(StoredDocument {
            url: body.secure_url,
        })
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, StorageError> {
        let (version, public_id) =
            parse_delivery_url(url).ok_or_else(|| StorageError::InvalidUrl(url.to_string()))?;

        let timestamp = Self::timestamp();
        let mut params = BTreeMap::new();
        params.insert("public_id", public_id);
        params.insert("timestamp", timestamp.clone());
        params.insert("version", version);
        let signature = self.sign(&params);

        let response = self
            .http
            .get(url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("timestamp", timestamp.as_str()),
                ("signature", signature.as_str()),
            ])
            .header(reqwest::header::ACCEPT, "*/*")
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.bytes().await?),
            reqwest::StatusCode::NOT_FOUND => Err(StorageError::NotFound),
            status => Err(StorageError::Backend(format!("fetch returned {status}"))),
        }
    }
}
