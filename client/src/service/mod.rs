//! Collaborator services reached over HTTP.
//!
//! [`EmailService`] is the seam between the session and the network: the
//! session only ever talks to the trait, [`HttpEmailService`] is the real
//! implementation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use leadmail::service::{EmailService, HttpEmailService, SpreadsheetUpload};
//!
//! let service = HttpEmailService::from_env()?;
//! let upload = SpreadsheetUpload::from_path("leads.xlsx").await?;
//! let response = service.draft(&upload).await?;
//! ```

use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::path::Path;

use crate::config::{ClientConfig, DRAFT_PATH, REFACTOR_PATH, SEND_PATH, XLSX_MIME};
use crate::email::normalize_email;
use crate::error::{ConfigError, ConfigResult, ServiceError, ServiceResult};
use crate::models::{EmailDraft, RefactorRequest, RefactorResponse, SendRequest};

/// A spreadsheet as handed to the draft service. The bytes are never inspected.
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadsheetUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl SpreadsheetUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping its file name for the multipart part.
    pub async fn from_path(path: impl AsRef<Path>) -> ServiceResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("leads.xlsx")
            .to_string();
        Ok(Self { file_name, bytes })
    }
}

/// The three remote operations the client depends on.
///
/// Only HTTP 200 counts as success; anything else is
/// [`ServiceError::Status`] carrying the code and response text.
pub trait EmailService {
    /// Upload a spreadsheet; returns the raw draft service JSON
    /// (`{"Response": [...]}` when all goes well).
    fn draft(&self, upload: &SpreadsheetUpload) -> impl Future<Output = ServiceResult<Value>> + Send;

    /// Ask for a rewrite of `original` following `instruction`.
    fn refactor(
        &self,
        original: &EmailDraft,
        instruction: &str,
    ) -> impl Future<Output = ServiceResult<EmailDraft>> + Send;

    /// Deliver an email. Returns the service's confirmation body.
    fn send(&self, email: &EmailDraft) -> impl Future<Output = ServiceResult<Value>> + Send;
}

/// [`EmailService`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpEmailService {
    config: ClientConfig,
    http: reqwest::Client,
}

impl HttpEmailService {
    pub fn new(config: ClientConfig) -> ConfigResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;
        Ok(Self { config, http })
    }

    /// Create a service from `LEADMAIL_API_URL` / `LEADMAIL_TIMEOUT_SECS`.
    pub fn from_env() -> ConfigResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> ServiceResult<String> {
        let url = self.config.endpoint(path);
        log::debug!("POST {}", url);

        let response = self.http.post(&url).json(body).send().await?;
        read_success(response).await
    }
}

/// Body text of a 200 response, or the status error.
async fn read_success(response: reqwest::Response) -> ServiceResult<String> {
    let status = response.status();
    log::debug!("Response status: {}", status);

    let body = response.text().await?;
    if status != StatusCode::OK {
        return Err(ServiceError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

fn parse_json(body: &str) -> ServiceResult<Value> {
    serde_json::from_str(body).map_err(|e| ServiceError::InvalidJson(e.to_string()))
}

/// Rewritten email of a 200 refactor reply. A missing or `null`
/// `rewritten_email` is an error, never an empty draft.
fn parse_refactor(body: &str) -> ServiceResult<EmailDraft> {
    let response: RefactorResponse =
        serde_json::from_str(body).map_err(|e| ServiceError::InvalidJson(e.to_string()))?;
    if response.rewritten_email.is_null() {
        return Err(ServiceError::InvalidJson(
            "rewritten_email is null".to_string(),
        ));
    }
    Ok(normalize_email(&response.rewritten_email))
}

impl EmailService for HttpEmailService {
    async fn draft(&self, upload: &SpreadsheetUpload) -> ServiceResult<Value> {
        let url = self.config.endpoint(DRAFT_PATH);
        log::debug!("POST {} ({} bytes, {})", url, upload.bytes.len(), upload.file_name);

        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(XLSX_MIME)?;
        let form = Form::new().part("file", part);

        let response = self.http.post(&url).multipart(form).send().await?;
        let body = read_success(response).await?;
        parse_json(&body)
    }

    async fn refactor(&self, original: &EmailDraft, instruction: &str) -> ServiceResult<EmailDraft> {
        let request = RefactorRequest {
            original_email: original.clone(),
            user_prompt: instruction.to_string(),
        };
        let body = self.post_json(REFACTOR_PATH, &request).await?;

        parse_refactor(&body)
    }

    async fn send(&self, email: &EmailDraft) -> ServiceResult<Value> {
        let request = SendRequest {
            email_data: email.clone(),
        };
        let body = self.post_json(SEND_PATH, &request).await?;

        // Delivery is signalled by the status code alone
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}
