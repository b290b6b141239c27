use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

use crate::config::BackendConfig;
use crate::error::{AppError, AppResult};
use crate::models::{LeadSubmission, SendOtpRequest, SendOtpResponse};

/// The CRM backend: code issuance and lead ingestion.
#[async_trait]
pub trait LeadBackend: Send + Sync {
    /// `POST /send-otp`. A `success: false` body is returned as `Ok` for the
    /// caller to surface; only transport or decoding problems are `Err`.
    async fn send_otp(&self, email: &str) -> AppResult<SendOtpResponse>;

    /// `POST /add-lead` as multipart. Any non-2xx status is an error.
    async fn add_lead(&self, submission: &LeadSubmission) -> AppResult<()>;
}

#[derive(Clone)]
pub struct LeadApiClient {
    client: Client,
    config: BackendConfig,
}

impl LeadApiClient {
    pub fn new(config: BackendConfig) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("lead-form/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn multipart(submission: &LeadSubmission) -> AppResult<Form> {
        // browsers send field and file names unescaped
        let mut form = Form::new().percent_encode_noop();
        for (name, value) in submission.text_parts() {
            form = form.text(name, value);
        }
        for file in submission.attachments() {
            let part = Part::bytes(file.bytes.clone())
                .file_name(file.file_name.clone())
                .mime_str(&file.content_type)?;
            form = form.part("files", part);
        }
        Ok(form)
    }
}

#[async_trait]
impl LeadBackend for LeadApiClient {
    async fn send_otp(&self, email: &str) -> AppResult<SendOtpResponse> {
        let response = self
            .client
            .post(self.endpoint("send-otp"))
            .json(&SendOtpRequest {
                email: email.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Error statuses usually still carry `{success: false, error}`.
        match serde_json::from_str::<SendOtpResponse>(&body) {
            Ok(parsed) => {
                log::debug!(
                    "send-otp for {email}: HTTP {} success={}",
                    status.as_u16(),
                    parsed.success
                );
                Ok(parsed)
            }
            Err(_) if !status.is_success() => {
                log::error!("send-otp failed: HTTP {}: {}", status.as_u16(), body);
                Err(AppError::OtpIssuance(format!(
                    "Failed to send OTP (HTTP {})",
                    status.as_u16()
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn add_lead(&self, submission: &LeadSubmission) -> AppResult<()> {
        let form = Self::multipart(submission)?;
        let response = self
            .client
            .post(self.endpoint("add-lead"))
            .multipart(form)
            .send()
            .await?;

        if response.status().is_success() {
            log::info!("Lead created for {}", submission.fields.email);
            Ok(())
        } else {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("Lead creation failed: HTTP {}: {}", status.as_u16(), error_text);
            Err(AppError::Submission(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_text
            )))
        }
    }
}
