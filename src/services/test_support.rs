use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{AppError, AppResult};
use crate::external::LeadBackend;
use crate::models::{LeadSubmission, SendOtpResponse};

/// Backend double that replays scripted `send-otp` answers and records calls.
pub struct ScriptedBackend {
    otp_responses: Mutex<VecDeque<AppResult<SendOtpResponse>>>,
    otp_requests: Mutex<Vec<String>>,
    leads: Mutex<Vec<LeadSubmission>>,
    lead_status: Mutex<VecDeque<u16>>,
}

impl ScriptedBackend {
    pub fn new(otp_responses: Vec<AppResult<SendOtpResponse>>) -> Self {
        Self {
            otp_responses: Mutex::new(otp_responses.into()),
            otp_requests: Mutex::new(Vec::new()),
            leads: Mutex::new(Vec::new()),
            lead_status: Mutex::new(VecDeque::new()),
        }
    }

    pub fn issuing(codes: &[&str]) -> Self {
        Self::new(
            codes
                .iter()
                .map(|code| {
                    Ok(SendOtpResponse {
                        success: true,
                        otp: Some(code.to_string()),
                        error: None,
                    })
                })
                .collect(),
        )
    }

    pub fn refusing(error: &str) -> Self {
        Self::new(vec![Ok(SendOtpResponse {
            success: false,
            otp: None,
            error: Some(error.to_string()),
        })])
    }

    pub fn unreachable() -> Self {
        Self::new(vec![Err(AppError::IoError(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))])
    }

    /// Statuses answered by `add-lead`, in order; 200 once exhausted.
    pub fn with_lead_statuses(self, statuses: &[u16]) -> Self {
        *self.lead_status.lock().unwrap() = statuses.iter().copied().collect();
        self
    }

    pub fn otp_requests(&self) -> Vec<String> {
        self.otp_requests.lock().unwrap().clone()
    }

    pub fn leads(&self) -> Vec<LeadSubmission> {
        self.leads.lock().unwrap().clone()
    }
}

#[async_trait]
impl LeadBackend for ScriptedBackend {
    async fn send_otp(&self, email: &str) -> AppResult<SendOtpResponse> {
        self.otp_requests.lock().unwrap().push(email.to_string());
        self.otp_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::OtpIssuance("no scripted response".to_string())))
    }

    async fn add_lead(&self, submission: &LeadSubmission) -> AppResult<()> {
        self.leads.lock().unwrap().push(submission.clone());
        match self.lead_status.lock().unwrap().pop_front().unwrap_or(200) {
            200..=299 => Ok(()),
            status => Err(AppError::Submission(format!("HTTP {status}"))),
        }
    }
}
