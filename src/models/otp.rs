use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Fixed key of the durable slot holding the pending challenge.
pub const OTP_STORAGE_KEY: &str = "email_otp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    Unverified,
    CodeSent,
    Verified,
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationStatus::Unverified => write!(f, "unverified"),
            VerificationStatus::CodeSent => write!(f, "code_sent"),
            VerificationStatus::Verified => write!(f, "verified"),
        }
    }
}

/// Pending challenge as persisted: `{"code": "...", "expires": <epoch millis>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpChallenge {
    pub code: String,
    pub expires: i64,
}

impl OtpChallenge {
    pub fn issue(code: String, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            code,
            expires: (now + ttl).timestamp_millis(),
        }
    }

    /// Expired strictly after `expires`; the boundary instant is still valid.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() > self.expires
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendOtpRequest {
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendOtpResponse {
    pub success: bool,
    #[serde(default)]
    pub otp: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
