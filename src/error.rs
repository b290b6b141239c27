use thiserror::Error;

use crate::models::{Notice, NoticeKind};

pub type AppResult<T> = Result<T, AppError>;

/// Local verification failures. None of them touch the network.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationError {
    #[error("No OTP stored, request a new code")]
    NoChallenge,

    #[error("OTP expired, please resend")]
    Expired,

    #[error("Invalid OTP")]
    Mismatch,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Please wait {0}s before requesting a new code")]
    CooldownActive(u32),

    #[error("Request already in progress: {0}")]
    Busy(&'static str),

    #[error("Please verify your email first")]
    NotVerified,

    #[error("OTP issuance failed: {0}")]
    OtpIssuance(String),

    #[error("{0}")]
    Verification(#[from] VerificationError),

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::CooldownActive(_) => "COOLDOWN_ACTIVE",
            AppError::Busy(_) => "BUSY",
            AppError::NotVerified => "NOT_VERIFIED",
            AppError::OtpIssuance(_) => "OTP_ISSUANCE_ERROR",
            AppError::Verification(VerificationError::NoChallenge) => "OTP_NO_CHALLENGE",
            AppError::Verification(VerificationError::Expired) => "OTP_EXPIRED",
            AppError::Verification(VerificationError::Mismatch) => "OTP_MISMATCH",
            AppError::Submission(_) => "SUBMISSION_ERROR",
            AppError::StorageError(_) => "STORAGE_ERROR",
            AppError::ConfigError(_) => "CONFIG_ERROR",
            AppError::ReqwestError(_) => "NETWORK_ERROR",
            AppError::SerdeJsonError(_) => "SERIALIZATION_ERROR",
            AppError::IoError(_) => "IO_ERROR",
        }
    }

    /// Text shown to the person filling in the form.
    pub fn user_message(&self) -> String {
        match self {
            AppError::ValidationError(msg) => msg.clone(),
            AppError::OtpIssuance(msg) => msg.clone(),
            AppError::Submission(_) => "Failed, please try again".to_string(),
            AppError::ReqwestError(_) => "Network error, please try again".to_string(),
            AppError::StorageError(_)
            | AppError::ConfigError(_)
            | AppError::SerdeJsonError(_)
            | AppError::IoError(_) => "Something went wrong, please try again".to_string(),
            other => other.to_string(),
        }
    }

    fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::ValidationError(_)
                | AppError::CooldownActive(_)
                | AppError::Busy(_)
                | AppError::NotVerified
                | AppError::Verification(_)
        )
    }
}

impl From<&AppError> for Notice {
    fn from(err: &AppError) -> Self {
        if err.is_user_recoverable() {
            log::warn!("{}: {err}", err.error_code());
        } else {
            log::error!("{}: {err}", err.error_code());
        }
        Notice {
            kind: NoticeKind::Error,
            message: err.user_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_message_is_surfaced_verbatim() {
        let err = AppError::OtpIssuance("rate limited".to_string());
        assert_eq!(err.user_message(), "rate limited");
        assert_eq!(err.error_code(), "OTP_ISSUANCE_ERROR");
    }

    #[test]
    fn test_submission_failure_is_generic() {
        let err = AppError::Submission("HTTP 502".to_string());
        let notice = Notice::from(&err);
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.message, "Failed, please try again");
    }

    #[test]
    fn test_verification_messages() {
        let err: AppError = VerificationError::Expired.into();
        assert_eq!(err.user_message(), "OTP expired, please resend");
        assert_eq!(err.error_code(), "OTP_EXPIRED");
        let err: AppError = VerificationError::NoChallenge.into();
        assert_eq!(err.user_message(), "No OTP stored, request a new code");
    }
}
