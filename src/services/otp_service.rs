use chrono::Duration;

use crate::config::{MAX_OTP_TTL_SECS, OtpConfig};
use crate::error::{AppError, AppResult, VerificationError};
use crate::external::LeadBackend;
use crate::models::{OTP_STORAGE_KEY, OtpChallenge, SendOtpResponse, VerificationStatus};
use crate::store::KeyValueStore;
use crate::utils::{Clock, validate_email};

/// Email ownership challenge/response.
///
/// `Unverified -> CodeSent -> Verified`, with `CodeSent -> CodeSent` on resend.
/// There is no way back out of `Verified`. The pending challenge lives in the
/// injected store under [`OTP_STORAGE_KEY`], so it outlives this value.
///
/// Issuance is split into [`begin_request`](Self::begin_request) and
/// [`complete_request`](Self::complete_request) so a caller driving its own
/// event loop can keep the busy flag visible while the request is in flight.
pub struct OtpVerifier<S, C> {
    store: S,
    clock: C,
    ttl: Duration,
    resend_cooldown_secs: u32,
    status: VerificationStatus,
    cooldown: u32,
    sending: bool,
}

impl<S: KeyValueStore, C: Clock> OtpVerifier<S, C> {
    /// A live challenge left in the store by an earlier session puts the
    /// verifier straight into `CodeSent`; an expired one is cleared.
    pub fn new(store: S, clock: C, config: &OtpConfig) -> Self {
        let mut verifier = Self {
            store,
            clock,
            ttl: Duration::seconds(config.ttl_secs.clamp(1, MAX_OTP_TTL_SECS)),
            resend_cooldown_secs: config.resend_cooldown_secs,
            status: VerificationStatus::Unverified,
            cooldown: 0,
            sending: false,
        };
        verifier.restore();
        verifier
    }

    fn restore(&mut self) {
        match self.load_challenge() {
            Ok(Some(challenge)) if !challenge.is_expired(self.clock.now()) => {
                log::debug!("Restored pending email challenge");
                self.status = VerificationStatus::CodeSent;
            }
            Ok(Some(_)) => {
                if let Err(e) = self.store.clear(OTP_STORAGE_KEY) {
                    log::warn!("Failed to clear expired challenge: {e}");
                }
            }
            Ok(None) => {}
            Err(e) => log::warn!("Could not read stored challenge: {e}"),
        }
    }

    pub fn status(&self) -> VerificationStatus {
        self.status
    }

    pub fn is_verified(&self) -> bool {
        self.status == VerificationStatus::Verified
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    /// Seconds left before another code may be requested.
    pub fn cooldown_remaining(&self) -> u32 {
        self.cooldown
    }

    /// One second of the resend countdown.
    pub fn tick(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
    }

    pub fn begin_request(&mut self, email: &str) -> AppResult<()> {
        if self.is_verified() {
            return Err(AppError::ValidationError("Email already verified".to_string()));
        }
        if self.cooldown > 0 {
            return Err(AppError::CooldownActive(self.cooldown));
        }
        if self.sending {
            return Err(AppError::Busy("send-otp"));
        }
        validate_email(email)?;

        self.sending = true;
        Ok(())
    }

    /// Consumes the issuance result. On any failure the status is untouched.
    pub fn complete_request(&mut self, result: AppResult<SendOtpResponse>) -> AppResult<()> {
        if !self.sending {
            return Err(AppError::ValidationError(
                "No code request in progress".to_string(),
            ));
        }
        self.sending = false;

        // the old code may have been verified while this request was in flight
        if self.is_verified() {
            return Err(AppError::ValidationError("Email already verified".to_string()));
        }

        let response = match result {
            Ok(response) => response,
            Err(AppError::OtpIssuance(msg)) => return Err(AppError::OtpIssuance(msg)),
            Err(e) => {
                log::error!("send-otp request failed: {e}");
                return Err(AppError::OtpIssuance(
                    "Network error, please try again".to_string(),
                ));
            }
        };

        if !response.success {
            return Err(AppError::OtpIssuance(
                response
                    .error
                    .unwrap_or_else(|| "Failed to send OTP".to_string()),
            ));
        }

        let code = match response.otp {
            Some(code) if !code.is_empty() => code,
            _ => {
                log::error!("send-otp reported success without a code");
                return Err(AppError::OtpIssuance("Failed to send OTP".to_string()));
            }
        };

        // Overwrites any earlier challenge: only the newest code is valid.
        let challenge = OtpChallenge::issue(code, self.clock.now(), self.ttl);
        self.store
            .set(OTP_STORAGE_KEY, &serde_json::to_string(&challenge)?)?;

        self.status = VerificationStatus::CodeSent;
        self.cooldown = self.resend_cooldown_secs;
        log::info!("Email challenge issued, expires at {}", challenge.expires);
        Ok(())
    }

    pub async fn request_code<B>(&mut self, backend: &B, email: &str) -> AppResult<()>
    where
        B: LeadBackend + ?Sized,
    {
        self.begin_request(email)?;
        let result = backend.send_otp(email).await;
        self.complete_request(result)
    }

    /// Checks `entered` against the stored challenge without any network call.
    pub fn verify_code(&mut self, entered: &str) -> AppResult<()> {
        if self.is_verified() {
            return Ok(());
        }

        let challenge = self
            .load_challenge()?
            .ok_or(VerificationError::NoChallenge)?;

        if challenge.is_expired(self.clock.now()) {
            self.store.clear(OTP_STORAGE_KEY)?;
            return Err(VerificationError::Expired.into());
        }

        if entered != challenge.code {
            return Err(VerificationError::Mismatch.into());
        }

        self.store.clear(OTP_STORAGE_KEY)?;
        self.status = VerificationStatus::Verified;
        log::info!("Email verified");
        Ok(())
    }

    fn load_challenge(&self) -> AppResult<Option<OtpChallenge>> {
        let Some(raw) = self.store.get(OTP_STORAGE_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(challenge) => Ok(Some(challenge)),
            Err(e) => {
                log::warn!("Discarding unreadable stored challenge: {e}");
                self.store.clear(OTP_STORAGE_KEY)?;
                Ok(None)
            }
        }
    }
}
