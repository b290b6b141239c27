use std::time::Duration;

use crate::config::RedirectConfig;
use crate::error::{AppError, AppResult};
use crate::external::LeadBackend;
use crate::models::*;
use crate::services::OtpVerifier;
use crate::store::KeyValueStore;
use crate::utils::{Clock, email_error};

/// Fields the form will not submit without.
const REQUIRED_FIELDS: [TextField; 7] = [
    TextField::FirstName,
    TextField::LastName,
    TextField::Email,
    TextField::Company,
    TextField::BusinessStatus,
    TextField::Country,
    TextField::Phone,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub url: String,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub message: String,
    pub redirect: Option<Redirect>,
}

/// Form state controller: field values, inline validation, the email
/// challenge and the final lead submission.
pub struct LeadForm<S, C> {
    fields: FormFields,
    email_error: Option<String>,
    page: PageContext,
    otp: OtpVerifier<S, C>,
    redirect: RedirectConfig,
    submitting: bool,
    submitted: bool,
    notice: Option<Notice>,
}

impl<S: KeyValueStore, C: Clock> LeadForm<S, C> {
    pub fn new(page: PageContext, otp: OtpVerifier<S, C>, redirect: RedirectConfig) -> Self {
        Self {
            fields: FormFields::default(),
            email_error: None,
            page,
            otp,
            redirect,
            submitting: false,
            submitted: false,
            notice: None,
        }
    }

    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    pub fn page(&self) -> &PageContext {
        &self.page
    }

    pub fn email_error(&self) -> Option<&str> {
        self.email_error.as_deref()
    }

    pub fn status(&self) -> VerificationStatus {
        self.otp.status()
    }

    pub fn otp(&self) -> &OtpVerifier<S, C> {
        &self.otp
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn set_field(&mut self, field: TextField, value: impl Into<String>) {
        let value = value.into();
        if field == TextField::Email {
            self.email_error = email_error(&value).map(str::to_string);
        }
        *self.fields.text_mut(field) = value;
    }

    pub fn set_flag(&mut self, flag: Flag, value: bool) {
        match flag {
            Flag::AgreeTerms => self.fields.agree_terms = value,
            Flag::AgreeMarketing => self.fields.agree_marketing = value,
        }
    }

    pub fn set_attachments(&mut self, attachments: Vec<Attachment>) {
        self.fields.attachments = attachments;
    }

    pub fn toggle_service(&mut self, tag: ServiceTag) {
        if let Some(pos) = self.fields.service.iter().position(|s| *s == tag) {
            self.fields.service.remove(pos);
        } else {
            self.fields.service.push(tag);
        }
    }

    pub fn tick(&mut self) {
        self.otp.tick();
    }

    pub fn cooldown_remaining(&self) -> u32 {
        self.otp.cooldown_remaining()
    }

    /// Starts a code request for the current email, returning the address to send.
    pub fn begin_request_code(&mut self) -> AppResult<String> {
        let email = self.fields.email.clone();
        self.email_error = email_error(&email).map(str::to_string);
        match self.otp.begin_request(&email) {
            Ok(()) => Ok(email),
            Err(e) => self.fail(e),
        }
    }

    pub fn complete_request_code(&mut self, result: AppResult<SendOtpResponse>) -> AppResult<()> {
        match self.otp.complete_request(result) {
            Ok(()) => {
                self.notice = Some(Notice::success("OTP sent!"));
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    pub async fn request_code<B>(&mut self, backend: &B) -> AppResult<()>
    where
        B: LeadBackend + ?Sized,
    {
        let email = self.begin_request_code()?;
        let result = backend.send_otp(&email).await;
        self.complete_request_code(result)
    }

    pub fn verify_code(&mut self, entered: &str) -> AppResult<()> {
        match self.otp.verify_code(entered) {
            Ok(()) => {
                self.notice = Some(Notice::success("Email verified!"));
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    pub fn can_submit(&self) -> bool {
        self.otp.is_verified() && !self.submitting && !self.submitted
    }

    /// Field labels still empty among the required ones.
    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_FIELDS
            .iter()
            .filter(|field| self.fields.text(**field).trim().is_empty())
            .map(|field| field.label())
            .collect()
    }

    pub fn begin_submit(&mut self) -> AppResult<LeadSubmission> {
        if self.submitting {
            return self.fail(AppError::Busy("add-lead"));
        }
        if self.submitted {
            return self.fail(AppError::ValidationError(
                "This form has already been submitted".to_string(),
            ));
        }
        if !self.otp.is_verified() {
            return self.fail(AppError::NotVerified);
        }
        let missing = self.missing_required();
        if !missing.is_empty() {
            return self.fail(AppError::ValidationError(format!(
                "Please fill in: {}",
                missing.join(", ")
            )));
        }

        self.submitting = true;
        Ok(LeadSubmission {
            fields: self.fields.clone(),
            page: self.page.clone(),
        })
    }

    /// On failure the form stays as it was so the user can try again.
    pub fn complete_submit(&mut self, result: AppResult<()>) -> AppResult<SubmitOutcome> {
        if !self.submitting {
            return self.fail(AppError::ValidationError(
                "No submission in progress".to_string(),
            ));
        }
        self.submitting = false;

        if let Err(e) = result {
            let err = match e {
                AppError::Submission(msg) => AppError::Submission(msg),
                other => AppError::Submission(other.to_string()),
            };
            return self.fail(err);
        }

        self.submitted = true;
        let outcome = SubmitOutcome {
            message: "Message sent & CRM lead created!".to_string(),
            redirect: self.redirect_target(),
        };
        self.notice = Some(Notice::success(outcome.message.clone()));
        Ok(outcome)
    }

    pub async fn submit<B>(&mut self, backend: &B) -> AppResult<SubmitOutcome>
    where
        B: LeadBackend + ?Sized,
    {
        let submission = self.begin_submit()?;
        let result = backend.add_lead(&submission).await;
        self.complete_submit(result)
    }

    fn redirect_target(&self) -> Option<Redirect> {
        let marker = self.redirect.title_marker.as_deref()?;
        if !self.page.page_title.trim().eq_ignore_ascii_case(marker.trim()) {
            return None;
        }
        Some(Redirect {
            url: self.redirect.url.clone(),
            delay: Duration::from_secs(self.redirect.delay_secs),
        })
    }

    fn fail<T>(&mut self, err: AppError) -> AppResult<T> {
        self.notice = Some(Notice::from(&err));
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OtpConfig;
    use crate::error::VerificationError;
    use crate::services::test_support::ScriptedBackend;
    use crate::store::MemoryStore;
    use crate::utils::{ManualClock, page_context};
    use chrono::Utc;

    fn form_with(redirect: RedirectConfig, title: &str) -> LeadForm<MemoryStore, ManualClock> {
        let otp = OtpVerifier::new(
            MemoryStore::new(),
            ManualClock::new(Utc::now()),
            &OtpConfig::default(),
        );
        let page = page_context("https://example.com/contact?utm_source=ig", title);
        LeadForm::new(page, otp, redirect)
    }

    fn form() -> LeadForm<MemoryStore, ManualClock> {
        form_with(RedirectConfig::default(), "Contact")
    }

    fn fill(form: &mut LeadForm<MemoryStore, ManualClock>) {
        form.set_field(TextField::FirstName, "Ada");
        form.set_field(TextField::LastName, "Lovelace");
        form.set_field(TextField::Email, "ada@example.com");
        form.set_field(TextField::Company, "Analytical Engines");
        form.set_field(TextField::BusinessStatus, "Startup");
        form.set_field(TextField::Country, "GB");
        form.set_field(TextField::Phone, "+441234567890");
    }

    async fn verified_form(backend: &ScriptedBackend) -> LeadForm<MemoryStore, ManualClock> {
        let mut form = form();
        fill(&mut form);
        form.request_code(backend).await.unwrap();
        form.verify_code("482913").unwrap();
        form
    }

    #[test]
    fn test_email_validation_on_set_field() {
        let mut form = form();
        form.set_field(TextField::Email, "");
        assert_eq!(form.email_error(), Some("Email is required"));
        form.set_field(TextField::Email, "ada@example");
        assert_eq!(form.email_error(), Some("Invalid email format"));
        form.set_field(TextField::Email, "ada@example.com");
        assert_eq!(form.email_error(), None);
        form.set_field(TextField::FirstName, "");
        assert_eq!(form.email_error(), None);
    }

    #[test]
    fn test_toggle_service() {
        let mut form = form();
        form.toggle_service(ServiceTag::Odm);
        form.toggle_service(ServiceTag::Other);
        assert_eq!(form.fields().service, vec![ServiceTag::Odm, ServiceTag::Other]);
        form.toggle_service(ServiceTag::Odm);
        assert_eq!(form.fields().service, vec![ServiceTag::Other]);
    }

    #[tokio::test]
    async fn test_can_submit_only_after_verification() {
        let backend = ScriptedBackend::issuing(&["482913"]);
        let mut form = form();
        fill(&mut form);
        assert!(!form.can_submit());

        form.request_code(&backend).await.unwrap();
        assert!(!form.can_submit());
        assert_eq!(form.notice(), Some(&Notice::success("OTP sent!")));

        form.verify_code("482913").unwrap();
        assert!(form.can_submit());
        assert_eq!(form.notice(), Some(&Notice::success("Email verified!")));
    }

    #[tokio::test]
    async fn test_submit_before_verification_is_refused() {
        let backend = ScriptedBackend::issuing(&[]);
        let mut form = form();
        fill(&mut form);

        let err = form.submit(&backend).await.unwrap_err();
        assert!(matches!(err, AppError::NotVerified));
        assert!(form.notice().unwrap().is_error());
        assert!(backend.leads().is_empty());
    }

    #[tokio::test]
    async fn test_empty_email_sets_field_error_on_request() {
        let backend = ScriptedBackend::issuing(&["1"]);
        let mut form = form();

        assert!(form.request_code(&backend).await.is_err());
        assert_eq!(form.email_error(), Some("Email is required"));
        assert!(backend.otp_requests().is_empty());
    }

    #[tokio::test]
    async fn test_verification_failure_becomes_notice() {
        let backend = ScriptedBackend::issuing(&["482913"]);
        let mut form = form();
        fill(&mut form);
        form.request_code(&backend).await.unwrap();

        let err = form.verify_code("nope").unwrap_err();
        assert!(matches!(err, AppError::Verification(VerificationError::Mismatch)));
        assert_eq!(form.notice(), Some(&Notice::error("Invalid OTP")));
        form.dismiss_notice();
        assert!(form.notice().is_none());
    }

    #[tokio::test]
    async fn test_submit_posts_everything() {
        let backend = ScriptedBackend::issuing(&["482913"]);
        let mut form = verified_form(&backend).await;
        form.toggle_service(ServiceTag::Oem);
        form.set_flag(Flag::AgreeMarketing, true);
        form.set_attachments(vec![Attachment::new("sketch.png", vec![1, 2, 3])]);

        let outcome = form.submit(&backend).await.unwrap();
        assert_eq!(outcome.message, "Message sent & CRM lead created!");
        assert!(outcome.redirect.is_none());
        assert!(form.is_submitted());
        assert!(!form.can_submit());

        let leads = backend.leads();
        assert_eq!(leads.len(), 1);
        let parts = leads[0].text_parts();
        assert!(parts.contains(&("name", "Ada Lovelace".to_string())));
        assert!(parts.contains(&("agreeMarketing", "true".to_string())));
        assert!(parts.contains(&("utm_source", "ig".to_string())));
        assert!(parts.contains(&("service[]", "OEM".to_string())));
        assert_eq!(leads[0].attachments().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_submit_leaves_form_for_retry() {
        let backend = ScriptedBackend::issuing(&["482913"]).with_lead_statuses(&[500]);
        let mut form = verified_form(&backend).await;

        let err = form.submit(&backend).await.unwrap_err();
        assert!(matches!(err, AppError::Submission(_)));
        assert_eq!(form.notice(), Some(&Notice::error("Failed, please try again")));
        assert!(!form.is_submitted());
        assert!(form.can_submit());
        assert_eq!(form.fields().first_name, "Ada");

        form.submit(&backend).await.unwrap();
        assert_eq!(backend.leads().len(), 2);
    }

    #[tokio::test]
    async fn test_in_flight_submit_blocks_second() {
        let backend = ScriptedBackend::issuing(&["482913"]);
        let mut form = verified_form(&backend).await;

        form.begin_submit().unwrap();
        assert!(form.is_submitting());
        assert!(!form.can_submit());
        assert!(matches!(form.begin_submit(), Err(AppError::Busy(_))));

        form.complete_submit(Ok(())).unwrap();
        assert!(!form.is_submitting());
    }

    #[test]
    fn test_completion_without_begin_is_refused() {
        let mut form = form();
        fill(&mut form);

        let err = form.complete_submit(Ok(())).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert!(!form.is_submitted());
        assert_eq!(form.status(), VerificationStatus::Unverified);
        assert!(form.notice().unwrap().is_error());
    }

    #[tokio::test]
    async fn test_stray_code_completion_keeps_form_verified() {
        let backend = ScriptedBackend::issuing(&["482913"]);
        let mut form = verified_form(&backend).await;

        let stray = Ok(SendOtpResponse {
            success: true,
            otp: Some("9".to_string()),
            error: None,
        });
        assert!(form.complete_request_code(stray).is_err());
        assert_eq!(form.status(), VerificationStatus::Verified);
        assert!(form.can_submit());
    }

    #[tokio::test]
    async fn test_second_completion_after_submit_is_refused() {
        let backend = ScriptedBackend::issuing(&["482913"]);
        let mut form = verified_form(&backend).await;
        form.submit(&backend).await.unwrap();

        assert!(form.complete_submit(Ok(())).is_err());
        assert!(form.is_submitted());
    }

    #[tokio::test]
    async fn test_missing_required_fields_are_named() {
        let backend = ScriptedBackend::issuing(&["482913"]);
        let mut form = verified_form(&backend).await;
        form.set_field(TextField::Company, "  ");
        form.set_field(TextField::Country, "");

        let err = form.submit(&backend).await.unwrap_err();
        assert_eq!(err.user_message(), "Please fill in: Company Name, Country");
        assert!(!form.is_submitting());
        assert!(backend.leads().is_empty());
    }

    #[tokio::test]
    async fn test_redirect_when_title_matches_marker() {
        let backend = ScriptedBackend::issuing(&["482913"]);
        let redirect = RedirectConfig {
            title_marker: Some("wholesale enquiry".to_string()),
            url: "https://example.com/thank-you".to_string(),
            delay_secs: 2,
        };

        let mut form = form_with(redirect.clone(), "Wholesale Enquiry ");
        fill(&mut form);
        form.request_code(&backend).await.unwrap();
        form.verify_code("482913").unwrap();
        let outcome = form.submit(&backend).await.unwrap();
        assert_eq!(
            outcome.redirect,
            Some(Redirect {
                url: "https://example.com/thank-you".to_string(),
                delay: Duration::from_secs(2),
            })
        );

        let backend = ScriptedBackend::issuing(&["482913"]);
        let mut form = form_with(redirect, "Contact");
        fill(&mut form);
        form.request_code(&backend).await.unwrap();
        form.verify_code("482913").unwrap();
        assert!(form.submit(&backend).await.unwrap().redirect.is_none());
    }
}
