use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::AppError;
use crate::models::PageContext;

pub const BUSINESS_STATUS_OPTIONS: [&str; 3] = ["In the business", "Startup", "Other"];

/// Text inputs of the form, addressed by their wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    FirstName,
    LastName,
    Company,
    Email,
    Phone,
    Country,
    BusinessStatus,
    Message,
}

impl TextField {
    pub fn wire_name(&self) -> &'static str {
        match self {
            TextField::FirstName => "firstName",
            TextField::LastName => "lastName",
            TextField::Company => "company",
            TextField::Email => "email",
            TextField::Phone => "phone",
            TextField::Country => "country",
            TextField::BusinessStatus => "businessStatus",
            TextField::Message => "message",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TextField::FirstName => "First Name",
            TextField::LastName => "Last Name",
            TextField::Company => "Company Name",
            TextField::Email => "Email",
            TextField::Phone => "Phone",
            TextField::Country => "Country",
            TextField::BusinessStatus => "Business Status",
            TextField::Message => "Message",
        }
    }
}

impl FromStr for TextField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "firstName" => Ok(TextField::FirstName),
            "lastName" => Ok(TextField::LastName),
            "company" => Ok(TextField::Company),
            "email" => Ok(TextField::Email),
            "phone" => Ok(TextField::Phone),
            "country" => Ok(TextField::Country),
            "businessStatus" => Ok(TextField::BusinessStatus),
            "message" => Ok(TextField::Message),
            other => Err(AppError::ValidationError(format!("Unknown field: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    AgreeTerms,
    AgreeMarketing,
}

impl FromStr for Flag {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agreeTerms" => Ok(Flag::AgreeTerms),
            "agreeMarketing" => Ok(Flag::AgreeMarketing),
            other => Err(AppError::ValidationError(format!("Unknown flag: {other}"))),
        }
    }
}

/// "How can we help you?" options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceTag {
    #[serde(rename = "ODM")]
    Odm,
    #[serde(rename = "OEM")]
    Oem,
    #[serde(rename = "Other")]
    Other,
}

impl ServiceTag {
    pub fn description(&self) -> &'static str {
        match self {
            ServiceTag::Odm => "ODM (Your brand, our designs)",
            ServiceTag::Oem => "OEM (You design, we create)",
            ServiceTag::Other => "Other",
        }
    }
}

impl std::fmt::Display for ServiceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceTag::Odm => write!(f, "ODM"),
            ServiceTag::Oem => write!(f, "OEM"),
            ServiceTag::Other => write!(f, "Other"),
        }
    }
}

impl FromStr for ServiceTag {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ODM" => Ok(ServiceTag::Odm),
            "OEM" => Ok(ServiceTag::Oem),
            "Other" => Ok(ServiceTag::Other),
            other => Err(AppError::ValidationError(format!(
                "Unknown service option: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub country: String,
    pub business_status: String,
    pub service: Vec<ServiceTag>,
    pub message: String,
    pub agree_terms: bool,
    pub agree_marketing: bool,
    pub attachments: Vec<Attachment>,
}

impl FormFields {
    pub fn text(&self, field: TextField) -> &str {
        match field {
            TextField::FirstName => &self.first_name,
            TextField::LastName => &self.last_name,
            TextField::Company => &self.company,
            TextField::Email => &self.email,
            TextField::Phone => &self.phone,
            TextField::Country => &self.country,
            TextField::BusinessStatus => &self.business_status,
            TextField::Message => &self.message,
        }
    }

    pub fn text_mut(&mut self, field: TextField) -> &mut String {
        match field {
            TextField::FirstName => &mut self.first_name,
            TextField::LastName => &mut self.last_name,
            TextField::Company => &mut self.company,
            TextField::Email => &mut self.email,
            TextField::Phone => &mut self.phone,
            TextField::Country => &mut self.country,
            TextField::BusinessStatus => &mut self.business_status,
            TextField::Message => &mut self.message,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Lead payload as posted to `/add-lead`.
#[derive(Debug, Clone)]
pub struct LeadSubmission {
    pub fields: FormFields,
    pub page: PageContext,
}

impl LeadSubmission {
    /// Text parts in posting order. `service[]` repeats once per tag.
    pub fn text_parts(&self) -> Vec<(&'static str, String)> {
        let f = &self.fields;
        let mut parts = vec![
            ("firstName", f.first_name.clone()),
            ("lastName", f.last_name.clone()),
            ("name", f.display_name()),
            ("email", f.email.clone()),
            ("phone", f.phone.clone()),
            ("company", f.company.clone()),
            ("businessStatus", f.business_status.clone()),
            ("country", f.country.clone()),
            ("message", f.message.clone()),
            ("agreeTerms", f.agree_terms.to_string()),
            ("agreeMarketing", f.agree_marketing.to_string()),
            ("pageUrl", self.page.page_url.clone()),
            ("pageTitle", self.page.page_title.clone()),
        ];
        parts.extend(self.page.utm.pairs());
        parts.extend(f.service.iter().map(|s| ("service[]", s.to_string())));
        parts
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.fields.attachments
    }
}
