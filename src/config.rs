use serde::{Deserialize, Serialize};
use std::env;

/// Longest code lifetime accepted, one day.
pub const MAX_OTP_TTL_SECS: i64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub otp: OtpConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub redirect: RedirectConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    pub ttl_secs: i64,
    pub resend_cooldown_secs: u32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            resend_cooldown_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: ".lead-form/storage.json".to_string(),
        }
    }
}

/// Post-submit redirect, applied only when the page title matches `title_marker`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectConfig {
    #[serde(default)]
    pub title_marker: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_redirect_delay_secs")]
    pub delay_secs: u64,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            title_marker: None,
            url: String::new(),
            delay_secs: default_redirect_delay_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_redirect_delay_secs() -> u64 {
    3
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // No config file means defaults plus environment variables.
        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No config file at {config_path}, using defaults");
                Config::default()
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Config =
            toml::from_str(config_str).map_err(|e| format!("Failed to parse config file: {e}"))?;
        Ok(config)
    }

    // Environment variables win even when a file exists.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("LEAD_FORM_BACKEND_URL") {
            self.backend.base_url = v;
        }
        if let Ok(v) = env::var("LEAD_FORM_BACKEND_TIMEOUT")
            && let Ok(n) = v.parse()
        {
            self.backend.timeout_secs = n;
        }
        if let Ok(v) = env::var("LEAD_FORM_OTP_TTL")
            && let Ok(n) = v.parse()
        {
            self.otp.ttl_secs = n;
        }
        if let Ok(v) = env::var("LEAD_FORM_OTP_COOLDOWN")
            && let Ok(n) = v.parse()
        {
            self.otp.resend_cooldown_secs = n;
        }
        if let Ok(v) = env::var("LEAD_FORM_STORAGE_PATH") {
            self.storage.path = v;
        }
        if let Ok(v) = env::var("LEAD_FORM_REDIRECT_MARKER") {
            self.redirect.title_marker = Some(v);
        }
        if let Ok(v) = env::var("LEAD_FORM_REDIRECT_URL") {
            self.redirect.url = v;
        }
        if let Ok(v) = env::var("LEAD_FORM_REDIRECT_DELAY")
            && let Ok(n) = v.parse()
        {
            self.redirect.delay_secs = n;
        }
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.backend.base_url.trim().is_empty() {
            return Err("backend.base_url must not be empty".into());
        }
        if self.otp.ttl_secs <= 0 || self.otp.ttl_secs > MAX_OTP_TTL_SECS {
            return Err(format!("otp.ttl_secs must be between 1 and {MAX_OTP_TTL_SECS}").into());
        }
        if self.redirect.title_marker.is_some() && self.redirect.url.trim().is_empty() {
            return Err("redirect.url is required when redirect.title_marker is set".into());
        }
        Ok(())
    }
}
