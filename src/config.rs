//! Configuration types.
//!
//! Read once at startup from the process environment and never mutated.

use std::time::Duration;

use lettre::message::Mailbox;
use secrecy::SecretString;

use crate::delivery::SmtpSettings;
use crate::draft::DraftMode;
use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

/// Display name used for the sender and the template signature.
pub const DEFAULT_SENDER_NAME: &str = "Ameri Law Firm";

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Active drafting variant.
    pub mode: DraftMode,
    /// Generative backend; `None` when the mode does not use one.
    pub llm: Option<LlmConfig>,
    /// Backend call timeout.
    pub llm_timeout: Duration,
    /// Sender mailbox (`Name <address>`).
    pub sender: Mailbox,
    /// Display name, also used to sign template letters.
    pub sender_name: String,
    /// Relay connection settings.
    pub smtp: SmtpSettings,
    /// HTTP listen port.
    pub port: u16,
    /// Maximum accepted request body, in bytes.
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mode: DraftMode = parse_or(&get, "OPRA_DRAFT_MODE", DraftMode::Structured)?;

        let llm = if mode.uses_llm() {
            let backend: LlmBackend = parse_or(&get, "OPRA_LLM_BACKEND", LlmBackend::Gemini)?;
            let key_var = backend.api_key_var();
            let api_key = get(key_var).ok_or_else(|| ConfigError::MissingRequired {
                key: key_var.to_string(),
                hint: format!("Draft mode '{mode}' calls the generative backend."),
            })?;
            let model = get("OPRA_LLM_MODEL").unwrap_or_else(|| backend.default_model().to_string());
            Some(LlmConfig {
                backend,
                api_key: SecretString::from(api_key),
                model,
            })
        } else {
            None
        };

        let sender_email =
            get("SENDER_EMAIL").ok_or_else(|| ConfigError::MissingEnvVar("SENDER_EMAIL".into()))?;
        let sender_name = get("SENDER_NAME").unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string());
        let sender = Mailbox::new(
            Some(sender_name.clone()),
            sender_email.parse().map_err(|e: lettre::address::AddressError| {
                ConfigError::InvalidValue {
                    key: "SENDER_EMAIL".into(),
                    message: e.to_string(),
                }
            })?,
        );

        let password =
            get("APP_PASSWORD").ok_or_else(|| ConfigError::MissingEnvVar("APP_PASSWORD".into()))?;

        let smtp = SmtpSettings {
            host: get("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
            port: parse_or(&get, "SMTP_PORT", 465)?,
            username: sender_email,
            password: SecretString::from(password),
            timeout: Duration::from_secs(parse_or(&get, "SMTP_TIMEOUT_SECS", 30)?),
        };

        let max_upload_mb: usize = parse_or(&get, "OPRA_MAX_UPLOAD_MB", 25)?;
        let max_upload_bytes = max_upload_mb.checked_mul(1024 * 1024).ok_or_else(|| {
            ConfigError::InvalidValue {
                key: "OPRA_MAX_UPLOAD_MB".into(),
                message: format!("{max_upload_mb} MiB overflows the byte limit"),
            }
        })?;

        Ok(Self {
            mode,
            llm,
            llm_timeout: Duration::from_secs(parse_or(&get, "OPRA_LLM_TIMEOUT_SECS", 60)?),
            sender,
            sender_name,
            smtp,
            port: parse_or(&get, "OPRA_PORT", 8000)?,
            max_upload_bytes,
        })
    }
}

/// Parse `key` if set, otherwise use `default`.
fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}
