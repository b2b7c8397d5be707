//! Error types for OPRA Mailer.

use std::time::Duration;

/// Startup error: everything that can stop the service from being built.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Inbound request validation errors. Raised before any external call.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Missing file upload")]
    MissingFile,
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Document text extraction errors.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Document is not a readable PDF: {0}")]
    Malformed(String),

    #[error("Document is password protected")]
    PasswordProtected,

    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// Errors while deriving the subject and body of the cover email.
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Backend call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Backend call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Backend response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Backend response is not a JSON object")]
    NotAnObject,

    #[error("Backend response is missing the \"{0}\" key")]
    MissingKey(&'static str),

    #[error("Backend response key \"{0}\" is not a string")]
    NotAString(&'static str),

    #[error("Backend response has unexpected key \"{0}\"")]
    UnexpectedKey(String),

    #[error("Draft {field} is invalid: {reason}")]
    InvalidContent { field: &'static str, reason: String },

    #[error("{0}")]
    Extraction(#[from] ExtractionError),
}

/// Mail delivery errors. Never escape the delivery boundary.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("Failed to connect to {host}: {reason}")]
    Connect { host: String, reason: String },

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Relay rejected message: {0}")]
    SubmitFailed(String),

    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("Delivery task failed: {0}")]
    Task(String),
}

/// Result type alias for startup wiring.
pub type Result<T> = std::result::Result<T, Error>;
