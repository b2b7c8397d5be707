//! Request-scoped input types: the validated recipient and the uploaded document.

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ValidationError;

/// Filename used when the upload carries none.
pub const DEFAULT_FILENAME: &str = "document.pdf";

/// A syntactically valid email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(transparent)]
pub struct EmailAddress {
    #[validate(email)]
    value: String,
}

impl EmailAddress {
    /// Validate and wrap an address. Surrounding whitespace is trimmed.
    pub fn new(email: impl Into<String>) -> Result<Self, ValidationError> {
        let value = email.into().trim().to_string();
        if value.is_empty() {
            return Err(ValidationError::InvalidEmail("(empty)".to_string()));
        }

        let candidate = Self { value };
        candidate
            .validate()
            .map_err(|_| ValidationError::InvalidEmail(candidate.value.clone()))?;

        Ok(candidate)
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// The uploaded document, held fully in memory.
#[derive(Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: Option<String>, bytes: Vec<u8>) -> Self {
        let filename = filename
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
        Self { filename, bytes }
    }
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Everything one submission carries.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub recipient: EmailAddress,
    pub county: Option<String>,
    pub municipality: Option<String>,
    pub clerk_name: Option<String>,
    pub document: Upload,
}

impl IncomingRequest {
    pub fn county(&self) -> Option<&str> {
        non_blank(self.county.as_deref())
    }

    pub fn municipality(&self) -> Option<&str> {
        non_blank(self.municipality.as_deref())
    }

    pub fn clerk_name(&self) -> Option<&str> {
        non_blank(self.clerk_name.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
