//! Cover-email drafting.
//!
//! One capability, three interchangeable implementations:
//! - [`TemplateDeriver`]: fixed letter, string substitution only
//! - [`StructuredDeriver`]: backend drafts from county/municipality/clerk
//! - [`DocumentDeriver`]: backend drafts from the uploaded document's text
//!
//! Exactly one is active per deployment, chosen by [`DraftMode`].

pub mod document;
pub mod parse;
pub mod structured;
pub mod template;

pub use document::DocumentDeriver;
pub use structured::StructuredDeriver;
pub use template::TemplateDeriver;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::DraftError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::request::IncomingRequest;

/// Sampling temperature for drafting calls.
const DRAFT_TEMPERATURE: f32 = 0.3;
/// Upper bound on drafted output.
const DRAFT_MAX_TOKENS: u32 = 2048;

/// Subject and body of the cover email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftContent {
    pub subject: String,
    pub body: String,
}

impl DraftContent {
    /// Build a draft, enforcing non-empty printable text in both fields.
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Result<Self, DraftError> {
        let subject = subject.into().trim().to_string();
        let body = body.into().trim().to_string();

        if subject.is_empty() {
            return Err(invalid("subject", "empty"));
        }
        if subject.chars().any(char::is_control) {
            return Err(invalid("subject", "contains control characters"));
        }
        if body.is_empty() {
            return Err(invalid("body", "empty"));
        }
        if body
            .chars()
            .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
        {
            return Err(invalid("body", "contains control characters"));
        }

        Ok(Self { subject, body })
    }
}

fn invalid(field: &'static str, reason: &str) -> DraftError {
    DraftError::InvalidContent {
        field,
        reason: reason.to_string(),
    }
}

/// Which deriver a deployment runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftMode {
    Template,
    Structured,
    Document,
}

impl DraftMode {
    /// Whether this mode calls the generative backend.
    pub fn uses_llm(self) -> bool {
        !matches!(self, Self::Template)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Structured => "structured",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for DraftMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DraftMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "template" | "static" => Ok(Self::Template),
            "structured" | "ai" => Ok(Self::Structured),
            "document" | "pdf" => Ok(Self::Document),
            other => Err(format!(
                "unknown draft mode '{other}' (expected template, structured or document)"
            )),
        }
    }
}

/// Produces the cover email's subject and body for one request.
#[async_trait]
pub trait ContentDeriver: Send + Sync {
    fn mode(&self) -> DraftMode;

    async fn derive(&self, request: &IncomingRequest) -> Result<DraftContent, DraftError>;
}

/// Send one instruction to the backend and parse its JSON draft.
///
/// The call is bounded by `timeout`; no retry is attempted.
pub(crate) async fn complete_draft(
    llm: &dyn LlmProvider,
    instruction: String,
    timeout: Duration,
) -> Result<DraftContent, DraftError> {
    let request = CompletionRequest::new(vec![ChatMessage::user(instruction)])
        .with_temperature(DRAFT_TEMPERATURE)
        .with_max_tokens(DRAFT_MAX_TOKENS);

    let response = tokio::time::timeout(timeout, llm.complete(request))
        .await
        .map_err(|_| DraftError::Timeout(timeout))??;

    parse::parse_draft(&response.content)
}

/// Construct the deriver for `mode`.
///
/// `llm` must be present for the AI modes.
pub fn create_deriver(
    mode: DraftMode,
    llm: Option<Arc<dyn LlmProvider>>,
    signature: &str,
    llm_timeout: Duration,
) -> Result<Arc<dyn ContentDeriver>, crate::error::ConfigError> {
    let require_llm = |llm: Option<Arc<dyn LlmProvider>>| {
        llm.ok_or_else(|| crate::error::ConfigError::MissingRequired {
            key: "llm".to_string(),
            hint: format!("draft mode '{mode}' needs a generative backend"),
        })
    };

    let deriver: Arc<dyn ContentDeriver> = match mode {
        DraftMode::Template => Arc::new(TemplateDeriver::new(signature)),
        DraftMode::Structured => Arc::new(StructuredDeriver::new(
            require_llm(llm)?,
            signature,
            llm_timeout,
        )),
        DraftMode::Document => Arc::new(DocumentDeriver::new(
            require_llm(llm)?,
            Arc::new(crate::extract::PdfTextExtractor),
            llm_timeout,
        )),
    };
    Ok(deriver)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::LlmError;
    use crate::llm::{CompletionRequest, CompletionResponse, LlmProvider, Role};
    use crate::request::{EmailAddress, IncomingRequest, Upload};

    /// Backend that returns a canned reply and records every prompt.
    pub struct ScriptedLlm {
        reply: Result<String, String>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(reason: &str) -> Self {
            Self {
                reply: Err(reason.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        pub fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.prompts.lock().unwrap().push(request.joined(Role::User));
            match &self.reply {
                Ok(content) => Ok(CompletionResponse {
                    content: content.clone(),
                }),
                Err(reason) => Err(LlmError::RequestFailed {
                    provider: "scripted".to_string(),
                    reason: reason.clone(),
                }),
            }
        }
    }

    pub fn request(
        county: Option<&str>,
        municipality: Option<&str>,
        clerk_name: Option<&str>,
    ) -> IncomingRequest {
        IncomingRequest {
            recipient: EmailAddress::new("clerk@willingboronj.gov").unwrap(),
            county: county.map(String::from),
            municipality: municipality.map(String::from),
            clerk_name: clerk_name.map(String::from),
            document: Upload::new(Some("opra.pdf".into()), b"%PDF-1.4".to_vec()),
        }
    }
}
