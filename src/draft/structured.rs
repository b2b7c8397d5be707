//! Backend drafting from county, municipality and clerk name.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use super::template::SUBJECT_PREFIX;
use super::{ContentDeriver, DraftContent, DraftMode, complete_draft};
use crate::error::DraftError;
use crate::llm::LlmProvider;
use crate::request::IncomingRequest;

/// Asks the backend for a JSON `{subject, body}` built from the form fields.
pub struct StructuredDeriver {
    llm: Arc<dyn LlmProvider>,
    firm: String,
    timeout: Duration,
}

impl StructuredDeriver {
    pub fn new(llm: Arc<dyn LlmProvider>, firm: &str, timeout: Duration) -> Self {
        Self {
            llm,
            firm: firm.to_string(),
            timeout,
        }
    }

    /// Field values are interpolated verbatim.
    pub fn instruction(&self, county: &str, municipality: &str, clerk_name: &str) -> String {
        format!(
            "You are a helpful paralegal assistant for {firm}.\n\
             Your task is to draft a polite and professional OPRA request email.\n\n\
             Use the following information:\n\
             - County: \"{county}\"\n\
             - Municipality: \"{municipality}\"\n\
             - Clerk's Name: \"{clerk_name}\"\n\n\
             Generate a JSON object with two keys: \"subject\" and \"body\".\n\
             - The \"subject\" must be exactly \"{SUBJECT_PREFIX}{municipality}\".\n\
             - The \"body\" should be addressed to the clerk by name and mention the \
             municipality. It should state that the OPRA request form is attached.\n\n\
             Your entire response must be only the JSON object.",
            firm = self.firm,
        )
    }
}

#[async_trait]
impl ContentDeriver for StructuredDeriver {
    fn mode(&self) -> DraftMode {
        DraftMode::Structured
    }

    async fn derive(&self, request: &IncomingRequest) -> Result<DraftContent, DraftError> {
        let county = request.county().ok_or(DraftError::MissingField("county"))?;
        let municipality = request
            .municipality()
            .ok_or(DraftError::MissingField("municipality"))?;
        let clerk_name = request
            .clerk_name()
            .ok_or(DraftError::MissingField("clerk_name"))?;

        info!(
            county = county,
            municipality = municipality,
            model = self.llm.model_name(),
            "Requesting drafted email from backend"
        );

        let instruction = self.instruction(county, municipality, clerk_name);
        complete_draft(self.llm.as_ref(), instruction, self.timeout).await
    }
}
