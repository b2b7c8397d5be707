//! Backend drafting from the uploaded document's own text.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{ContentDeriver, DraftContent, DraftMode, complete_draft};
use crate::error::DraftError;
use crate::extract::TextExtractor;
use crate::llm::LlmProvider;
use crate::request::IncomingRequest;

pub const DOCUMENT_START: &str = "--- DOCUMENT START ---";
pub const DOCUMENT_END: &str = "--- DOCUMENT END ---";

/// Extracts the document text, then lets the backend infer the
/// municipality and draft the email.
pub struct DocumentDeriver {
    llm: Arc<dyn LlmProvider>,
    extractor: Arc<dyn TextExtractor>,
    timeout: Duration,
}

impl DocumentDeriver {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        extractor: Arc<dyn TextExtractor>,
        timeout: Duration,
    ) -> Self {
        Self {
            llm,
            extractor,
            timeout,
        }
    }

    /// The document text is embedded verbatim. An empty document yields an
    /// empty content block.
    pub fn instruction(&self, recipient: &str, document_text: &str) -> String {
        format!(
            "You are a helpful paralegal assistant drafting a cover email for an OPRA \
             (New Jersey Open Public Records Act) request.\n\
             The email will be sent to the municipal clerk at {recipient}, with the request \
             form below attached.\n\n\
             Read the request form and infer the name of the municipality it is addressed to.\n\n\
             {DOCUMENT_START}\n\
             {document_text}\n\
             {DOCUMENT_END}\n\n\
             Generate a JSON object with two keys: \"subject\" and \"body\".\n\
             - The \"subject\" must be \"OPRA Request: \" followed by the inferred municipality name.\n\
             - The \"body\" must be a polite, professional letter to the clerk that refers to \
             the attached OPRA request form.\n\n\
             Your entire response must be only the JSON object."
        )
    }
}

#[async_trait]
impl ContentDeriver for DocumentDeriver {
    fn mode(&self) -> DraftMode {
        DraftMode::Document
    }

    async fn derive(&self, request: &IncomingRequest) -> Result<DraftContent, DraftError> {
        let text = self.extractor.extract(&request.document.bytes).await?;

        if text.is_empty() {
            warn!(
                filename = %request.document.filename,
                "Document has no extractable text; drafting from an empty content block"
            );
        }

        info!(
            filename = %request.document.filename,
            chars = text.len(),
            model = self.llm.model_name(),
            "Requesting drafted email from document text"
        );

        let instruction = self.instruction(request.recipient.as_str(), &text);
        complete_draft(self.llm.as_ref(), instruction, self.timeout).await
    }
}
