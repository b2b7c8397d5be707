//! Fixed-letter drafting. No backend involved.

use async_trait::async_trait;

use super::{ContentDeriver, DraftContent, DraftMode};
use crate::error::DraftError;
use crate::request::IncomingRequest;

/// Subject prefix for template drafts.
pub const SUBJECT_PREFIX: &str = "OPRA Request: Accident Reports for ";

/// Drafts a five-paragraph OPRA request letter by substitution.
#[derive(Debug, Clone)]
pub struct TemplateDeriver {
    signature: String,
}

impl TemplateDeriver {
    pub fn new(signature: &str) -> Self {
        Self {
            signature: signature.to_string(),
        }
    }

    /// Render the letter. Pure and deterministic.
    pub fn render(
        &self,
        county: &str,
        municipality: &str,
        clerk_name: &str,
    ) -> Result<DraftContent, DraftError> {
        let subject = format!("{SUBJECT_PREFIX}{municipality}");
        let body = format!(
            "Dear {clerk_name},\n\n\
             Pursuant to the New Jersey Open Public Records Act (OPRA), N.J.S.A. 47:1A-1 et seq., \
             we respectfully request copies of the motor vehicle accident reports maintained by \
             the {municipality}, {county} County police department.\n\n\
             The completed OPRA request form is attached to this email. It identifies the \
             specific records sought, including the relevant dates and locations.\n\n\
             We ask that the responsive records be provided electronically, by reply to this \
             email, where possible. If any fees apply, please let us know before the records \
             are prepared.\n\n\
             If any portion of this request is denied, please cite the specific exemption \
             relied upon so that we may review it.\n\n\
             Thank you for your time and assistance. Please do not hesitate to contact us if \
             you need any additional information.\n\n\
             Sincerely,\n\
             {signature}",
            signature = self.signature,
        );
        DraftContent::new(subject, body)
    }
}

#[async_trait]
impl ContentDeriver for TemplateDeriver {
    fn mode(&self) -> DraftMode {
        DraftMode::Template
    }

    async fn derive(&self, request: &IncomingRequest) -> Result<DraftContent, DraftError> {
        let county = request.county().ok_or(DraftError::MissingField("county"))?;
        let municipality = request
            .municipality()
            .ok_or(DraftError::MissingField("municipality"))?;
        let clerk_name = request
            .clerk_name()
            .ok_or(DraftError::MissingField("clerk_name"))?;

        self.render(county, municipality, clerk_name)
    }
}
