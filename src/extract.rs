//! Plain-text extraction from uploaded PDF documents.

use async_trait::async_trait;

use crate::error::ExtractionError;

/// Turns document bytes into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// PDF extraction backed by `pdf-extract`, run on the blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let owned = bytes.to_vec();
        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&owned)
                .map_err(|e| map_pdf_error(e.to_string()))
        })
        .await
        .map_err(|e| ExtractionError::Task(e.to_string()))??;

        let joined = join_pages(&pages);
        tracing::debug!(
            bytes = bytes.len(),
            pages = pages.len(),
            chars = joined.len(),
            "Extracted document text"
        );
        Ok(joined)
    }
}

/// Rejoin the non-empty pages in order, separated by a blank line.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(|page| page.as_ref().trim())
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn map_pdf_error(message: String) -> ExtractionError {
    let lower = message.to_lowercase();
    if lower.contains("password") || lower.contains("encrypted") {
        ExtractionError::PasswordProtected
    } else {
        ExtractionError::Malformed(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal uncompressed PDF, one Helvetica text line per page.
    fn pdf(pages: &[&str]) -> Vec<u8> {
        let kids = (0..pages.len())
            .map(|i| format!("{} 0 R", 4 + 2 * i))
            .collect::<Vec<_>>()
            .join(" ");
        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", pages.len()),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
        ];
        for (i, text) in pages.iter().enumerate() {
            let content = if text.is_empty() {
                String::new()
            } else {
                format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET")
            };
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                5 + 2 * i
            ));
            objects.push(format!(
                "<< /Length {} >>\nstream\n{content}\nendstream",
                content.len()
            ));
        }

        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
        }
        let xref = out.len();
        let mut tail = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            tail.push_str(&format!("{offset:010} 00000 n \n"));
        }
        tail.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
            objects.len() + 1
        ));
        out.extend_from_slice(tail.as_bytes());
        out
    }

    #[test]
    fn join_pages_keeps_page_order() {
        let pages = ["page one\n", "  page two  ", "page three"];
        assert_eq!(join_pages(&pages), "page one\n\npage two\n\npage three");
    }

    #[test]
    fn join_pages_skips_blank_pages() {
        assert_eq!(join_pages(&["", "\n", "only", "   "]), "only");
    }

    #[test]
    fn join_pages_without_text_is_empty() {
        assert_eq!(join_pages::<&str>(&[]), "");
        assert_eq!(join_pages(&["", "\n"]), "");
    }

    #[tokio::test]
    async fn pages_are_separated_by_blank_line() {
        let text = PdfTextExtractor
            .extract(&pdf(&["First page", "Second page"]))
            .await
            .unwrap();
        assert_eq!(text, "First page\n\nSecond page");
    }

    #[tokio::test]
    async fn empty_page_is_dropped() {
        let text = PdfTextExtractor
            .extract(&pdf(&["First page", "", "Third page"]))
            .await
            .unwrap();
        assert_eq!(text, "First page\n\nThird page");
    }

    #[tokio::test]
    async fn document_without_text_is_empty_not_an_error() {
        let text = PdfTextExtractor.extract(&pdf(&[""])).await.unwrap();
        assert_eq!(text, "");
    }

    #[test]
    fn pdf_error_mapping() {
        assert!(matches!(
            map_pdf_error("document is Encrypted".into()),
            ExtractionError::PasswordProtected
        ));
        assert!(matches!(
            map_pdf_error("invalid file header".into()),
            ExtractionError::Malformed(_)
        ));
    }

    #[tokio::test]
    async fn non_pdf_bytes_fail_extraction() {
        let result = PdfTextExtractor
            .extract(b"this is definitely not a pdf document")
            .await;
        assert!(matches!(
            result,
            Err(ExtractionError::Malformed(_) | ExtractionError::Task(_))
        ));
    }
}
