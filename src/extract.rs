//! Text extraction from uploaded byte buffers.
//!
//! Two shapes of input: paginated PDFs, extracted page by page with a
//! separator newline, and everything else, decoded as UTF-8. Extraction
//! failure carries no partial output; the ingestion run treats it as
//! fatal.

use crate::error::ExtractError;

/// Content type handled by the paginated extractor.
pub const CONTENT_TYPE_PDF: &str = "application/pdf";

/// Extract plain text from `bytes` according to the declared content
/// type.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String, ExtractError> {
    if content_type
        .split(';')
        .next()
        .is_some_and(|t| t.trim().eq_ignore_ascii_case(CONTENT_TYPE_PDF))
    {
        extract_pdf(bytes)
    } else {
        String::from_utf8(bytes.to_vec()).map_err(|e| ExtractError::InvalidUtf8(e.to_string()))
    }
}

/// Walk the document's pages in order and join their text with `\n`.
fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;

    let mut text = String::new();
    for (&page_number, _) in doc.get_pages().iter() {
        let page_text = doc
            .extract_text(&[page_number])
            .map_err(|e| ExtractError::Pdf(format!("page {}: {}", page_number, e)))?;
        text.push_str(&page_text);
        text.push('\n');
    }

    Ok(text)
}
