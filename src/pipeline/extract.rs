//! Proposal text extraction via pdfium.
//!
//! The pdfium C++ library uses thread-local state and is not safe to call
//! from async contexts, so extraction runs inside
//! `tokio::task::spawn_blocking`. Extraction quality is deliberately
//! best-effort: scanned (image-only) PDFs yield little or no text, and the
//! assembler substitutes a placeholder rather than failing the run.

use crate::error::DocGenError;
use pdfium_render::prelude::*;
use tracing::{debug, warn};

/// Extract the plain text of every page, joined by newlines.
///
/// Returns an empty string for an image-only PDF; only a document that
/// cannot be opened at all is an error.
pub async fn extract_pdf_text(name: &str, bytes: Vec<u8>) -> Result<String, DocGenError> {
    let name = name.to_string();
    tokio::task::spawn_blocking(move || extract_blocking(&name, &bytes))
        .await
        .map_err(|e| DocGenError::Internal(format!("Extraction task panicked: {e}")))?
}

/// Blocking implementation of text extraction.
fn extract_blocking(name: &str, bytes: &[u8]) -> Result<String, DocGenError> {
    let pdfium = Pdfium::default();

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| DocGenError::PdfExtractFailed {
            name: name.to_string(),
            detail: format!("{:?}", e),
        })?;

    let mut text = String::new();
    for (idx, page) in document.pages().iter().enumerate() {
        match page.text() {
            Ok(page_text) => {
                let s = page_text.all();
                if s.trim().is_empty() {
                    warn!("No text extracted from page {} of '{}'", idx + 1, name);
                } else {
                    text.push_str(&s);
                    text.push('\n');
                }
            }
            Err(e) => {
                warn!("Text extraction failed on page {} of '{}': {:?}", idx + 1, name, e);
            }
        }
    }

    debug!("Extracted {} chars from '{}'", text.len(), name);
    Ok(text)
}
