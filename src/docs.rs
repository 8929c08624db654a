//! The remote document service: edit-operation encoding and submission.
//!
//! [`DocumentSink`] is the seam the generator drives: create a titled
//! document, apply ordered operation batches transactionally, optionally
//! share it, and fetch its web link. [`GoogleDocsSink`] implements it over
//! the Docs and Drive REST APIs with a bearer token.
//!
//! The JSON encoding of each [`EditOp`] mirrors the Docs `batchUpdate`
//! request shapes: `insertText`, `updateParagraphStyle` with a
//! `namedStyleType`, `createParagraphBullets` with the disc/circle/square
//! preset, `updateTextStyle` with the `bold` field, and `insertPageBreak`.

use crate::error::DocGenError;
use crate::pipeline::docops::{EditOp, ParagraphStyle, Range};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A freshly created remote document.
#[derive(Debug, Clone)]
pub struct CreatedDocument {
    pub id: String,
    /// Web link when the create call already returned one.
    pub link: Option<String>,
}

/// Ordered sink for edit-operation batches.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Create an empty document with the given title.
    async fn create(&self, title: &str) -> Result<CreatedDocument, DocGenError>;

    /// Apply one ordered batch of operations. Batches must be submitted in
    /// emission order; the service applies each batch transactionally.
    async fn apply(&self, document_id: &str, batch: &[EditOp]) -> Result<(), DocGenError>;

    /// Share the document read-only with anyone holding the link.
    async fn share_with_anyone(&self, document_id: &str) -> Result<(), DocGenError>;

    /// Fetch the shareable web link.
    async fn web_link(&self, document_id: &str) -> Result<String, DocGenError>;
}

// ── Edit-op encoding ─────────────────────────────────────────────────────

fn encode_range(range: &Range) -> Value {
    json!({ "startIndex": range.start, "endIndex": range.end })
}

/// Encode one edit operation as a Docs API request object.
pub fn encode_op(op: &EditOp) -> Value {
    match op {
        EditOp::InsertText { at, text } => json!({
            "insertText": { "location": { "index": at }, "text": text }
        }),
        EditOp::SetParagraphStyle { range, style } => {
            let named = match style {
                ParagraphStyle::Heading1 => "HEADING_1",
                ParagraphStyle::Heading2 => "HEADING_2",
                ParagraphStyle::Heading3 => "HEADING_3",
            };
            json!({
                "updateParagraphStyle": {
                    "range": encode_range(range),
                    "paragraphStyle": { "namedStyleType": named },
                    "fields": "namedStyleType"
                }
            })
        }
        EditOp::SetListBullet { range } => json!({
            "createParagraphBullets": {
                "range": encode_range(range),
                "bulletPreset": "BULLET_DISC_CIRCLE_SQUARE"
            }
        }),
        EditOp::SetBold { range } => json!({
            "updateTextStyle": {
                "range": encode_range(range),
                "textStyle": { "bold": true },
                "fields": "bold"
            }
        }),
        EditOp::InsertPageBreak { at } => json!({
            "insertPageBreak": { "location": { "index": at } }
        }),
    }
}

/// Encode a batch as a `batchUpdate` request body.
pub fn encode_batch(batch: &[EditOp]) -> Value {
    json!({ "requests": batch.iter().map(encode_op).collect::<Vec<_>>() })
}

// ── Google Docs / Drive implementation ───────────────────────────────────

const DRIVE_FILES_API: &str = "https://www.googleapis.com/drive/v3/files";
const DOCS_API: &str = "https://docs.googleapis.com/v1/documents";
const GOOGLE_DOC_MIME: &str = "application/vnd.google-apps.document";

/// Document sink over the Google Docs and Drive REST APIs.
pub struct GoogleDocsSink {
    http: reqwest::Client,
    token: String,
}

impl GoogleDocsSink {
    pub fn new(token: impl Into<String>, timeout_secs: u64) -> Result<Self, DocGenError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DocGenError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            token: token.into(),
        })
    }

    async fn expect_json(&self, response: reqwest::Response) -> Result<Value, DocGenError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // The API wraps errors as {"error": {"message": …}}; surface the
            // message when present, the raw body otherwise.
            let detail = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| {
                    v.pointer("/error/message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or(body);
            return Err(DocGenError::DocServiceFailed {
                status: status.as_u16(),
                detail,
            });
        }
        response
            .json()
            .await
            .map_err(|e| DocGenError::Internal(format!("document service reply: {e}")))
    }
}

#[async_trait]
impl DocumentSink for GoogleDocsSink {
    async fn create(&self, title: &str) -> Result<CreatedDocument, DocGenError> {
        let response = self
            .http
            .post(DRIVE_FILES_API)
            .query(&[("fields", "id,webViewLink")])
            .bearer_auth(&self.token)
            .json(&json!({ "name": title, "mimeType": GOOGLE_DOC_MIME }))
            .send()
            .await
            .map_err(|e| DocGenError::Internal(format!("document create: {e}")))?;

        let body = self.expect_json(response).await?;
        let id = body
            .get("id")
            .and_then(Value::as_str)
            .ok_or(DocGenError::DocumentNotCreated)?
            .to_string();
        let link = body
            .get("webViewLink")
            .and_then(Value::as_str)
            .map(str::to_string);
        info!("Created document '{}' (id: {})", title, id);
        Ok(CreatedDocument { id, link })
    }

    async fn apply(&self, document_id: &str, batch: &[EditOp]) -> Result<(), DocGenError> {
        if batch.is_empty() {
            return Ok(());
        }
        debug!("Submitting batch of {} ops to {}", batch.len(), document_id);
        let url = format!("{DOCS_API}/{document_id}:batchUpdate");
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&encode_batch(batch))
            .send()
            .await
            .map_err(|e| DocGenError::Internal(format!("batchUpdate: {e}")))?;
        self.expect_json(response).await?;
        Ok(())
    }

    async fn share_with_anyone(&self, document_id: &str) -> Result<(), DocGenError> {
        let url = format!("{DRIVE_FILES_API}/{document_id}/permissions");
        let response = self
            .http
            .post(url)
            .query(&[("fields", "id")])
            .bearer_auth(&self.token)
            .json(&json!({ "type": "anyone", "role": "reader" }))
            .send()
            .await
            .map_err(|e| DocGenError::Internal(format!("share: {e}")))?;
        match self.expect_json(response).await {
            Ok(_) => Ok(()),
            // Domain policy can forbid 'anyone' permissions; the document
            // still exists, so callers treat this as a warning.
            Err(e) => {
                warn!("Could not share document {}: {}", document_id, e);
                Err(e)
            }
        }
    }

    async fn web_link(&self, document_id: &str) -> Result<String, DocGenError> {
        let url = format!("{DRIVE_FILES_API}/{document_id}");
        let response = self
            .http
            .get(url)
            .query(&[("fields", "webViewLink")])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| DocGenError::Internal(format!("file get: {e}")))?;
        let body = self.expect_json(response).await?;
        Ok(body
            .get("webViewLink")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| default_doc_link(document_id)))
    }
}

/// Fallback edit link when the service does not return one.
pub fn default_doc_link(document_id: &str) -> String {
    format!("https://docs.google.com/document/d/{document_id}/edit")
}
