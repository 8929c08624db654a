//! Error types for the tenderdoc library.
//!
//! Everything here is a *fatal* generation error: the document cannot be
//! produced at all. Degradable conditions — a reference document missing from
//! the blob store, a proposal PDF with no extractable text — are deliberately
//! not errors; the assembler logs them and substitutes placeholder text so
//! that one odd input never sinks a whole generation. The Markdown-to-edit-op
//! converter has no error path at all (see [`crate::pipeline::docops`]).

use thiserror::Error;

/// All fatal errors returned by the tenderdoc library.
#[derive(Debug, Error)]
pub enum DocGenError {
    // ── Request / config errors ───────────────────────────────────────────
    /// A required form field is empty or missing.
    #[error("Required field '{field}' is empty")]
    MissingField { field: &'static str },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No Google access token available for the storage / document services.
    #[error("No Google access token configured.\nSet GOOGLE_ACCESS_TOKEN or provide one via GenerationConfig.")]
    TokenMissing,

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API failed after all retries.
    #[error("LLM API error after {retries} retries: {message}")]
    LlmApiError { retries: u32, message: String },

    /// The model reply was not the expected JSON object after all retries.
    #[error("Model reply is not a valid JSON document object: {detail}")]
    MalformedReply { detail: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The uploaded proposal bytes could not be opened as a PDF.
    #[error("Failed to read proposal PDF '{name}': {detail}")]
    PdfExtractFailed { name: String, detail: String },

    // ── Storage errors ────────────────────────────────────────────────────
    /// A blob-store read failed (transport or non-404 status).
    #[error("Storage read failed for '{key}': {reason}")]
    StorageReadFailed { key: String, reason: String },

    /// A blob-store upload failed. Uploads are fatal: the proposal URL is
    /// part of the response contract.
    #[error("Storage upload failed for '{key}': {reason}")]
    StorageUploadFailed { key: String, reason: String },

    // ── Document-service errors ───────────────────────────────────────────
    /// The Docs/Drive API returned a non-success status.
    #[error("Document service returned HTTP {status}: {detail}")]
    DocServiceFailed { status: u16, detail: String },

    /// The document was created but no ID came back.
    #[error("Document service did not return a document ID")]
    DocumentNotCreated,

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
