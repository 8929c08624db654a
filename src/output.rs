//! Result types returned by [`crate::generate`].

use serde::{Deserialize, Serialize};

/// Outcome of one successful generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    /// ID of the created remote document.
    pub document_id: String,
    /// Shareable web link to the document.
    pub document_link: String,
    /// Title the model chose for the document pair.
    pub subject: String,
    /// Public URL of the uploaded commercial proposal, when one was sent.
    pub commercial_proposal_url: Option<String>,
    /// Public URL of the uploaded technical proposal, when one was sent.
    pub technical_proposal_url: Option<String>,
    /// Reference-document keys that were looked up but not found. These are
    /// degradations, not failures; they are surfaced so operators can fix
    /// the bucket contents.
    pub missing_references: Vec<String>,
    pub stats: GenerationStats,
}

/// Timing and volume statistics for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Characters in the assembled model instruction.
    pub prompt_chars: usize,
    /// Prompt tokens reported by the provider.
    pub input_tokens: u64,
    /// Completion tokens reported by the provider.
    pub output_tokens: u64,
    /// Edit operations produced by the converter.
    pub edit_ops: usize,
    /// Batches submitted to the document service.
    pub batches: usize,
    /// Reference documents successfully loaded from the blob store.
    pub references_loaded: usize,
    /// Reference documents that were looked up but missing.
    pub references_missing: usize,
    pub llm_duration_ms: u64,
    pub docs_duration_ms: u64,
    pub total_duration_ms: u64,
}
