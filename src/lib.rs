//! # tenderdoc
//!
//! Generate Brazilian public-procurement planning documents (ETP — Estudo
//! Técnico Preliminar — and TR — Termo de Referência) as shareable Google
//! Docs, from a structured form request plus optional proposal PDFs.
//!
//! ## Why this crate?
//!
//! Drafting an ETP/TR pair by hand takes a procurement team days. This
//! crate collects the form data, enriches it with per-product reference
//! documents and legal examples from a blob store, asks an LLM for the two
//! sections as Markdown, and then — the part no API does for you —
//! converts that Markdown into the ordered positional edit operations a
//! Google Docs-style service accepts, with correct 1-based character
//! offsets for every heading, bullet, and bold run.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Request (form + PDFs)
//!  │
//!  ├─ 1. Extract   proposal PDF text via pdfium (spawn_blocking)
//!  ├─ 2. Assemble  reference docs from the blob store + derived fields
//!  ├─ 3. Prompt    one instruction with the JSON output contract
//!  ├─ 4. LLM       retry/backoff call, parse {subject, etp, tr}
//!  ├─ 5. Convert   Markdown → ordered edit ops (the converter core)
//!  └─ 6. Apply     create doc, submit batches in order, share, link
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tenderdoc::{generate_with_google, GenerationConfig, GenerationRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let request: GenerationRequest =
//!         serde_json::from_str(&std::fs::read_to_string("request.json")?)?;
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …;
//!     // Google APIs authenticated via GOOGLE_ACCESS_TOKEN.
//!     let config = GenerationConfig::default();
//!     let output = generate_with_google(request, &config).await?;
//!     println!("{}", output.document_link);
//!     eprintln!("{} ops in {} batches", output.stats.edit_ops, output.stats.batches);
//!     Ok(())
//! }
//! ```
//!
//! The converter is usable on its own, fully offline:
//!
//! ```rust
//! let ops = tenderdoc::markdown_to_ops("# Título\n\n- item **importante**\n");
//! assert!(!ops.is_empty());
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `tenderdoc` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! tenderdoc = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod docs;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod request;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GenerationConfig, GenerationConfigBuilder, DEFAULT_BUCKET};
pub use docs::{CreatedDocument, DocumentSink, GoogleDocsSink};
pub use error::DocGenError;
pub use generate::{generate, generate_with_google};
pub use output::{GenerationOutput, GenerationStats};
pub use pipeline::docops::{
    chunk_ops, markdown_to_ops, EditOp, ParagraphStyle, Range, DEFAULT_MAX_BATCH_OPS,
    PAGE_BREAK_SENTINEL,
};
pub use request::{GenerationRequest, ProposalFile};
pub use storage::{BlobStore, GcsStore, MemoryStore};
