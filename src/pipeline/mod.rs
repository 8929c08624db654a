//! Pipeline stages for ETP/TR document generation.
//!
//! Each submodule implements exactly one transformation step, independently
//! testable.
//!
//! ## Data Flow
//!
//! ```text
//! assemble ──▶ llm ──▶ docops
//! (context)   (JSON    (Markdown →
//!  + prompt)   reply)   edit ops)
//! ```
//!
//! 1. [`extract`]  — pull plain text out of uploaded proposal PDFs; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 2. [`assemble`] — gather form fields, proposal texts, and blob-store
//!    reference documents into one [`assemble::LlmContext`]
//! 3. [`llm`]      — drive the model call with retry/backoff and parse the
//!    JSON reply; the only stage with network I/O
//! 4. [`docops`]   — convert the combined Markdown into the ordered
//!    edit-operation sequence the document service applies

pub mod assemble;
pub mod docops;
pub mod extract;
pub mod llm;
