//! Generation orchestration: the end-to-end ETP/TR pipeline.
//!
//! [`generate`] is the seam-based entry point — caller supplies the blob
//! store and document sink — and [`generate_with_google`] is the production
//! convenience that wires up [`GcsStore`] and [`GoogleDocsSink`] from the
//! configured bearer token.
//!
//! ## Pipeline
//!
//! 1. Validate the request and assemble the model context (form fields,
//!    proposal texts, reference documents).
//! 2. Build the prompt, resolve the provider, and call the model with
//!    retry/backoff; parse the JSON reply into subject/ETP/TR.
//! 3. Combine the two sections with a page-break sentinel, convert the
//!    Markdown into ordered edit operations, and submit them to the
//!    document sink in sequential batches.
//! 4. Optionally share the document; return the link and run statistics.

use crate::config::GenerationConfig;
use crate::docs::{DocumentSink, GoogleDocsSink};
use crate::error::DocGenError;
use crate::output::{GenerationOutput, GenerationStats};
use crate::pipeline::docops::{chunk_ops, markdown_to_ops, PAGE_BREAK_SENTINEL};
use crate::pipeline::{assemble, llm};
use crate::prompts::build_generation_prompt;
use crate::request::GenerationRequest;
use crate::storage::{BlobStore, GcsStore};
use std::time::Instant;
use tracing::{info, warn};

/// Run the full generation pipeline against caller-supplied collaborators.
///
/// Sharing is best-effort: a failure there is logged and the run still
/// succeeds. Everything else — assembly transport errors, an exhausted LLM
/// retry budget, a rejected batch — aborts with the stage's error.
pub async fn generate(
    request: GenerationRequest,
    store: &dyn BlobStore,
    sink: &dyn DocumentSink,
    config: &GenerationConfig,
) -> Result<GenerationOutput, DocGenError> {
    let total_start = Instant::now();
    request.validate()?;

    // ── Stage 1: context ─────────────────────────────────────────────────
    let context = assemble::assemble_context(request, store).await?;

    // ── Stage 2: model call ──────────────────────────────────────────────
    let prompt = build_generation_prompt(&context);
    info!("Prompt assembled: {} chars", prompt.len());

    let provider = llm::resolve_provider(config).await?;
    let reply = llm::generate_sections(&provider, &prompt, config).await?;

    let req = &context.request;
    let subject = reply.sections.subject.clone().unwrap_or_else(|| {
        format!(
            "ETP e TR: {} - {} ({})",
            req.requesting_agency, req.project_title, context.generation_date
        )
    });
    let etp = reply.sections.etp_content.clone().unwrap_or_else(|| {
        warn!("Model reply carried no ETP section; emitting error notice");
        "# ETP\n\nErro: Conteúdo do ETP não foi gerado corretamente pelo LLM.".to_string()
    });
    let tr = reply.sections.tr_content.clone().unwrap_or_else(|| {
        warn!("Model reply carried no TR section; emitting error notice");
        "# Termo de Referência\n\nErro: Conteúdo do TR não foi gerado corretamente pelo LLM."
            .to_string()
    });

    // ── Stage 3: convert and submit ──────────────────────────────────────
    let combined = format!("{etp}\n{PAGE_BREAK_SENTINEL}\n{tr}");
    let ops = markdown_to_ops(&combined);
    info!("Converted {} chars of Markdown into {} edit ops", combined.len(), ops.len());

    let docs_start = Instant::now();
    let created = sink.create(&subject).await?;
    let mut batches = 0usize;
    for batch in chunk_ops(&ops, config.max_batch_ops) {
        sink.apply(&created.id, batch).await?;
        batches += 1;
    }
    info!("Applied {} ops in {} batches to document {}", ops.len(), batches, created.id);

    if config.share_public {
        if let Err(e) = sink.share_with_anyone(&created.id).await {
            warn!("Sharing failed, document stays restricted: {}", e);
        }
    }

    let document_link = match created.link {
        Some(link) => link,
        None => sink.web_link(&created.id).await?,
    };
    let docs_duration_ms = docs_start.elapsed().as_millis() as u64;

    Ok(GenerationOutput {
        document_id: created.id,
        document_link,
        subject,
        commercial_proposal_url: context.commercial_proposal_url,
        technical_proposal_url: context.technical_proposal_url,
        missing_references: context.missing_references.clone(),
        stats: GenerationStats {
            prompt_chars: prompt.chars().count(),
            input_tokens: reply.input_tokens as u64,
            output_tokens: reply.output_tokens as u64,
            edit_ops: ops.len(),
            batches,
            references_loaded: context.references_loaded,
            references_missing: context.missing_references.len(),
            llm_duration_ms: reply.duration_ms,
            docs_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        },
    })
}

/// Run the pipeline against Google Cloud Storage and Google Docs, using the
/// configured bearer token for both.
pub async fn generate_with_google(
    request: GenerationRequest,
    config: &GenerationConfig,
) -> Result<GenerationOutput, DocGenError> {
    let token = config
        .access_token
        .as_deref()
        .ok_or(DocGenError::TokenMissing)?;
    let store = GcsStore::new(&config.bucket, token, config.api_timeout_secs)?;
    let sink = GoogleDocsSink::new(token, config.api_timeout_secs)?;
    generate(request, &store, &sink, config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::CreatedDocument;
    use crate::pipeline::docops::EditOp;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every call so tests can assert batch order and sharing.
    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<Vec<EditOp>>>,
        shared: Mutex<bool>,
    }

    #[async_trait]
    impl DocumentSink for RecordingSink {
        async fn create(&self, _title: &str) -> Result<CreatedDocument, DocGenError> {
            Ok(CreatedDocument {
                id: "doc-1".into(),
                link: Some("https://docs.google.com/document/d/doc-1/edit".into()),
            })
        }

        async fn apply(&self, _id: &str, batch: &[EditOp]) -> Result<(), DocGenError> {
            self.batches.lock().unwrap().push(batch.to_vec());
            Ok(())
        }

        async fn share_with_anyone(&self, _id: &str) -> Result<(), DocGenError> {
            *self.shared.lock().unwrap() = true;
            Ok(())
        }

        async fn web_link(&self, id: &str) -> Result<String, DocGenError> {
            Ok(crate::docs::default_doc_link(id))
        }
    }

    #[tokio::test]
    async fn validation_failure_stops_before_any_io() {
        let store = MemoryStore::new();
        let sink = RecordingSink::default();
        let config = GenerationConfig::default();
        let err = generate(GenerationRequest::default(), &store, &sink, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, DocGenError::MissingField { .. }));
        assert!(sink.batches.lock().unwrap().is_empty());
    }

    #[test]
    fn combined_markdown_carries_page_break() {
        let combined = format!("{}\n{PAGE_BREAK_SENTINEL}\n{}", "# ETP", "# TR");
        let ops = markdown_to_ops(&combined);
        assert!(ops
            .iter()
            .any(|op| matches!(op, EditOp::InsertPageBreak { .. })));
    }
}
