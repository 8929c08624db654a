//! LLM interaction: drive the completion and parse the structured reply.
//!
//! This module is intentionally thin; all prompt engineering lives in
//! [`crate::prompts`] so it can be changed without touching retry or
//! error-handling logic here.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient and frequent.
//! Exponential backoff (`retry_backoff_ms * 2^attempt`) avoids hammering
//! the endpoint: with 500 ms base and 3 retries the wait sequence is
//! 500 ms → 1 s → 2 s. An unparseable reply is retried the same way — a
//! fresh sample at temperature 0.7 usually produces valid JSON.

use crate::config::GenerationConfig;
use crate::error::DocGenError;
use crate::prompts::SYSTEM_ROLE;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Default model when the caller names neither model nor provider.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// The three document sections the model returns.
///
/// Every field is optional at the wire level: a model that drops one still
/// produces a usable document, with the generator substituting a fallback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratedSections {
    pub subject: Option<String>,
    pub etp_content: Option<String>,
    pub tr_content: Option<String>,
}

/// A parsed model reply plus per-call accounting.
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub sections: GeneratedSections,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    pub retries: u32,
}

/// Call the model with retry/backoff and parse its JSON reply.
pub async fn generate_sections(
    provider: &Arc<dyn LLMProvider>,
    prompt: &str,
    config: &GenerationConfig,
) -> Result<ModelReply, DocGenError> {
    let start = Instant::now();
    let messages = vec![ChatMessage::system(SYSTEM_ROLE), ChatMessage::user(prompt)];
    let options = build_options(config);

    let mut last_err: Option<String> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "LLM retry {}/{} after {}ms",
                attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    "LLM reply: {} input tokens, {} output tokens",
                    response.prompt_tokens, response.completion_tokens
                );
                match parse_sections(&response.content) {
                    Ok(sections) => {
                        return Ok(ModelReply {
                            sections,
                            input_tokens: response.prompt_tokens as usize,
                            output_tokens: response.completion_tokens as usize,
                            duration_ms: start.elapsed().as_millis() as u64,
                            retries: attempt,
                        });
                    }
                    Err(e) => {
                        warn!("Attempt {}: unparseable reply — {}", attempt + 1, e);
                        last_err = Some(format!("{e}"));
                    }
                }
            }
            Err(e) => {
                let err_msg = format!("{e}");
                warn!("Attempt {} failed — {}", attempt + 1, err_msg);
                last_err = Some(err_msg);
            }
        }
    }

    Err(DocGenError::LlmApiError {
        retries: config.max_retries,
        message: last_err.unwrap_or_else(|| "Unknown error".to_string()),
    })
}

/// Build `CompletionOptions` from the generation config.
fn build_options(config: &GenerationConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Leading/trailing code fences the model may wrap the JSON object in.
static RE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").unwrap());

/// Parse the model's reply into its document sections.
///
/// Models frequently wrap the object in a Markdown code fence or prepend
/// prose; the fence is stripped first, and when the remainder still fails
/// to parse, the substring between the first `{` and the last `}` is tried
/// as a fallback.
pub fn parse_sections(raw: &str) -> Result<GeneratedSections, DocGenError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DocGenError::MalformedReply {
            detail: "empty reply".into(),
        });
    }

    let candidate = RE_FENCE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    if let Ok(sections) = serde_json::from_str::<GeneratedSections>(candidate) {
        return Ok(sections);
    }

    let first = candidate.find('{');
    let last = candidate.rfind('}');
    if let (Some(start), Some(end)) = (first, last) {
        if start < end {
            if let Ok(sections) = serde_json::from_str::<GeneratedSections>(&candidate[start..=end])
            {
                return Ok(sections);
            }
        }
    }

    Err(DocGenError::MalformedReply {
        detail: format!(
            "not a JSON object with subject/etp_content/tr_content: {}…",
            candidate.chars().take(120).collect::<String>()
        ),
    })
}

/// Instantiate a named provider with the given model.
fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, DocGenError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        DocGenError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is; handy in
///    tests or when the caller wraps the provider in middleware.
/// 2. **Named provider + model** (`config.provider_name`) — created via
///    [`ProviderFactory::create_llm_provider`], which reads the matching
///    API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`)
///    — honoured before auto-detection so an explicit environment-level
///    choice wins even with several API keys present.
/// 4. **Gemini key, then full auto-detection** — the original service runs
///    on Gemini, so `GEMINI_API_KEY` selects Gemini with [`DEFAULT_MODEL`]
///    before `ProviderFactory::from_env()` scans the rest.
pub async fn resolve_provider(
    config: &GenerationConfig,
) -> Result<Arc<dyn LLMProvider>, DocGenError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(gemini_key) = std::env::var("GEMINI_API_KEY") {
        if !gemini_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("gemini", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| DocGenError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
