//! Configuration for a document generation run.
//!
//! All behaviour is controlled through [`GenerationConfig`], built via its
//! [`GenerationConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across tasks, log them, and diff two runs to
//! understand why their outputs differ.

use crate::error::DocGenError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Default GCS bucket holding accelerator and legal-context reference texts.
pub const DEFAULT_BUCKET: &str = "docsorgaospublicos";

/// Configuration for an ETP/TR generation.
///
/// Built via [`GenerationConfig::builder()`] or [`GenerationConfig::default()`].
///
/// # Example
/// ```rust
/// use tenderdoc::GenerationConfig;
///
/// let config = GenerationConfig::builder()
///     .model("gemini-2.0-flash")
///     .temperature(0.7)
///     .max_batch_ops(400)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// LLM model identifier. If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai"). If None along with
    /// `provider`, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the completion. Default: 0.7.
    ///
    /// The generated documents are prose, not transcription; a moderate
    /// temperature keeps the justification and analysis sections from reading
    /// as boilerplate while staying on-structure.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 8192.
    ///
    /// A full ETP plus TR routinely exceeds 5 000 output tokens. Setting this
    /// too low truncates the JSON reply mid-string and the parse fails.
    pub max_tokens: usize,

    /// Maximum retry attempts on a transient LLM failure or an unparseable
    /// reply. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s.
    pub retry_backoff_ms: u64,

    /// Per-HTTP-call timeout in seconds for storage and document-service
    /// requests. Default: 120. No external call runs without a timeout.
    pub api_timeout_secs: u64,

    /// Blob-store bucket with the reference documents. Default:
    /// `TENDERDOC_BUCKET` env var, else [`DEFAULT_BUCKET`].
    pub bucket: String,

    /// OAuth bearer token for the Google Storage / Docs / Drive APIs.
    /// Default: the `GOOGLE_ACCESS_TOKEN` env var when set.
    pub access_token: Option<String>,

    /// Maximum edit operations per batchUpdate submission. Default: 400.
    ///
    /// The document service rejects overlong batches; the full operation list
    /// is sliced into chunks of this size and submitted in order.
    pub max_batch_ops: usize,

    /// Share the finished document read-only with anyone holding the link.
    /// Default: true. A sharing failure is logged, never fatal.
    pub share_public: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.7,
            max_tokens: 8192,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            bucket: std::env::var("TENDERDOC_BUCKET").unwrap_or_else(|_| DEFAULT_BUCKET.to_string()),
            access_token: std::env::var("GOOGLE_ACCESS_TOKEN").ok().filter(|t| !t.is_empty()),
            max_batch_ops: crate::pipeline::docops::DEFAULT_MAX_BATCH_OPS,
            share_public: true,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("bucket", &self.bucket)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("max_batch_ops", &self.max_batch_ops)
            .field("share_public", &self.share_public)
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.config.bucket = bucket.into();
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config.access_token = Some(token.into());
        self
    }

    pub fn max_batch_ops(mut self, n: usize) -> Self {
        self.config.max_batch_ops = n.max(1);
        self
    }

    pub fn share_public(mut self, v: bool) -> Self {
        self.config.share_public = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, DocGenError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(DocGenError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.max_batch_ops == 0 {
            return Err(DocGenError::InvalidConfig("max_batch_ops must be ≥ 1".into()));
        }
        if c.bucket.trim().is_empty() {
            return Err(DocGenError::InvalidConfig("bucket must not be empty".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let c = GenerationConfig::default();
        assert_eq!(c.temperature, 0.7);
        assert_eq!(c.max_tokens, 8192);
        assert_eq!(c.max_batch_ops, 400);
        assert!(c.share_public);
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = GenerationConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn builder_rejects_empty_bucket() {
        let err = GenerationConfig::builder().bucket("  ").build();
        assert!(matches!(err, Err(DocGenError::InvalidConfig(_))));
    }

    #[test]
    fn debug_redacts_token() {
        let c = GenerationConfig::builder().access_token("ya29.secret").build().unwrap();
        let dbg = format!("{:?}", c);
        assert!(!dbg.contains("ya29.secret"));
        assert!(dbg.contains("redacted"));
    }
}
