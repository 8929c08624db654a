//! CLI binary for tenderdoc.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `GenerationConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tenderdoc::{
    chunk_ops, generate_with_google, markdown_to_ops, GenerationConfig, GenerationRequest,
    MemoryStore, ProposalFile,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Generate a Google Doc from a request file
  tenderdoc request.json

  # Attach proposal PDFs
  tenderdoc request.json \
      --commercial-proposal proposta_comercial.pdf \
      --technical-proposal proposta_tecnica.pdf

  # Use a specific model
  tenderdoc --model gemini-2.5-pro --provider gemini request.json

  # Inspect the assembled prompt without calling any API
  tenderdoc --dry-run request.json

  # Convert a local Markdown file to edit-op JSON (fully offline)
  tenderdoc --convert-markdown document.md request.json

  # Structured JSON output
  tenderdoc --json request.json > result.json

ENVIRONMENT VARIABLES:
  GOOGLE_ACCESS_TOKEN     OAuth bearer token for Storage / Docs / Drive
  TENDERDOC_BUCKET        Reference-document bucket (default: docsorgaospublicos)
  GEMINI_API_KEY          Google Gemini API key (preferred provider)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID

SETUP:
  1. Obtain a token:   export GOOGLE_ACCESS_TOKEN=$(gcloud auth print-access-token)
  2. Set a model key:  export GEMINI_API_KEY=...
  3. Generate:         tenderdoc request.json
"#;

/// Generate ETP/TR procurement documents as shareable Google Docs.
#[derive(Parser, Debug)]
#[command(
    name = "tenderdoc",
    version,
    about = "Generate ETP/TR procurement documents as shareable Google Docs",
    long_about = "Generate Brazilian public-procurement planning documents (Estudo Técnico \
Preliminar and Termo de Referência) from a structured request file plus optional proposal \
PDFs. The model's Markdown reply is converted into ordered positional edit operations and \
applied to a freshly created Google Doc.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the request JSON file (form fields, wire-named).
    request: PathBuf,

    /// Commercial proposal PDF to attach.
    #[arg(long, env = "TENDERDOC_COMMERCIAL_PROPOSAL")]
    commercial_proposal: Option<PathBuf>,

    /// Technical proposal PDF to attach.
    #[arg(long, env = "TENDERDOC_TECHNICAL_PROPOSAL")]
    technical_proposal: Option<PathBuf>,

    /// LLM model ID (e.g. gemini-2.0-flash, gemini-2.5-pro, gpt-4.1).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Blob-store bucket holding the reference documents.
    #[arg(long, env = "TENDERDOC_BUCKET")]
    bucket: Option<String>,

    /// OAuth bearer token for the Google APIs.
    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Max edit operations per batchUpdate submission.
    #[arg(long, env = "TENDERDOC_MAX_BATCH_OPS", default_value_t = 400)]
    max_batch_ops: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "TENDERDOC_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "TENDERDOC_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// Retries on a transient LLM failure or unparseable reply.
    #[arg(long, env = "TENDERDOC_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-HTTP-call timeout in seconds.
    #[arg(long, env = "TENDERDOC_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Do not share the finished document publicly.
    #[arg(long, env = "TENDERDOC_NO_SHARE")]
    no_share: bool,

    /// Output structured JSON (GenerationOutput) instead of a summary.
    #[arg(long, env = "TENDERDOC_JSON")]
    json: bool,

    /// Assemble and print the model prompt without calling any API.
    #[arg(long)]
    dry_run: bool,

    /// Convert this Markdown file to edit-op JSON and exit (fully offline).
    #[arg(long)]
    convert_markdown: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "TENDERDOC_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "TENDERDOC_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Offline converter mode ───────────────────────────────────────────
    if let Some(ref path) = cli.convert_markdown {
        let markdown = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read Markdown from {:?}", path))?;
        let ops = markdown_to_ops(&markdown);
        let batches = chunk_ops(&ops, cli.max_batch_ops).count();
        let json = serde_json::to_string_pretty(&ops).context("Failed to serialise edit ops")?;
        println!("{json}");
        if !cli.quiet {
            eprintln!(
                "{} {} edit ops in {} batches of ≤ {}",
                green("✔"),
                bold(&ops.len().to_string()),
                bold(&batches.to_string()),
                cli.max_batch_ops,
            );
        }
        return Ok(());
    }

    // ── Load request ─────────────────────────────────────────────────────
    let raw = tokio::fs::read_to_string(&cli.request)
        .await
        .with_context(|| format!("Failed to read request from {:?}", cli.request))?;
    let mut request: GenerationRequest =
        serde_json::from_str(&raw).context("Request file is not valid request JSON")?;

    request.commercial_proposal = load_proposal(cli.commercial_proposal.as_deref()).await?;
    request.technical_proposal = load_proposal(cli.technical_proposal.as_deref()).await?;

    // ── Build config ─────────────────────────────────────────────────────
    let mut builder = GenerationConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .max_batch_ops(cli.max_batch_ops)
        .share_public(!cli.no_share);
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref bucket) = cli.bucket {
        builder = builder.bucket(bucket);
    }
    if let Some(ref token) = cli.token {
        builder = builder.access_token(token);
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Dry run: assemble against an empty in-memory store ───────────────
    if cli.dry_run {
        request.validate().context("Invalid request")?;
        let store = MemoryStore::new();
        let context = tenderdoc::pipeline::assemble::assemble_context(request, &store)
            .await
            .context("Context assembly failed")?;
        let prompt = tenderdoc::prompts::build_generation_prompt(&context);
        println!("{prompt}");
        if !cli.quiet {
            eprintln!(
                "{} prompt: {} chars, {} reference keys unavailable offline",
                cyan("◆"),
                bold(&prompt.chars().count().to_string()),
                context.missing_references.len(),
            );
        }
        return Ok(());
    }

    // ── Run generation ───────────────────────────────────────────────────
    let output = generate_with_google(request, &config)
        .await
        .context("Generation failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", output.document_link).context("Failed to write to stdout")?;

    if !cli.quiet {
        eprintln!(
            "{} {}  {}",
            green("✔"),
            bold(&output.subject),
            dim(&format!(
                "{} ops / {} batches / {}ms",
                output.stats.edit_ops, output.stats.batches, output.stats.total_duration_ms
            )),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&output.stats.input_tokens.to_string()),
            dim(&output.stats.output_tokens.to_string()),
        );
        if !output.missing_references.is_empty() {
            eprintln!(
                "   {} {} reference documents missing from the bucket",
                cyan("⚠"),
                output.missing_references.len()
            );
        }
    }

    Ok(())
}

/// Read an optional proposal PDF from disk.
async fn load_proposal(path: Option<&Path>) -> Result<Option<ProposalFile>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read proposal PDF {:?}", path))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "proposta.pdf".to_string());
    Ok(Some(ProposalFile::new(filename, bytes)))
}
