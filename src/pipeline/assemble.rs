//! Context assembly: everything the model needs, in one record.
//!
//! Gathers the form fields, the text of any uploaded proposal PDFs, and the
//! reference documents retrieved from the blob store into an [`LlmContext`].
//! This stage is a thin producer: no analysis happens here, only collection,
//! degradation (missing references become recorded gaps, unreadable PDFs
//! become placeholder text) and a handful of derived fields (administrative
//! sphere, dates).

use crate::error::DocGenError;
use crate::pipeline::extract;
use crate::request::{GenerationRequest, ProposalFile};
use crate::storage::{fetch_first, BlobStore};
use chrono::{Datelike, Local, NaiveDate};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Administrative sphere of the requesting agency. Selects document wording
/// and the price-map table template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdministrativeSphere {
    Federal,
    State,
    Municipal,
}

impl AdministrativeSphere {
    /// Infer the sphere from keywords in the agency name; Federal when
    /// nothing matches.
    pub fn infer(agency_name: &str) -> Self {
        let lower = agency_name.to_lowercase();
        const MUNICIPAL: [&str; 3] = ["municipal", "pref.", "prefeitura"];
        const STATE: [&str; 5] = [
            "estadual",
            "governo do estado",
            "secretaria de estado",
            "tj",
            "tribunal de justiça",
        ];
        if MUNICIPAL.iter().any(|t| lower.contains(t)) {
            AdministrativeSphere::Municipal
        } else if STATE.iter().any(|t| lower.contains(t)) {
            AdministrativeSphere::State
        } else {
            AdministrativeSphere::Federal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AdministrativeSphere::Federal => "Federal",
            AdministrativeSphere::State => "Estadual",
            AdministrativeSphere::Municipal => "Municipal",
        }
    }
}

/// One accelerator's reference material, summarised for the prompt.
#[derive(Debug, Clone, Default)]
pub struct AcceleratorDocs {
    pub battle_card: Option<String>,
    pub data_sheet: Option<String>,
    pub operational_plan: Option<String>,
}

/// Everything the prompt builder needs for one generation.
#[derive(Debug, Clone)]
pub struct LlmContext {
    pub request: GenerationRequest,
    pub sphere: AdministrativeSphere,
    /// dd/mm/YYYY generation stamp included in the documents.
    pub generation_date: String,
    /// Signature-line placeholder: "[…], {day} de {month} de {year}".
    pub location_line: String,
    /// Per-product reference docs, keyed by normalised product name.
    pub accelerators: BTreeMap<String, AcceleratorDocs>,
    /// Legal/contextual reference texts, keyed by display name.
    pub legal_context: BTreeMap<String, String>,
    pub commercial_proposal_text: String,
    pub technical_proposal_text: String,
    pub commercial_proposal_url: Option<String>,
    pub technical_proposal_url: Option<String>,
    /// Reference keys that were probed but not found.
    pub missing_references: Vec<String>,
    /// Count of reference documents successfully loaded.
    pub references_loaded: usize,
}

/// Legal/contextual documents loaded for every generation.
const LEGAL_DOCS: [(&str, &str); 4] = [
    ("MTI_CONTRATO_EXEMPLO", "exemplos_legais/contratos/CONTRATO_PARCERIA_MTI_XERTICA.txt"),
    ("MPAP_ATA_EXEMPLO", "exemplos_legais/atas/ATA_REGISTRO_PRECOS_MPAP_XERTICA.txt"),
    ("RISK_ANALYSIS_CONTEXT", "contexto_geral/analise_riscos/DETECCAO_ANALISE_RISCOS.txt"),
    ("SERPRO_MOU_EXEMPLO", "exemplos_legais/mou/MOU_SERPRO_XERTICA.txt"),
];

/// Platform products whose analysis lives at a fixed key instead of the
/// per-accelerator layout.
const PLATFORM_DOCS: [(&str, &str); 3] = [
    ("GCP", "GCP/Análise_Técnica_Google_Cloud_Platform_.txt"),
    ("GMP", "GMP/Google_Maps_Platform_Análise_Técnica_.txt"),
    ("GWS", "GWS/Análise_técnica_do_Google_Workspace_.txt"),
];

const MONTHS_PT: [&str; 12] = [
    "janeiro", "fevereiro", "março", "abril", "maio", "junho",
    "julho", "agosto", "setembro", "outubro", "novembro", "dezembro",
];

/// Assemble the full model context for one request.
///
/// Missing reference documents are recorded and skipped; proposal uploads
/// and store transport failures are fatal.
pub async fn assemble_context(
    mut request: GenerationRequest,
    store: &dyn BlobStore,
) -> Result<LlmContext, DocGenError> {
    let today = Local::now().date_naive();
    let sphere = AdministrativeSphere::infer(&request.requesting_agency);
    info!(
        "Assembling context for '{}' ({} sphere, {} products)",
        request.project_title,
        sphere.label(),
        request.products.len()
    );

    let mut missing = Vec::new();
    let mut loaded = 0usize;

    // ── Accelerator reference documents ──────────────────────────────────
    let mut accelerators = BTreeMap::new();
    for product in &request.products {
        let docs = load_accelerator_docs(store, product, &mut missing, &mut loaded).await?;
        accelerators.insert(product.clone(), docs);
    }

    // ── Legal / contextual documents ─────────────────────────────────────
    let mut legal_context = BTreeMap::new();
    for (display, key) in LEGAL_DOCS {
        match store.fetch_text(key).await? {
            Some(content) => {
                loaded += 1;
                legal_context.insert(display.to_string(), content);
            }
            None => {
                warn!("Legal context document not found: {}", key);
                missing.push(key.to_string());
            }
        }
    }

    // ── Proposal PDFs ────────────────────────────────────────────────────
    let commercial = request.commercial_proposal.take();
    let technical = request.technical_proposal.take();
    let (commercial_proposal_text, commercial_proposal_url) =
        ingest_proposal(store, &request, commercial.as_ref(), "comercial", today).await?;
    let (technical_proposal_text, technical_proposal_url) =
        ingest_proposal(store, &request, technical.as_ref(), "tecnica", today).await?;
    request.commercial_proposal = commercial;
    request.technical_proposal = technical;

    Ok(LlmContext {
        sphere,
        generation_date: today.format("%d/%m/%Y").to_string(),
        location_line: location_line(today),
        accelerators,
        legal_context,
        commercial_proposal_text,
        technical_proposal_text,
        commercial_proposal_url,
        technical_proposal_url,
        missing_references: missing,
        references_loaded: loaded,
        request,
    })
}

/// "[A SER PREENCHIDO PELO ÓRGÃO, ex: Brasília/DF], 12 de março de 2025"
fn location_line(today: NaiveDate) -> String {
    let month = MONTHS_PT[(today.month0()) as usize];
    format!(
        "[A SER PREENCHIDO PELO ÓRGÃO, ex: Brasília/DF], {} de {} de {}",
        today.day(),
        month,
        today.year()
    )
}

/// Load the battle card / data sheet / operational plan for one product,
/// probing the primary key layout then the alternate spaced naming.
async fn load_accelerator_docs(
    store: &dyn BlobStore,
    product: &str,
    missing: &mut Vec<String>,
    loaded: &mut usize,
) -> Result<AcceleratorDocs, DocGenError> {
    let display_name = product.replace('_', " ");

    // Platform products have a single fixed analysis document.
    for (tag, key) in PLATFORM_DOCS {
        if display_name.contains(tag) {
            return match store.fetch_text(key).await? {
                Some(content) => {
                    *loaded += 1;
                    Ok(AcceleratorDocs {
                        operational_plan: Some(content),
                        ..Default::default()
                    })
                }
                None => {
                    warn!("{} analysis text not found at {}", tag, key);
                    missing.push(key.to_string());
                    Ok(AcceleratorDocs::default())
                }
            };
        }
    }

    let mut docs = AcceleratorDocs::default();
    for (prefix, slot) in [
        ("BC", &mut docs.battle_card as &mut Option<String>),
        ("DS", &mut docs.data_sheet),
        ("OP", &mut docs.operational_plan),
    ] {
        let primary = format!("aceleradores_conteudo/{product}/{prefix}_{product}.txt");
        let alternate = format!("aceleradores_conteudo/{product}/{prefix} - {display_name}.txt");
        match fetch_first(store, &[primary.clone(), alternate]).await? {
            Some((_, content)) => {
                *loaded += 1;
                *slot = Some(content);
            }
            None => {
                warn!("No {} document found for accelerator '{}'", prefix, display_name);
                missing.push(primary);
            }
        }
    }
    info!(
        "Accelerator '{}': BC {}, DS {}, OP {}",
        display_name,
        presence(&docs.battle_card),
        presence(&docs.data_sheet),
        presence(&docs.operational_plan),
    );
    Ok(docs)
}

fn presence(slot: &Option<String>) -> &'static str {
    if slot.is_some() { "found" } else { "missing" }
}

/// Extract a proposal's text and upload the raw PDF, returning
/// `(prompt_text, public_url)`.
///
/// Extraction failure or an empty result degrades to a placeholder string;
/// the upload itself is fatal on failure because the URL is part of the
/// response contract.
async fn ingest_proposal(
    store: &dyn BlobStore,
    request: &GenerationRequest,
    file: Option<&ProposalFile>,
    kind: &str,
    today: NaiveDate,
) -> Result<(String, Option<String>), DocGenError> {
    let Some(file) = file else {
        return Ok((
            format!("Nenhuma proposta {kind} em PDF foi fornecida pelo usuário."),
            None,
        ));
    };

    info!("Processing {} proposal: {}", kind, file.filename);
    let text = match extract::extract_pdf_text(&file.filename, file.bytes.clone()).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            warn!(
                "Extracted text of '{}' is empty; likely a scanned PDF",
                file.filename
            );
            format!(
                "**ATENÇÃO:** Não foi possível extrair texto legível do PDF '{}'. \
                 O arquivo pode ser digitalizado (imagem) ou ter um layout que impede a \
                 extração. Considere reenviar o documento ou informar os dados manualmente.",
                file.filename
            )
        }
        Err(e) => {
            warn!("Extraction failed for '{}': {}", file.filename, e);
            format!(
                "**ERRO NA EXTRAÇÃO DE TEXTO:** O conteúdo do PDF '{}' não pôde ser \
                 analisado ({e}). Considere reenviar o documento.",
                file.filename
            )
        }
    };

    let key = format!(
        "propostas_clientes/{}_{}_{kind}_{}_{}",
        sanitize(&request.requesting_agency),
        sanitize(&request.project_title),
        today.format("%Y%m%d"),
        file.filename,
    );
    let url = store.store(&key, file.bytes.clone(), "application/pdf").await?;
    Ok((text, Some(url)))
}

fn sanitize(s: &str) -> String {
    s.replace(' ', "_")
}
