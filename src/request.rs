//! The generation request: the form fields and optional proposal PDFs a
//! caller submits to describe one procurement need.
//!
//! Field names keep the Portuguese-derived camelCase wire names of the
//! original front-end form, so an existing client can serialise a request
//! file without renaming anything.

use crate::error::DocGenError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An uploaded proposal PDF: original filename plus raw bytes.
#[derive(Clone)]
pub struct ProposalFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ProposalFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

impl fmt::Debug for ProposalFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProposalFile")
            .field("filename", &self.filename)
            .field("bytes", &format_args!("{} bytes", self.bytes.len()))
            .finish()
    }
}

/// One procurement-need description, as collected by the front-end form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Full name of the requesting public agency.
    #[serde(rename = "orgaoSolicitante")]
    pub requesting_agency: String,

    /// Project / procurement title.
    #[serde(rename = "tituloProjeto")]
    pub project_title: String,

    /// Detailed description of the problem or need being addressed.
    #[serde(rename = "justificativaNecessidade")]
    pub need_justification: String,

    /// Main objective of the procurement.
    #[serde(rename = "objetivoGeral")]
    pub general_objective: String,

    /// Estimated rollout and operation deadlines.
    #[serde(rename = "prazosEstimados")]
    pub estimated_deadlines: String,

    /// Intended procurement modality (e.g. "Pregão Eletrônico").
    #[serde(rename = "modeloLicitacao")]
    pub procurement_model: String,

    /// Whether the contract will be split into lots ("Sim" / "Não" / "Justificar").
    #[serde(rename = "parcelamentoContratacao")]
    pub lot_splitting: String,

    /// Brief context about the agency, its challenges and initiatives.
    #[serde(rename = "contextoGeralOrgao", default)]
    pub agency_context: Option<String>,

    /// Total estimated contract value, when known.
    #[serde(rename = "valorEstimado", default)]
    pub estimated_value: Option<f64>,

    /// Justification when lot splitting is declined or conditional.
    #[serde(rename = "justificativaParcelamento", default)]
    pub split_justification: Option<String>,

    /// Selected accelerator products, normalised (spaces replaced by `_`).
    #[serde(rename = "produtosXertica", default)]
    pub products: Vec<String>,

    /// Per-product integration detail, keyed by normalised product name.
    #[serde(rename = "integracoes", default)]
    pub integration_details: BTreeMap<String, String>,

    /// Commercial proposal PDF, when provided.
    #[serde(skip)]
    pub commercial_proposal: Option<ProposalFile>,

    /// Technical proposal PDF, when provided.
    #[serde(skip)]
    pub technical_proposal: Option<ProposalFile>,
}

impl GenerationRequest {
    /// Validate that every required form field carries content.
    pub fn validate(&self) -> Result<(), DocGenError> {
        let required: [(&'static str, &str); 7] = [
            ("orgaoSolicitante", &self.requesting_agency),
            ("tituloProjeto", &self.project_title),
            ("justificativaNecessidade", &self.need_justification),
            ("objetivoGeral", &self.general_objective),
            ("prazosEstimados", &self.estimated_deadlines),
            ("modeloLicitacao", &self.procurement_model),
            ("parcelamentoContratacao", &self.lot_splitting),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DocGenError::MissingField { field });
            }
        }
        Ok(())
    }

    /// Integration detail for a normalised product name, with the recorded
    /// fallback text when the user supplied none.
    pub fn integration_detail(&self, product: &str) -> String {
        match self.integration_details.get(product) {
            Some(detail) if !detail.trim().is_empty() => detail.clone(),
            _ => format!(
                "Nenhum detalhe de integração fornecido para {}.",
                product.replace('_', " ")
            ),
        }
    }
}
