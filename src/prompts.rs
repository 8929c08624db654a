//! Prompt construction for ETP/TR generation.
//!
//! Centralising the instruction text here keeps the rest of the pipeline
//! free of prompt engineering: unit tests can inspect the assembled prompt
//! without a live model, and adjusting the document structure or the output
//! contract means editing exactly one place.
//!
//! The output contract matters more than the prose: the model must reply
//! with a single JSON object, and the Markdown inside it must stay within
//! the dialect the converter understands (`#`/`##`/`###` headings, `-`/`*`
//! bullets, `**bold**`, blank lines). Anything richer would be inserted as
//! plain paragraph text.

use crate::pipeline::assemble::{AdministrativeSphere, LlmContext};
use std::fmt::Write as _;

/// Role preamble, sent as the system message.
pub const SYSTEM_ROLE: &str = "\
Você é um assistente de IA especializado em elaboração de documentos técnicos e legais \
para o setor público brasileiro (esferas Federal, Estadual e Municipal), com expertise em \
licitações (Lei nº 14.133/2021, Lei nº 13.303/2016 e regulamentações correlatas) e nas \
soluções de Inteligência Artificial da Xertica.ai.";

/// The reply contract: one JSON object, nothing else.
pub const OUTPUT_FORMAT_RULES: &str = r#"Sua resposta FINAL DEVE ser UM OBJETO JSON VÁLIDO, sem texto fora do objeto:

{
  "subject": "Título descritivo do documento (ETP e TR)",
  "etp_content": "Conteúdo COMPLETO do ETP em Markdown",
  "tr_content": "Conteúdo COMPLETO do TR em Markdown"
}"#;

/// Constraints matching the converter's Markdown dialect.
pub const MARKDOWN_RULES: &str = "\
Regras de formatação Markdown (obrigatórias):
- Use apenas: títulos `#`, `##` e `###`, listas com `-` ou `*`, negrito `**assim**` e linhas em branco entre parágrafos.
- NÃO use tabelas, links, imagens, itálico, listas numeradas ou listas aninhadas.
- NÃO escreva a palavra <NEWPAGE> em nenhuma seção; a quebra de página é inserida pelo sistema.
- O conteúdo deve ser PROSA rica e detalhada, com análises aprofundadas; use listas apenas para itens naturalmente enumeráveis (requisitos, obrigações).";

/// Per-document reference summaries are capped at this many characters so a
/// handful of long battle cards cannot crowd out the form data.
pub const REFERENCE_SUMMARY_LIMIT: usize = 1000;

/// Truncate a reference document for inclusion in the prompt.
fn summarize(content: &str) -> String {
    if content.chars().count() <= REFERENCE_SUMMARY_LIMIT {
        return content.to_string();
    }
    let cut: String = content.chars().take(REFERENCE_SUMMARY_LIMIT).collect();
    format!("{cut}...")
}

fn price_map_template(sphere: AdministrativeSphere) -> &'static str {
    match sphere {
        AdministrativeSphere::Federal => {
            "Mapa de preços (modelo Federal): para cada tipo de licença/serviço descreva, em prosa \
             ou lista, a fonte de pesquisa (Lei 14.133/2021, pesquisa de mercado, contratos \
             similares ou proposta Xertica.ai), o valor unitário anual estimado, o valor mensal, \
             a quantidade referencial e o valor total anual estimado."
        }
        _ => {
            "Mapa de preços (modelo Estadual/Municipal): para cada tipo de licença/serviço \
             descreva, em prosa ou lista, a fonte de pesquisa, a empresa contratada de \
             referência (Xertica.ai), o valor unitário anual estimado, o valor mensal, a \
             quantidade referencial e o valor total anual estimado."
        }
    }
}

/// Build the full user-turn instruction from an assembled context.
pub fn build_generation_prompt(ctx: &LlmContext) -> String {
    let req = &ctx.request;
    let mut p = String::with_capacity(16 * 1024);

    p.push_str("Sua tarefa é gerar duas seções completas — um Estudo Técnico Preliminar (ETP) \
        e um Termo de Referência (TR) — em Markdown, adaptadas à esfera administrativa do órgão \
        solicitante e preenchendo todo o texto dinâmico e analítico necessário.\n\n");
    p.push_str(OUTPUT_FORMAT_RULES);
    p.push_str("\n\n");
    p.push_str(MARKDOWN_RULES);
    p.push_str("\n\n## DADOS DO FORMULÁRIO\n\n");

    let _ = writeln!(p, "- **Órgão solicitante:** {}", req.requesting_agency);
    let _ = writeln!(p, "- **Esfera administrativa:** {}", ctx.sphere.label());
    let _ = writeln!(p, "- **Título do projeto:** {}", req.project_title);
    let _ = writeln!(p, "- **Justificativa da necessidade:** {}", req.need_justification);
    let _ = writeln!(p, "- **Objetivo geral:** {}", req.general_objective);
    let _ = writeln!(p, "- **Prazos estimados:** {}", req.estimated_deadlines);
    let _ = writeln!(p, "- **Modelo de licitação:** {}", req.procurement_model);
    let _ = writeln!(p, "- **Parcelamento da contratação:** {}", req.lot_splitting);
    let _ = writeln!(
        p,
        "- **Justificativa do parcelamento:** {}",
        req.split_justification.as_deref().unwrap_or("Não fornecida.")
    );
    match req.estimated_value {
        Some(v) => {
            let _ = writeln!(p, "- **Valor estimado:** R$ {v:.2}");
        }
        None => {
            let _ = writeln!(
                p,
                "- **Valor estimado:** não informado; estime com base no mapa de preços."
            );
        }
    }
    let _ = writeln!(
        p,
        "- **Contexto geral do órgão:** {}",
        req.agency_context.as_deref().unwrap_or("Não fornecido.")
    );
    let _ = writeln!(p, "- **Data de geração:** {}", ctx.generation_date);
    let _ = writeln!(p, "- **Local e data para assinatura:** {}", ctx.location_line);

    p.push_str("\n## ACELERADORES SELECIONADOS\n\n");
    if ctx.accelerators.is_empty() {
        p.push_str("Nenhum acelerador Xertica.ai selecionado.\n");
    }
    for (product, docs) in &ctx.accelerators {
        let display = product.replace('_', " ");
        let _ = writeln!(p, "### Acelerador: {display}\n");
        let _ = writeln!(
            p,
            "- **Resumo do Battle Card:** {}",
            docs.battle_card.as_deref().map(summarize).unwrap_or_else(|| "Não disponível.".into())
        );
        let _ = writeln!(
            p,
            "- **Detalhes do Data Sheet:** {}",
            docs.data_sheet.as_deref().map(summarize).unwrap_or_else(|| "Não disponível.".into())
        );
        let _ = writeln!(
            p,
            "- **Plano Operacional:** {}",
            docs.operational_plan
                .as_deref()
                .map(summarize)
                .unwrap_or_else(|| "Não disponível.".into())
        );
        let _ = writeln!(
            p,
            "- **Aplicação específica no órgão:** {}\n",
            req.integration_detail(product)
        );
    }

    p.push_str("\n## CONTEXTO LEGAL E DOCUMENTOS DE REFERÊNCIA\n\n");
    if ctx.legal_context.is_empty() {
        p.push_str("Nenhum conteúdo legal/contextual adicional disponível.\n");
    }
    for (name, content) in &ctx.legal_context {
        let _ = writeln!(p, "### {name}\n\n{}\n", summarize(content));
    }

    p.push_str("\n## PROPOSTAS ANEXADAS\n\n");
    let _ = writeln!(p, "### Proposta comercial\n\n{}\n", ctx.commercial_proposal_text);
    let _ = writeln!(p, "### Proposta técnica\n\n{}\n", ctx.technical_proposal_text);

    p.push_str("\n## REGRAS DE CONTEÚDO\n\n");
    let _ = writeln!(p, "- {}", price_map_template(ctx.sphere));
    p.push_str(
        "- Estruture o ETP com: descrição da necessidade, levantamento de mercado, \
         justificativa da solução, requisitos da contratação, estimativas de valor e prazos, \
         análise de riscos, parcelamento e conclusão.\n\
         - Estruture o TR com: objeto, fundamentação, descrição da solução, requisitos \
         técnicos e de negócio, modelo de execução e gestão do contrato, obrigações das \
         partes, forma de pagamento e sanções.\n\
         - Preencha todos os campos variáveis com informações contextualmente relevantes; \
         onde faltar informação, use um marcador claro entre colchetes.\n",
    );

    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::assemble::{AcceleratorDocs, AdministrativeSphere};
    use crate::request::GenerationRequest;
    use std::collections::BTreeMap;

    fn context() -> LlmContext {
        let request = GenerationRequest {
            requesting_agency: "Prefeitura de Campinas".into(),
            project_title: "Central de atendimento".into(),
            need_justification: "Filas".into(),
            general_objective: "Reduzir espera".into(),
            estimated_deadlines: "4 meses".into(),
            procurement_model: "Pregão".into(),
            lot_splitting: "Não".into(),
            products: vec!["X_One".into()],
            ..Default::default()
        };
        let mut accelerators = BTreeMap::new();
        accelerators.insert(
            "X_One".to_string(),
            AcceleratorDocs {
                battle_card: Some("a".repeat(2000)),
                ..Default::default()
            },
        );
        LlmContext {
            request,
            sphere: AdministrativeSphere::Municipal,
            generation_date: "01/08/2026".into(),
            location_line: "[…], 1 de agosto de 2026".into(),
            accelerators,
            legal_context: BTreeMap::new(),
            commercial_proposal_text: "Nenhuma proposta comercial.".into(),
            technical_proposal_text: "Nenhuma proposta tecnica.".into(),
            commercial_proposal_url: None,
            technical_proposal_url: None,
            missing_references: vec![],
            references_loaded: 1,
        }
    }

    #[test]
    fn prompt_carries_form_fields_and_contract() {
        let prompt = build_generation_prompt(&context());
        assert!(prompt.contains("Prefeitura de Campinas"));
        assert!(prompt.contains("Central de atendimento"));
        assert!(prompt.contains("Estadual/Municipal"));
        assert!(prompt.contains("\"etp_content\""));
        assert!(prompt.contains("NÃO use tabelas"));
    }

    #[test]
    fn reference_docs_are_truncated() {
        let prompt = build_generation_prompt(&context());
        // 2000-char battle card must appear truncated with an ellipsis.
        assert!(prompt.contains(&format!("{}...", "a".repeat(REFERENCE_SUMMARY_LIMIT))));
        assert!(!prompt.contains(&"a".repeat(REFERENCE_SUMMARY_LIMIT + 1)));
    }

    #[test]
    fn federal_sphere_switches_price_map() {
        let mut ctx = context();
        ctx.sphere = AdministrativeSphere::Federal;
        let prompt = build_generation_prompt(&ctx);
        assert!(prompt.contains("modelo Federal"));
        assert!(!prompt.contains("modelo Estadual/Municipal"));
    }
}
