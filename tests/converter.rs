//! Converter contract tests: replay the emitted edit operations against a
//! simulated positional document and check the invariants the real document
//! service enforces.
//!
//! Unit tests in the library assert exact operation sequences for small
//! inputs; these tests check the structural properties that must hold for
//! ANY input — offsets in bounds, styles covering inserted text, no
//! delimiter leakage — over larger and messier documents.

use tenderdoc::{chunk_ops, markdown_to_ops, EditOp, ParagraphStyle, Range};

// ── Simulated positional document ────────────────────────────────────────

/// Minimal positional rich-text document: a 1-based char buffer that
/// rejects out-of-bounds insertions and zero-width or dangling styles,
/// like the real service does.
#[derive(Default)]
struct SimDoc {
    chars: Vec<char>,
}

impl SimDoc {
    /// Next free insertion index (1-based).
    fn end_index(&self) -> usize {
        self.chars.len() + 1
    }

    fn apply(&mut self, op: &EditOp) {
        match op {
            EditOp::InsertText { at, text } => {
                assert!(*at >= 1, "insertion index must be 1-based, got {at}");
                assert!(
                    *at <= self.end_index(),
                    "insertion at {} beyond end {}",
                    at,
                    self.end_index()
                );
                let mut idx = at - 1;
                for ch in text.chars() {
                    self.chars.insert(idx, ch);
                    idx += 1;
                }
            }
            EditOp::SetParagraphStyle { range, .. } | EditOp::SetBold { range } => {
                self.assert_styleable(range);
                // Heading and bold ranges must not cover a newline; the
                // service would silently extend the style to the next line.
                let covered: String =
                    self.chars[range.start - 1..range.end - 1].iter().collect();
                assert!(
                    !covered.contains('\n'),
                    "inline/heading style range {range:?} covers a newline in {covered:?}"
                );
            }
            EditOp::SetListBullet { range } => {
                self.assert_styleable(range);
            }
            EditOp::InsertPageBreak { at } => {
                assert!(*at >= 1 && *at <= self.end_index(), "page break at {at} out of bounds");
            }
        }
    }

    fn assert_styleable(&self, range: &Range) {
        assert!(!range.is_empty(), "zero-width style range {range:?}");
        assert!(range.start >= 1, "style range must be 1-based: {range:?}");
        assert!(
            range.end <= self.end_index(),
            "style range {range:?} beyond end {}",
            self.end_index()
        );
    }

    fn text(&self) -> String {
        self.chars.iter().collect()
    }
}

/// Apply every operation in order and return the final document text.
fn replay(markdown: &str) -> String {
    let ops = markdown_to_ops(markdown);
    let mut doc = SimDoc::default();
    for op in &ops {
        doc.apply(op);
    }
    doc.text()
}

/// The visible text the converter should produce: structural markers and
/// bold delimiters stripped, page-break lines dropped, one newline per
/// remaining line.
fn expected_text(markdown: &str) -> String {
    let mut out = String::new();
    for raw in markdown.lines() {
        let line = raw.trim();
        if line == "<NEWPAGE>" {
            continue;
        }
        let payload = line
            .strip_prefix("### ")
            .or_else(|| line.strip_prefix("## "))
            .or_else(|| line.strip_prefix("# "))
            .or_else(|| line.strip_prefix("- "))
            .or_else(|| line.strip_prefix("* "))
            .unwrap_or(line);
        out.push_str(&strip_matched_bold(payload));
        out.push('\n');
    }
    out
}

/// Remove `**` pairs left to right; an unmatched trailing delimiter stays,
/// mirroring the converter's tolerance for malformed markers.
fn strip_matched_bold(line: &str) -> String {
    let mut out = String::new();
    let mut rest = line;
    while let Some(open) = rest.find("**") {
        let after = &rest[open + 2..];
        match after.find("**") {
            Some(close) => {
                out.push_str(&rest[..open]);
                out.push_str(&after[..close]);
                rest = &after[close + 2..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

const REALISTIC_DOC: &str = "\
# Estudo Técnico Preliminar

## 1. Descrição da Necessidade

A **Prefeitura de Campinas** enfrenta filas crescentes no atendimento.

### 1.1 Contexto

- canal telefônico saturado
- **ausência** de autoatendimento
* horário restrito

## 2. Requisitos

Deve haver **disponibilidade 24x7** e integração com o protocolo atual.

<NEWPAGE>

# Termo de Referência

## 1. Objeto

Contratação de plataforma de atendimento com **IA generativa**.
";

// ── Properties ───────────────────────────────────────────────────────────

#[test]
fn replay_reconstructs_visible_text() {
    assert_eq!(replay(REALISTIC_DOC), expected_text(REALISTIC_DOC));
}

#[test]
fn replay_is_in_bounds_for_malformed_input() {
    // Structural near-misses, unmatched delimiters, stray sentinels inside
    // text, deep nesting the dialect does not support. Every op must still
    // apply cleanly and no delimiter may leak.
    let messy = "\
#missing space
####### too deep
-dash not bullet
odd ** marker here
**unclosed bold
line with <NEWPAGE> inside it
*

<NEWPAGE>
   ##    spaced out
";
    let text = replay(messy);
    assert_eq!(text, expected_text(messy));
}

#[test]
fn no_bold_delimiters_reach_inserted_text() {
    let ops = markdown_to_ops(REALISTIC_DOC);
    for op in &ops {
        if let EditOp::InsertText { text, .. } = op {
            assert!(!text.contains("**"), "delimiter leaked into {text:?}");
        }
    }
}

#[test]
fn insertions_are_sequential_and_dense() {
    // Each insertion starts exactly where the previous one ended: the
    // converter never leaves gaps and never back-tracks.
    let ops = markdown_to_ops(REALISTIC_DOC);
    let mut next = 1usize;
    for op in &ops {
        if let EditOp::InsertText { at, text } = op {
            assert_eq!(*at, next, "insertion out of sequence");
            next += text.chars().count();
        }
    }
}

#[test]
fn style_ranges_cover_their_own_insertion() {
    // Every style op refers to text inserted by the immediately preceding
    // insertion, never to an earlier line.
    let ops = markdown_to_ops(REALISTIC_DOC);
    let mut current_line: Option<Range> = None;
    for op in &ops {
        match op {
            EditOp::InsertText { at, text } => {
                current_line = Some(Range::new(*at, at + text.chars().count()));
            }
            EditOp::SetParagraphStyle { range, .. }
            | EditOp::SetListBullet { range }
            | EditOp::SetBold { range } => {
                let line = current_line.expect("style op before any insertion");
                assert!(
                    range.start >= line.start && range.end <= line.end,
                    "style {range:?} outside its line {line:?}"
                );
            }
            EditOp::InsertPageBreak { .. } => {}
        }
    }
}

#[test]
fn heading_levels_map_to_named_styles() {
    let ops = markdown_to_ops("# a\n## b\n### c\n");
    let styles: Vec<ParagraphStyle> = ops
        .iter()
        .filter_map(|op| match op {
            EditOp::SetParagraphStyle { style, .. } => Some(*style),
            _ => None,
        })
        .collect();
    assert_eq!(
        styles,
        vec![
            ParagraphStyle::Heading1,
            ParagraphStyle::Heading2,
            ParagraphStyle::Heading3
        ]
    );
}

#[test]
fn accented_text_replays_correctly() {
    let md = "## Fundamentação\n\nA **solução** atende à Lei nº 14.133/2021.\n";
    assert_eq!(replay(md), "Fundamentação\n\nA solução atende à Lei nº 14.133/2021.\n");

    // The bold range must select exactly "solução" in the simulated doc.
    let ops = markdown_to_ops(md);
    let bold = ops
        .iter()
        .find_map(|op| match op {
            EditOp::SetBold { range } => Some(*range),
            _ => None,
        })
        .expect("one bold run");
    let mut doc = SimDoc::default();
    for op in &ops {
        doc.apply(op);
    }
    let selected: String = doc.chars[bold.start - 1..bold.end - 1].iter().collect();
    assert_eq!(selected, "solução");
}

#[test]
fn chunked_replay_equals_unchunked() {
    let ops = markdown_to_ops(REALISTIC_DOC);
    for n in [1usize, 2, 5, 100, 400] {
        let mut doc = SimDoc::default();
        let mut total = 0usize;
        for batch in chunk_ops(&ops, n) {
            assert!(batch.len() <= n);
            for op in batch {
                doc.apply(op);
            }
            total += batch.len();
        }
        assert_eq!(total, ops.len());
        assert_eq!(doc.text(), expected_text(REALISTIC_DOC), "chunk size {n}");
    }
}

#[test]
fn page_break_consumes_no_positions() {
    let with_break = markdown_to_ops("antes\n<NEWPAGE>\ndepois\n");
    let without = markdown_to_ops("antes\ndepois\n");
    let inserts = |ops: &[EditOp]| -> Vec<EditOp> {
        ops.iter()
            .filter(|op| matches!(op, EditOp::InsertText { .. }))
            .cloned()
            .collect()
    };
    assert_eq!(inserts(&with_break), inserts(&without));
}
