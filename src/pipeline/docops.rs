//! Markdown-to-edit-operations conversion.
//!
//! The generated ETP and TR sections arrive as one Markdown string using a
//! deliberately small dialect: `#`/`##`/`###` headings, `-`/`*` bullets,
//! `**bold**` spans, blank-line paragraph breaks, and a `<NEWPAGE>` sentinel
//! between the two sections. This module walks that string line by line and
//! emits the ordered [`EditOp`] sequence a remote rich-text document applies
//! positionally.
//!
//! ## The cursor
//!
//! The whole conversion is driven by a single 1-based character cursor: the
//! next free insertion index in the target document. Every inserted character
//! (including each line's trailing newline) advances it by exactly one, and
//! every style range is derived from the cursor value at the moment its text
//! was inserted — never re-scanned or recomputed. If the cursor drifts by even
//! one position the document service rejects the batch or styles the wrong
//! span, so the arithmetic here is the part of this crate that deserves real
//! care.
//!
//! Character positions count Unicode scalars, not bytes — "Aço" occupies
//! three index positions, not four.
//!
//! ## Bold handling
//!
//! Structure is classified first; bold is an orthogonal property of whatever
//! payload remains. Each payload is split into plain/bold segments, the
//! delimiter-free display text is inserted in one call, and a second walk over
//! the segments (with a local running offset) places the bold ranges. The
//! `**` delimiters therefore never reach the inserted text and never enter
//! the offset arithmetic.
//!
//! This is a pure function of its input: no I/O, no shared state, and no
//! error path — a malformed line degrades to a plain paragraph rather than
//! failing the whole document.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Sentinel line separating the ETP section from the TR section.
///
/// Exact casing, standalone on its own line. The prompt forbids the model
/// from emitting it inside a section; the orchestrator inserts it when
/// concatenating the two generated sections.
pub const PAGE_BREAK_SENTINEL: &str = "<NEWPAGE>";

/// Maximum operations per batch accepted by the document service.
pub const DEFAULT_MAX_BATCH_OPS: usize = 400;

/// A half-open character range `[start, end)` in the target document, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Named paragraph style applied to heading lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParagraphStyle {
    Heading1,
    Heading2,
    Heading3,
}

impl ParagraphStyle {
    fn for_level(level: u8) -> Self {
        match level {
            1 => ParagraphStyle::Heading1,
            2 => ParagraphStyle::Heading2,
            _ => ParagraphStyle::Heading3,
        }
    }
}

/// One atomic positional edit against the remote document.
///
/// Operations are emitted in processing order and must be applied in that
/// order: text is always inserted before any style operation that decorates
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditOp {
    /// Insert `text` at character index `at`.
    InsertText { at: usize, text: String },
    /// Apply a named heading style. The range excludes the trailing newline.
    SetParagraphStyle { range: Range, style: ParagraphStyle },
    /// Turn the paragraph into a bullet item. Unlike heading ranges, the
    /// bullet range includes the trailing newline — the document service
    /// identifies the paragraph by a range that covers its terminator.
    SetListBullet { range: Range },
    /// Bold an inline run. The range never includes a newline.
    SetBold { range: Range },
    /// Insert a page break before the current position. Consumes no
    /// character positions in this model.
    InsertPageBreak { at: usize },
}

// ── Line classification ──────────────────────────────────────────────────

/// A single trimmed input line, classified by structural prefix.
///
/// The payload is the line with its structural marker removed but with any
/// `**` delimiters left intact; bold extraction happens afterwards, on the
/// payload, regardless of the line kind.
#[derive(Debug, PartialEq, Eq)]
enum LineKind<'a> {
    PageBreak,
    Blank,
    Heading { level: u8, payload: &'a str },
    Bullet { payload: &'a str },
    Paragraph { payload: &'a str },
}

/// Classify one trimmed line. First match wins; any line that matches no
/// structural prefix is a plain paragraph — no input is ever rejected.
fn classify(line: &str) -> LineKind<'_> {
    if line == PAGE_BREAK_SENTINEL {
        return LineKind::PageBreak;
    }
    if line.is_empty() {
        return LineKind::Blank;
    }
    // Longest heading prefix first, otherwise "### x" would be read as a
    // level-1 heading with payload "## x".
    if let Some(rest) = line.strip_prefix("### ") {
        return LineKind::Heading { level: 3, payload: rest };
    }
    if let Some(rest) = line.strip_prefix("## ") {
        return LineKind::Heading { level: 2, payload: rest };
    }
    if let Some(rest) = line.strip_prefix("# ") {
        return LineKind::Heading { level: 1, payload: rest };
    }
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return LineKind::Bullet { payload: rest };
    }
    LineKind::Paragraph { payload: line }
}

// ── Bold-run extraction ──────────────────────────────────────────────────

static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());

/// A contiguous run of visible payload text, plain or bold.
#[derive(Debug, PartialEq, Eq)]
struct Segment<'a> {
    text: &'a str,
    bold: bool,
}

/// Split a payload into plain/bold segments, left to right, non-nested.
///
/// Concatenating the segment texts reconstitutes the payload minus the `**`
/// delimiters. Zero-length segments are omitted. An unmatched `**` (odd
/// count) simply fails to close a span and stays in the surrounding plain
/// text; malformed markers are tolerated, never an error.
fn split_bold(payload: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;
    for caps in RE_BOLD.captures_iter(payload) {
        let whole = caps.get(0).expect("match has group 0");
        if whole.start() > last {
            segments.push(Segment {
                text: &payload[last..whole.start()],
                bold: false,
            });
        }
        let inner = caps.get(1).expect("pattern has one group").as_str();
        if !inner.is_empty() {
            segments.push(Segment { text: inner, bold: true });
        }
        last = whole.end();
    }
    if last < payload.len() {
        segments.push(Segment {
            text: &payload[last..],
            bold: false,
        });
    }
    segments
}

// ── Cursor-driven emission ───────────────────────────────────────────────

/// What structural decoration a payload line carries besides its text.
enum Structure {
    Heading(u8),
    Bullet,
    Plain,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Convert a Markdown document to the ordered edit-operation sequence.
///
/// The cursor starts at 1. Lines are processed in input order, trimmed
/// before classification; a trailing newline on the document does not
/// produce a phantom blank line.
pub fn markdown_to_ops(markdown: &str) -> Vec<EditOp> {
    let mut ops = Vec::new();
    let mut cursor: usize = 1;

    for raw in markdown.lines() {
        let line = raw.trim();
        match classify(line) {
            LineKind::PageBreak => {
                // Zero-width marker at the current offset; the cursor does
                // not move and the sentinel's own newline is not inserted.
                ops.push(EditOp::InsertPageBreak { at: cursor });
            }
            LineKind::Blank => {
                ops.push(EditOp::InsertText {
                    at: cursor,
                    text: "\n".to_string(),
                });
                cursor += 1;
            }
            LineKind::Heading { level, payload } => {
                cursor = emit_payload(&mut ops, cursor, payload, Structure::Heading(level));
            }
            LineKind::Bullet { payload } => {
                cursor = emit_payload(&mut ops, cursor, payload, Structure::Bullet);
            }
            LineKind::Paragraph { payload } => {
                cursor = emit_payload(&mut ops, cursor, payload, Structure::Plain);
            }
        }
    }

    ops
}

/// Emit the operations for one payload line and return the advanced cursor.
///
/// Order per line: insert, then paragraph style, then bullet, then one
/// SetBold per bold run. The inserted text is the delimiter-stripped display
/// text plus the line's newline; bold ranges are computed on a second walk
/// over the segments so delimiter widths never enter the arithmetic.
fn emit_payload(ops: &mut Vec<EditOp>, cursor: usize, payload: &str, structure: Structure) -> usize {
    let segments = split_bold(payload);
    let display: String = segments.iter().map(|s| s.text).collect();
    let display_len = char_len(&display);

    ops.push(EditOp::InsertText {
        at: cursor,
        text: format!("{display}\n"),
    });

    match structure {
        // Heading style ranges exclude the trailing newline. A payload whose
        // visible text is empty would produce a zero-width range, which the
        // document service rejects, so it gets no style op.
        Structure::Heading(level) => {
            if display_len > 0 {
                ops.push(EditOp::SetParagraphStyle {
                    range: Range::new(cursor, cursor + display_len),
                    style: ParagraphStyle::for_level(level),
                });
            }
        }
        // Bullet ranges include the trailing newline; the asymmetry with
        // heading ranges is required by the document service.
        Structure::Bullet => {
            ops.push(EditOp::SetListBullet {
                range: Range::new(cursor, cursor + display_len + 1),
            });
        }
        Structure::Plain => {}
    }

    let mut offset = cursor;
    for segment in &segments {
        let len = char_len(segment.text);
        if segment.bold && len > 0 {
            ops.push(EditOp::SetBold {
                range: Range::new(offset, offset + len),
            });
        }
        offset += len;
    }

    cursor + display_len + 1
}

// ── Batch chunking ───────────────────────────────────────────────────────

/// Split the operation list into order-preserving batches of at most
/// `max_ops` operations for sequential submission.
///
/// Pure slicing: concatenating the chunks reproduces the input exactly.
pub fn chunk_ops(ops: &[EditOp], max_ops: usize) -> impl Iterator<Item = &[EditOp]> {
    ops.chunks(max_ops.max(1))
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_priority_order() {
        assert_eq!(classify("<NEWPAGE>"), LineKind::PageBreak);
        assert_eq!(classify(""), LineKind::Blank);
        assert_eq!(
            classify("### Sub"),
            LineKind::Heading { level: 3, payload: "Sub" }
        );
        assert_eq!(
            classify("## Section"),
            LineKind::Heading { level: 2, payload: "Section" }
        );
        assert_eq!(
            classify("# Title"),
            LineKind::Heading { level: 1, payload: "Title" }
        );
        assert_eq!(classify("- item"), LineKind::Bullet { payload: "item" });
        assert_eq!(classify("* item"), LineKind::Bullet { payload: "item" });
        assert_eq!(classify("text"), LineKind::Paragraph { payload: "text" });
    }

    #[test]
    fn classify_structure_wins_over_bold() {
        // A heading containing bold markers is still a heading; bold is a
        // property of the payload, not a line kind.
        assert_eq!(
            classify("## A **B** C"),
            LineKind::Heading { level: 2, payload: "A **B** C" }
        );
        assert_eq!(
            classify("- **all bold**"),
            LineKind::Bullet { payload: "**all bold**" }
        );
    }

    #[test]
    fn classify_near_misses_are_paragraphs() {
        assert_eq!(classify("#NoSpace"), LineKind::Paragraph { payload: "#NoSpace" });
        assert_eq!(classify("-dash"), LineKind::Paragraph { payload: "-dash" });
        assert_eq!(classify("####### deep"), LineKind::Paragraph { payload: "####### deep" });
        assert_eq!(classify("<newpage>"), LineKind::Paragraph { payload: "<newpage>" });
    }

    #[test]
    fn split_bold_basic() {
        let segs = split_bold("Plain **bold** text");
        assert_eq!(
            segs,
            vec![
                Segment { text: "Plain ", bold: false },
                Segment { text: "bold", bold: true },
                Segment { text: " text", bold: false },
            ]
        );
    }

    #[test]
    fn split_bold_reconstitutes_payload() {
        let payload = "**a** mid **b** tail";
        let joined: String = split_bold(payload).iter().map(|s| s.text).collect();
        assert_eq!(joined, "a mid b tail");
    }

    #[test]
    fn split_bold_unmatched_delimiter_is_plain() {
        let segs = split_bold("odd ** marker");
        assert_eq!(segs, vec![Segment { text: "odd ** marker", bold: false }]);
    }

    #[test]
    fn split_bold_empty_span_dropped() {
        // "****" closes an empty span: no bold segment, no plain residue.
        assert!(split_bold("****").is_empty());
        let segs = split_bold("a****b");
        let joined: String = segs.iter().map(|s| s.text).collect();
        assert_eq!(joined, "ab");
        assert!(segs.iter().all(|s| !s.bold));
    }

    #[test]
    fn heading_ops() {
        let ops = markdown_to_ops("# Title\n");
        assert_eq!(
            ops,
            vec![
                EditOp::InsertText { at: 1, text: "Title\n".into() },
                EditOp::SetParagraphStyle {
                    range: Range::new(1, 6),
                    style: ParagraphStyle::Heading1,
                },
            ]
        );
    }

    #[test]
    fn bullet_range_includes_newline() {
        let ops = markdown_to_ops("- item one\n");
        assert_eq!(
            ops,
            vec![
                EditOp::InsertText { at: 1, text: "item one\n".into() },
                EditOp::SetListBullet { range: Range::new(1, 10) },
            ]
        );
    }

    #[test]
    fn paragraph_bold_range_excludes_newline() {
        let ops = markdown_to_ops("Plain **bold** text\n");
        assert_eq!(
            ops,
            vec![
                EditOp::InsertText { at: 1, text: "Plain bold text\n".into() },
                EditOp::SetBold { range: Range::new(7, 11) },
            ]
        );
    }

    #[test]
    fn page_break_leaves_cursor_unchanged() {
        let ops = markdown_to_ops("<NEWPAGE>\n");
        assert_eq!(ops, vec![EditOp::InsertPageBreak { at: 1 }]);

        // A line after the sentinel starts at the same cursor position.
        let ops = markdown_to_ops("<NEWPAGE>\nafter\n");
        assert_eq!(
            ops,
            vec![
                EditOp::InsertPageBreak { at: 1 },
                EditOp::InsertText { at: 1, text: "after\n".into() },
            ]
        );
    }

    #[test]
    fn blank_line_advances_cursor_by_one() {
        let ops = markdown_to_ops("\n");
        assert_eq!(ops, vec![EditOp::InsertText { at: 1, text: "\n".into() }]);

        let ops = markdown_to_ops("\n\nx\n");
        assert_eq!(
            ops,
            vec![
                EditOp::InsertText { at: 1, text: "\n".into() },
                EditOp::InsertText { at: 2, text: "\n".into() },
                EditOp::InsertText { at: 3, text: "x\n".into() },
            ]
        );
    }

    #[test]
    fn trailing_newline_is_not_a_phantom_blank() {
        // "# Title\n" is one line, not one line plus an empty one.
        assert_eq!(markdown_to_ops("# Title\n"), markdown_to_ops("# Title"));
    }

    #[test]
    fn heading_with_bold_emits_style_then_bold() {
        let ops = markdown_to_ops("## A **B** C\n");
        assert_eq!(
            ops,
            vec![
                EditOp::InsertText { at: 1, text: "A B C\n".into() },
                EditOp::SetParagraphStyle {
                    range: Range::new(1, 6),
                    style: ParagraphStyle::Heading2,
                },
                EditOp::SetBold { range: Range::new(3, 4) },
            ]
        );
    }

    #[test]
    fn bullet_with_bold() {
        let ops = markdown_to_ops("- **key**: value\n");
        assert_eq!(
            ops,
            vec![
                EditOp::InsertText { at: 1, text: "key: value\n".into() },
                EditOp::SetListBullet { range: Range::new(1, 12) },
                EditOp::SetBold { range: Range::new(1, 4) },
            ]
        );
    }

    #[test]
    fn offsets_count_chars_not_bytes() {
        // "Ação" is 4 chars / 6 bytes; the bold run must be placed by chars.
        let ops = markdown_to_ops("Ação **é** boa\n");
        assert_eq!(
            ops,
            vec![
                EditOp::InsertText { at: 1, text: "Ação é boa\n".into() },
                EditOp::SetBold { range: Range::new(6, 7) },
            ]
        );
    }

    #[test]
    fn empty_heading_payload_gets_no_style_op() {
        let ops = markdown_to_ops("# ****\n");
        assert_eq!(ops, vec![EditOp::InsertText { at: 1, text: "\n".into() }]);
    }

    #[test]
    fn empty_input_produces_no_ops() {
        assert!(markdown_to_ops("").is_empty());
    }

    #[test]
    fn lines_are_trimmed_before_classification() {
        let ops = markdown_to_ops("   - item  \n");
        assert_eq!(
            ops,
            vec![
                EditOp::InsertText { at: 1, text: "item\n".into() },
                EditOp::SetListBullet { range: Range::new(1, 6) },
            ]
        );
    }

    #[test]
    fn cursor_threads_across_mixed_content() {
        let ops = markdown_to_ops("# T\n\npara\n<NEWPAGE>\n- b\n");
        assert_eq!(
            ops,
            vec![
                EditOp::InsertText { at: 1, text: "T\n".into() },
                EditOp::SetParagraphStyle {
                    range: Range::new(1, 2),
                    style: ParagraphStyle::Heading1,
                },
                EditOp::InsertText { at: 3, text: "\n".into() },
                EditOp::InsertText { at: 4, text: "para\n".into() },
                EditOp::InsertPageBreak { at: 9 },
                EditOp::InsertText { at: 9, text: "b\n".into() },
                EditOp::SetListBullet { range: Range::new(9, 11) },
            ]
        );
    }

    #[test]
    fn chunking_preserves_order_and_content() {
        let ops = markdown_to_ops("# a\n- b\nc **d** e\n\n<NEWPAGE>\nf\n");
        for n in [1usize, 2, 3, DEFAULT_MAX_BATCH_OPS] {
            let rejoined: Vec<EditOp> = chunk_ops(&ops, n).flatten().cloned().collect();
            assert_eq!(rejoined, ops, "chunk size {n}");
            assert!(chunk_ops(&ops, n).all(|c| c.len() <= n));
        }
    }

    #[test]
    fn chunk_size_zero_treated_as_one() {
        let ops = markdown_to_ops("a\nb\n");
        assert_eq!(chunk_ops(&ops, 0).count(), ops.len());
    }
}
