//! Structural segmentation of documents into ordered, overlapping chunks.
//!
//! Each [`DocumentType`] registers one boundary rule describing where a new
//! logical unit begins: a COBOL paragraph label, a JCL job step, a BMS map
//! definition, a blank line, or a markdown heading. Segmentation splits the
//! document at every boundary position, trims each fragment, discards empty
//! fragments, and prepends the previous raw fragment's trailing overlap to
//! every chunk after the first.
//!
//! Chunk offsets always describe the raw (untrimmed, un-overlapped) core span
//! in the original text, so the cores of a document's chunks tile it exactly.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::{Chunk, Document, DocumentType};

/// Default number of trailing characters carried from the previous fragment
/// into the next chunk.
pub const DEFAULT_OVERLAP: usize = 200;

/// How a boundary match positions the start of the next fragment.
#[derive(Clone, Copy, Debug)]
enum BoundaryKind {
    /// The match opens a new logical unit; the next fragment begins at the
    /// match position (label/step lines head the block they introduce).
    UnitStart,
    /// The match is a separator owned by the preceding fragment; the next
    /// fragment begins immediately after it (blank-line runs).
    SeparatorEnd,
    /// The matched line is a complete unit on its own: one fragment opens at
    /// the match position and the next at the end of the matched line
    /// (markdown headings).
    UnitLine,
}

/// Structural boundary rule for one document type.
#[derive(Debug)]
pub struct ChunkSpec {
    pattern: Regex,
    kind: BoundaryKind,
    /// Default overlap carried into each fragment after the first, in
    /// characters.
    pub overlap: usize,
}

impl ChunkSpec {
    fn new(pattern: &str, kind: BoundaryKind) -> Self {
        Self {
            // Patterns are compile-time constants; a failure here is a bug in
            // the table below, caught by the `boundary_rules_compile` test.
            pattern: Regex::new(pattern).expect("boundary pattern must compile"),
            kind,
            overlap: DEFAULT_OVERLAP,
        }
    }

    /// Boundary rule registered for `doc_type`.
    pub fn for_type(doc_type: DocumentType) -> &'static ChunkSpec {
        static SPECS: OnceLock<[ChunkSpec; 5]> = OnceLock::new();
        let specs = SPECS.get_or_init(|| {
            [
                // Uppercase alphanumeric-hyphen label, terminated by a
                // period, alone on its line.
                ChunkSpec::new(r"(?m)^[A-Z0-9\-]+\.[ \t]*\r?\n", BoundaryKind::UnitStart),
                // `//STEPNAME EXEC ...` job step line.
                ChunkSpec::new(r"(?m)^//\S+\s+EXEC\s", BoundaryKind::UnitStart),
                // `MAPNAME DFHMDI ...` map definition line.
                ChunkSpec::new(r"(?m)^\S+\s+DFHMDI\s", BoundaryKind::UnitStart),
                // Blank line: two newlines with only whitespace between.
                ChunkSpec::new(r"\n\s*\n", BoundaryKind::SeparatorEnd),
                // Markdown heading line (1-6 `#` followed by whitespace).
                ChunkSpec::new(r"(?m)^#{1,6}[ \t][^\n]*\n?", BoundaryKind::UnitLine),
            ]
        });
        match doc_type {
            DocumentType::Cobol | DocumentType::Copybook => &specs[0],
            DocumentType::Jcl | DocumentType::Declaration => &specs[1],
            DocumentType::BasicMappingSupport => &specs[2],
            DocumentType::Text => &specs[3],
            DocumentType::Markdown => &specs[4],
        }
    }

    /// Fragment start offsets within `text`, ascending, always beginning
    /// with 0.
    fn cut_points(&self, text: &str) -> Vec<usize> {
        let mut cuts = vec![0];
        for found in self.pattern.find_iter(text) {
            match self.kind {
                BoundaryKind::UnitStart => cuts.push(found.start()),
                BoundaryKind::SeparatorEnd => cuts.push(found.end()),
                BoundaryKind::UnitLine => {
                    cuts.push(found.start());
                    cuts.push(found.end());
                }
            }
        }
        cuts.dedup();
        cuts
    }
}

/// Splits `document` into overlapping chunks using the boundary rule for
/// `doc_type` and its default overlap.
pub fn segment(document: &Document, doc_type: DocumentType) -> Vec<Chunk> {
    let spec = ChunkSpec::for_type(doc_type);
    segment_with_overlap(document, doc_type, spec.overlap)
}

/// Splits `document` with an explicit overlap length (in characters).
///
/// A document with no boundary matches yields a single chunk spanning the
/// whole text. Fragments that trim to nothing (including the empty leading
/// fragment produced when a pattern matches at the very start of the text)
/// are discarded and never influence overlap.
pub fn segment_with_overlap(
    document: &Document,
    doc_type: DocumentType,
    overlap: usize,
) -> Vec<Chunk> {
    let spec = ChunkSpec::for_type(doc_type);
    let text = document.text.as_str();
    let cuts = spec.cut_points(text);

    let mut chunks = Vec::new();
    let mut previous_raw: Option<&str> = None;

    for (i, &start) in cuts.iter().enumerate() {
        let end = cuts.get(i + 1).copied().unwrap_or(text.len());
        let raw = &text[start..end];
        let core = raw.trim();
        if core.is_empty() {
            continue;
        }

        let chunk_text = match previous_raw {
            None => core.to_string(),
            Some(prev) => format!("{} {}", tail_chars(prev, overlap), core),
        };

        chunks.push(Chunk {
            text: chunk_text,
            start_index: start,
            end_index: end,
            chunk_index: chunks.len(),
        });
        previous_raw = Some(raw);
    }

    chunks
}

/// Last `n` characters of `s` (character-based, UTF-8 safe).
fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
