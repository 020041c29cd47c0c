//! Context-based text anchoring.
//!
//! Captures a fingerprint of a selected span — the selected text plus fixed
//! windows of surrounding characters — and relocates that span in a later,
//! possibly heavily edited revision of the same document. Relocation is exact
//! substring search through four fallback strategies, strongest first; there
//! is no fuzzy matching. A miss is an ordinary outcome (`None`), never an
//! error: the caller falls back to the last-known stale range.
//!
//! All offsets and column numbers count Unicode scalar values, not bytes.
//! Lines are separated by single `\n` characters; a line's length excludes
//! its newline.

use crate::types::{AnchorContext, AnchorRange};

/// Width of the context windows captured on each side of a selection.
pub const CONTEXT_CHARS: usize = 50;

/// The three fields captured from a live selection.
///
/// Combined with the selection's range this forms an [`AnchorContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedContext {
    pub selected_text: String,
    pub context_before: String,
    pub context_after: String,
}

/// Captures the anchor fingerprint for `range` within `doc_text`.
///
/// The caller guarantees the range came from a valid selection in
/// `doc_text`: start offset ≤ end offset ≤ document length. Context windows
/// are truncated at the document boundaries — never wrapped, never padded.
pub fn capture_context(doc_text: &str, range: &AnchorRange) -> CapturedContext {
    let lines: Vec<&str> = doc_text.split('\n').collect();
    let start_offset = to_offset(&lines, range.start_line, range.start_char);
    let end_offset = to_offset(&lines, range.end_line, range.end_char);
    let doc_len = doc_text.chars().count();

    let before_start = start_offset.saturating_sub(CONTEXT_CHARS);
    let after_end = (end_offset + CONTEXT_CHARS).min(doc_len);

    CapturedContext {
        selected_text: char_slice(doc_text, start_offset, end_offset),
        context_before: char_slice(doc_text, before_start, start_offset),
        context_after: char_slice(doc_text, end_offset, after_end),
    }
}

/// Relocates an anchored span in `doc_text`.
///
/// Tries four patterns in order, first hit wins:
///
/// 1. `context_before + selected_text + context_after` — byte-identical
///    surroundings on both sides, highest confidence.
/// 2. `context_before + selected_text` (only when `context_before` is
///    non-empty) — tolerates edits after the selection.
/// 3. `selected_text + context_after` (only when `context_after` is
///    non-empty) — tolerates edits before the selection.
/// 4. `selected_text` alone, first occurrence — tolerates edits on both
///    sides but may land on an unrelated identical span elsewhere in the
///    document. Known precision gap, accepted: proximity to the original
///    line is not used as a tiebreaker.
///
/// Returns `None` when no pattern matches. Never panics.
pub fn find_anchor(doc_text: &str, anchor: &AnchorContext) -> Option<AnchorRange> {
    let lines: Vec<&str> = doc_text.split('\n').collect();
    let sel = &anchor.selected_text;
    let before = &anchor.context_before;
    let after = &anchor.context_after;
    let sel_chars = sel.chars().count();

    // Strategy 1: full context match.
    let full = format!("{before}{sel}{after}");
    if let Some(idx) = doc_text.find(&full) {
        let sel_start = char_offset_at(doc_text, idx) + before.chars().count();
        return Some(to_range(&lines, sel_start, sel_start + sel_chars));
    }

    // Strategy 2: leading context only.
    if !before.is_empty() {
        let pattern = format!("{before}{sel}");
        if let Some(idx) = doc_text.find(&pattern) {
            let sel_start = char_offset_at(doc_text, idx) + before.chars().count();
            return Some(to_range(&lines, sel_start, sel_start + sel_chars));
        }
    }

    // Strategy 3: trailing context only.
    if !after.is_empty() {
        let pattern = format!("{sel}{after}");
        if let Some(idx) = doc_text.find(&pattern) {
            let sel_start = char_offset_at(doc_text, idx);
            return Some(to_range(&lines, sel_start, sel_start + sel_chars));
        }
    }

    // Strategy 4: bare selection, first occurrence.
    if let Some(idx) = doc_text.find(sel.as_str()) {
        let sel_start = char_offset_at(doc_text, idx);
        return Some(to_range(&lines, sel_start, sel_start + sel_chars));
    }

    None
}

/// Converts a (line, char) position to a flat character offset.
///
/// The offset of line L char C is the sum of the character lengths of lines
/// `[0, L)` plus L newline characters plus C. Lines past the end of the
/// document contribute nothing, mirroring the bounds-tolerant capture side.
pub fn to_offset(lines: &[&str], line: usize, ch: usize) -> usize {
    let mut offset = 0;
    for l in lines.iter().take(line) {
        offset += l.chars().count() + 1;
    }
    offset + ch
}

/// Converts a flat character offset pair back to an [`AnchorRange`].
///
/// Single linear scan over line boundaries, accumulating offsets until each
/// target falls within a line's span. Symmetric with [`to_offset`]: the two
/// round-trip exactly for any in-bounds position (offsets exactly on a line
/// boundary resolve to the end of the earlier line).
pub fn to_range(lines: &[&str], start_offset: usize, end_offset: usize) -> AnchorRange {
    let mut offset = 0;
    let mut range = AnchorRange { start_line: 0, start_char: 0, end_line: 0, end_char: 0 };
    let mut found_start = false;

    for (i, line) in lines.iter().enumerate() {
        let line_end = offset + line.chars().count();
        if !found_start && start_offset <= line_end {
            range.start_line = i;
            range.start_char = start_offset - offset;
            found_start = true;
        }
        if found_start && end_offset <= line_end {
            range.end_line = i;
            range.end_char = end_offset - offset;
            break;
        }
        offset = line_end + 1;
    }

    range
}

/// Character offset of the byte position `byte_idx` (which must lie on a
/// char boundary, as returned by `str::find`).
fn char_offset_at(text: &str, byte_idx: usize) -> usize {
    text[..byte_idx].chars().count()
}

/// Substring of `s` between two character offsets (end exclusive).
fn char_slice(s: &str, start: usize, end: usize) -> String {
    s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(sl: usize, sc: usize, el: usize, ec: usize) -> AnchorRange {
        AnchorRange { start_line: sl, start_char: sc, end_line: el, end_char: ec }
    }

    fn anchor_from(doc: &str, r: AnchorRange) -> AnchorContext {
        let captured = capture_context(doc, &r);
        AnchorContext {
            selected_text: captured.selected_text,
            context_before: captured.context_before,
            context_after: captured.context_after,
            original_range: r,
        }
    }

    #[test]
    fn offset_round_trips_through_range() {
        let doc = "alpha\nbravo charlie\n\ndelta";
        let lines: Vec<&str> = doc.split('\n').collect();
        for (line, ch) in [(0, 0), (0, 5), (1, 0), (1, 7), (2, 0), (3, 4)] {
            let offset = to_offset(&lines, line, ch);
            let back = to_range(&lines, offset, offset);
            assert_eq!((back.start_line, back.start_char), (line, ch), "pos ({line},{ch})");
        }
    }

    #[test]
    fn capture_takes_selection_and_windows() {
        let doc = "The quick brown fox jumps over the lazy dog";
        let captured = capture_context(doc, &range(0, 10, 0, 19));
        assert_eq!(captured.selected_text, "brown fox");
        assert_eq!(captured.context_before, "The quick ");
        assert_eq!(captured.context_after, " jumps over the lazy dog");
    }

    #[test]
    fn capture_truncates_at_document_boundaries() {
        let doc = "short";
        let captured = capture_context(doc, &range(0, 1, 0, 3));
        assert_eq!(captured.selected_text, "ho");
        assert_eq!(captured.context_before, "s");
        assert_eq!(captured.context_after, "rt");
    }

    #[test]
    fn unchanged_document_relocates_identically() {
        let doc = "line one\nline two has words\nline three";
        let original = range(1, 5, 1, 8);
        let anchor = anchor_from(doc, original);
        assert_eq!(find_anchor(doc, &anchor), Some(original));
    }

    #[test]
    fn insertion_before_selection_shifts_lines_only() {
        let doc = "fn main() {\n    let x = compute();\n    report(x);\n}";
        let original = range(1, 12, 1, 19);
        let anchor = anchor_from(doc, original);
        assert_eq!(anchor.selected_text, "compute");

        let edited = format!("// preamble\n// more preamble\n{doc}");
        let relocated = find_anchor(&edited, &anchor).unwrap();
        assert_eq!(relocated.start_line, original.start_line + 2);
        assert_eq!(relocated.start_char, original.start_char);
        assert_eq!(relocated.end_line, original.end_line + 2);
        assert_eq!(relocated.end_char, original.end_char);
    }

    #[test]
    fn full_context_beats_bare_text_elsewhere() {
        // "target" also appears earlier, but only the second occurrence has
        // the captured surroundings — strategy 1 must win over strategy 4.
        let doc = "decoy target decoy\nunique-left target unique-right\n";
        let anchor = anchor_from(doc, range(1, 12, 1, 18));
        assert_eq!(anchor.selected_text, "target");

        let edited = format!("inserted line\n{doc}");
        let relocated = find_anchor(&edited, &anchor).unwrap();
        assert_eq!(relocated.start_line, 2);
        assert_eq!(relocated.start_char, 12);
    }

    #[test]
    fn trailing_edit_falls_back_to_leading_context() {
        let doc = "abcdef SELECTED ghijkl";
        let anchor = anchor_from(doc, range(0, 7, 0, 15));
        // Destroy the trailing context; leading context survives.
        let edited = "abcdef SELECTED zzz";
        let relocated = find_anchor(edited, &anchor).unwrap();
        assert_eq!(relocated, range(0, 7, 0, 15));
    }

    #[test]
    fn leading_edit_falls_back_to_trailing_context() {
        let doc = "abcdef SELECTED ghijkl";
        let anchor = anchor_from(doc, range(0, 7, 0, 15));
        let edited = "zzz SELECTED ghijkl";
        let relocated = find_anchor(edited, &anchor).unwrap();
        assert_eq!(relocated, range(0, 4, 0, 12));
    }

    #[test]
    fn missing_everywhere_returns_none() {
        let doc = "some document text";
        let anchor = AnchorContext {
            selected_text: "vanished".to_owned(),
            context_before: "also gone ".to_owned(),
            context_after: " likewise".to_owned(),
            original_range: range(0, 0, 0, 8),
        };
        assert_eq!(find_anchor(doc, &anchor), None);
    }

    #[test]
    fn bare_text_matches_first_occurrence() {
        // Both contexts edited away: strategy 4 anchors to the first
        // occurrence even though the second was the original.
        let doc = "AAA needle BBB\nCCC needle DDD";
        let anchor = AnchorContext {
            selected_text: "needle".to_owned(),
            context_before: "gone ".to_owned(),
            context_after: " gone".to_owned(),
            original_range: range(1, 4, 1, 10),
        };
        let relocated = find_anchor(doc, &anchor).unwrap();
        assert_eq!(relocated, range(0, 4, 0, 10));
    }

    #[test]
    fn prefix_insertion_end_to_end() {
        let doc = "The quick brown fox jumps over the lazy dog";
        let anchor = anchor_from(doc, range(0, 10, 0, 19));
        let edited = format!("PREFIX {doc}");
        let relocated = find_anchor(&edited, &anchor).unwrap();
        assert_eq!(relocated, range(0, 17, 0, 26));
        assert_eq!(
            char_slice(&edited, 17, 26),
            "brown fox"
        );
    }

    #[test]
    fn multibyte_text_counts_scalar_values() {
        let doc = "héllo wörld\nsécond line";
        let original = range(0, 6, 0, 11);
        let anchor = anchor_from(doc, original);
        assert_eq!(anchor.selected_text, "wörld");
        let edited = format!("ünrelated\n{doc}");
        let relocated = find_anchor(&edited, &anchor).unwrap();
        assert_eq!(relocated, range(1, 6, 1, 11));
    }

    #[test]
    fn empty_document_and_empty_selection_are_total() {
        let anchor = AnchorContext {
            selected_text: String::new(),
            context_before: String::new(),
            context_after: String::new(),
            original_range: range(0, 0, 0, 0),
        };
        // An empty pattern matches at offset zero — a defined, boring result.
        assert_eq!(find_anchor("", &anchor), Some(range(0, 0, 0, 0)));
    }

    #[test]
    fn selection_spanning_lines_relocates() {
        let doc = "first line\nsecond line\nthird line";
        let original = range(0, 6, 1, 6);
        let anchor = anchor_from(doc, original);
        assert_eq!(anchor.selected_text, "line\nsecond");
        let edited = format!("zero line\n{doc}");
        let relocated = find_anchor(&edited, &anchor).unwrap();
        assert_eq!(relocated, range(1, 6, 2, 6));
    }
}
