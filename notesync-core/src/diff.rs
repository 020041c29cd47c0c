//! Token-level diff between two document revisions.
//!
//! `compute_diff` runs a Myers character diff (via the `similar` crate) and
//! then a semantic-cleanup pass that folds trivially short equal runs caught
//! between edits into the surrounding edits, so the result reads as a few
//! human-sized chunks instead of character confetti.
//!
//! Two reconstruction invariants hold for every input pair, empty strings
//! included: concatenating the equal+insert segments in order yields the new
//! text exactly, and concatenating the equal+delete segments yields the old
//! text exactly. The cleanup pass preserves both. Diffing is pure and total;
//! there is no error case.

use similar::{ChangeTag, TextDiff};

/// Classification of one diff segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffTag {
    Equal,
    Insert,
    Delete,
}

/// One contiguous run of equally-tagged text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOp {
    pub tag: DiffTag,
    pub text: String,
}

/// Character totals for the insert and delete segments of a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
}

/// Computes the cleaned-up diff from `old_text` to `new_text`.
pub fn compute_diff(old_text: &str, new_text: &str) -> Vec<DiffOp> {
    let diff = TextDiff::from_chars(old_text, new_text);

    let mut ops: Vec<DiffOp> = Vec::new();
    for change in diff.iter_all_changes() {
        let tag = match change.tag() {
            ChangeTag::Equal => DiffTag::Equal,
            ChangeTag::Insert => DiffTag::Insert,
            ChangeTag::Delete => DiffTag::Delete,
        };
        let value = change.value();
        match ops.last_mut() {
            Some(last) if last.tag == tag => last.text.push_str(value),
            _ => ops.push(DiffOp { tag, text: value.to_owned() }),
        }
    }

    cleanup_semantic(ops)
}

/// A rendered diff plus its summary, ready for a host view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffView {
    pub markup: String,
    pub summary: DiffSummary,
}

/// One-call entry point for diff views: computes the diff between two
/// revisions and returns the escaped markup plus the summary counts.
pub fn render_diff_view(old_text: &str, new_text: &str) -> DiffView {
    let ops = compute_diff(old_text, new_text);
    DiffView { markup: render_markup(&ops), summary: summary(&ops) }
}

/// Sums the character lengths of insert and delete segments.
///
/// Identical inputs produce `{0, 0}`.
pub fn summary(ops: &[DiffOp]) -> DiffSummary {
    let mut totals = DiffSummary::default();
    for op in ops {
        match op.tag {
            DiffTag::Insert => totals.added += op.text.chars().count(),
            DiffTag::Delete => totals.removed += op.text.chars().count(),
            DiffTag::Equal => {}
        }
    }
    totals
}

/// Renders a diff as inline markup spans.
///
/// Each segment becomes a `<span>` with one of three classes
/// (`team-diff-equal`, `team-diff-added`, `team-diff-deleted`). All text is
/// HTML-escaped before embedding; newlines become explicit `<br>` breaks.
pub fn render_markup(ops: &[DiffOp]) -> String {
    let mut html = String::new();
    for op in ops {
        let class = match op.tag {
            DiffTag::Equal => "team-diff-equal",
            DiffTag::Insert => "team-diff-added",
            DiffTag::Delete => "team-diff-deleted",
        };
        html.push_str("<span class=\"");
        html.push_str(class);
        html.push_str("\">");
        html.push_str(&escape_html(&op.text));
        html.push_str("</span>");
    }
    html.replace('\n', "<br>")
}

/// Escapes the five HTML-significant characters.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// An alternating view of the op list used by the cleanup pass: plain equal
/// runs, and edit blocks holding the deleted and inserted text side by side.
enum Piece {
    Equal(String),
    Edit { del: String, ins: String },
}

/// Folds short equalities sandwiched between edits into those edits.
///
/// An equal run qualifies when it is no longer than the larger side of the
/// edit block before it *and* no longer than the larger side of the edit
/// block after it — the same criterion diff-match-patch applies in its
/// semantic cleanup. Folding appends the equal text to both the delete and
/// insert sides, which keeps both reconstruction invariants intact, and the
/// pass repeats until no equality qualifies.
fn cleanup_semantic(ops: Vec<DiffOp>) -> Vec<DiffOp> {
    let mut pieces: Vec<Piece> = Vec::new();
    for op in ops {
        match op.tag {
            DiffTag::Equal => match pieces.last_mut() {
                Some(Piece::Equal(text)) => text.push_str(&op.text),
                _ => pieces.push(Piece::Equal(op.text)),
            },
            DiffTag::Delete => match pieces.last_mut() {
                Some(Piece::Edit { del, .. }) => del.push_str(&op.text),
                _ => pieces.push(Piece::Edit { del: op.text, ins: String::new() }),
            },
            DiffTag::Insert => match pieces.last_mut() {
                Some(Piece::Edit { ins, .. }) => ins.push_str(&op.text),
                _ => pieces.push(Piece::Edit { del: String::new(), ins: op.text }),
            },
        }
    }

    loop {
        let mut folded = false;
        let mut i = 1;
        while i + 1 < pieces.len() {
            let qualifies = match (&pieces[i - 1], &pieces[i], &pieces[i + 1]) {
                (
                    Piece::Edit { del: ld, ins: li },
                    Piece::Equal(eq),
                    Piece::Edit { del: rd, ins: ri },
                ) => {
                    let eq_len = eq.chars().count();
                    eq_len <= ld.chars().count().max(li.chars().count())
                        && eq_len <= rd.chars().count().max(ri.chars().count())
                }
                _ => false,
            };
            if qualifies {
                let Piece::Equal(eq) = pieces.remove(i) else { unreachable!() };
                let Piece::Edit { del: rd, ins: ri } = pieces.remove(i) else { unreachable!() };
                let Piece::Edit { del, ins } = &mut pieces[i - 1] else { unreachable!() };
                del.push_str(&eq);
                del.push_str(&rd);
                ins.push_str(&eq);
                ins.push_str(&ri);
                folded = true;
            } else {
                i += 1;
            }
        }
        if !folded {
            break;
        }
    }

    let mut out = Vec::new();
    for piece in pieces {
        match piece {
            Piece::Equal(text) => {
                if !text.is_empty() {
                    out.push(DiffOp { tag: DiffTag::Equal, text });
                }
            }
            Piece::Edit { del, ins } => {
                if !del.is_empty() {
                    out.push(DiffOp { tag: DiffTag::Delete, text: del });
                }
                if !ins.is_empty() {
                    out.push(DiffOp { tag: DiffTag::Insert, text: ins });
                }
            }
        }
    }
    out
}
