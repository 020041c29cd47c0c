//! Background thread that owns a read-only connection to the replica.
//!
//! `rusqlite::Connection` is not `Sync` — it is opened inside the thread,
//! never passed in. All communication is via channels: `SyncRequest` in,
//! `AppEvent::Sync` out. The thread only reads; writes to the replica go
//! through the async connection on the main side.
//!
//! The replica file is written by the external sync process; this worker is
//! the bridge that turns those writes into replication events for the
//! tracker. Between polls it keeps a path → revision map and reports any
//! document whose revision token changed.

use std::collections::HashMap;
use std::time::Duration;

use crossbeam_channel::Receiver;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use rusqlite::Connection;
use tokio::sync::mpsc::UnboundedSender;

use notesync_core::diff::{self, DiffOp, DiffTag};
use notesync_core::types::{ActivityEntry, RecordKind};

use crate::event::AppEvent;
use crate::sync::types::{DiffPayload, FileEntry, PollPayload, SyncRequest, SyncUpdate};

/// Entry point for the replica-watcher thread.
///
/// Opens the replica at `path` and loops over incoming `SyncRequest`
/// messages until the channel closes (sender dropped). Results are sent
/// back via `event_tx` as `AppEvent::Sync`.
pub fn sync_worker_loop(
    path: String,
    rx: Receiver<SyncRequest>,
    event_tx: UnboundedSender<AppEvent>,
) {
    let conn = match Connection::open(&path) {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(path = %path, error = %e, "replica watcher could not open the database");
            return;
        }
    };
    let _ = conn.busy_timeout(Duration::from_secs(5));

    // path -> revision as of the previous poll; None until the first scan.
    let mut snapshot: Option<HashMap<String, String>> = None;

    for request in rx {
        let update = match request {
            SyncRequest::Poll => handle_poll(&conn, &mut snapshot),
            SyncRequest::LoadDiff { path } => handle_load_diff(&conn, &path),
        };
        let _ = event_tx.send(AppEvent::Sync(Box::new(update)));
    }
}

/// Scans the note documents and reports the listing plus the revision delta.
///
/// On SQL errors, returns an empty payload for graceful degradation — the
/// next poll retries anyway.
fn handle_poll(conn: &Connection, snapshot: &mut Option<HashMap<String, String>>) -> SyncUpdate {
    let files = match scan_notes(conn) {
        Ok(files) => files,
        Err(e) => {
            tracing::warn!(error = %e, "replica poll failed");
            return SyncUpdate::Poll(PollPayload::default());
        }
    };

    let changes = match snapshot.as_ref() {
        // First scan is the baseline: list files, replay nothing.
        None => Vec::new(),
        Some(previous) => files
            .iter()
            .filter(|f| previous.get(&f.path) != Some(&f.rev))
            .map(|f| ActivityEntry {
                file_path: f.path.clone(),
                modified_by: f.modified_by.clone(),
                timestamp: f.updated_at,
                rev: f.rev.clone(),
            })
            .collect(),
    };

    *snapshot = Some(files.iter().map(|f| (f.path.clone(), f.rev.clone())).collect());
    SyncUpdate::Poll(PollPayload { files, changes })
}

/// Lists the current note documents with their durable unread flags.
///
/// Typed team records (annotations, config, …) share the keyspace and are
/// filtered out by prefix classification — only plain note documents appear
/// in the files panel. The unread flag applies the read-ledger rule: no row,
/// or a last-seen revision that differs from the current one.
fn scan_notes(conn: &Connection) -> rusqlite::Result<Vec<FileEntry>> {
    let mut stmt = conn.prepare(
        "SELECT d.id, d.rev, d.modified_by, d.updated_at,
                CASE WHEN r.last_seen_rev IS NULL OR r.last_seen_rev <> d.rev
                     THEN 1 ELSE 0 END
         FROM docs d
         LEFT JOIN read_state r ON r.file_path = d.id
         ORDER BY d.id",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(FileEntry {
                path: r.get(0)?,
                rev: r.get(1)?,
                modified_by: r.get(2)?,
                updated_at: r.get(3)?,
                unread: r.get::<_, i64>(4)? != 0,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows.into_iter().filter(|f| RecordKind::of_id(&f.path).is_none()).collect())
}

/// Computes the last-seen → current diff for one note.
///
/// The old side is the body stored in `doc_history` at the user's last-seen
/// revision; a file never marked read (or whose old revision has been
/// evicted upstream) diffs against empty, rendering entirely as added.
fn handle_load_diff(conn: &Connection, path: &str) -> SyncUpdate {
    let current: Option<(String, String)> = conn
        .query_row(
            "SELECT body, rev FROM docs WHERE id = ?1",
            rusqlite::params![path],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .ok();
    let (new_body, new_rev) = current.unwrap_or_default();

    let last_seen: Option<String> = conn
        .query_row(
            "SELECT last_seen_rev FROM read_state WHERE file_path = ?1",
            rusqlite::params![path],
            |r| r.get(0),
        )
        .ok();

    let old_body: Option<String> = last_seen.as_ref().and_then(|rev| {
        conn.query_row(
            "SELECT body FROM doc_history WHERE id = ?1 AND rev = ?2",
            rusqlite::params![path, rev],
            |r| r.get(0),
        )
        .ok()
    });
    let old_rev = old_body.as_ref().and(last_seen);

    let ops = diff::compute_diff(old_body.as_deref().unwrap_or(""), &new_body);
    let summary = diff::summary(&ops);
    let (lines, change_offsets) = render_diff_lines(&ops);

    SyncUpdate::Diff(Box::new(DiffPayload {
        path: path.to_owned(),
        old_rev,
        new_rev,
        summary,
        lines,
        change_offsets,
    }))
}

/// Converts diff ops into pre-styled lines for the diff panel.
///
/// Inline rendering: deleted text is red and struck through, inserted text
/// is green, unchanged text dim. Returns the lines plus the start index of
/// each contiguous run of changed lines for `[` / `]` navigation.
fn render_diff_lines(ops: &[DiffOp]) -> (Vec<Line<'static>>, Vec<usize>) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut line_changed: Vec<bool> = Vec::new();
    let mut current_changed = false;

    for op in ops {
        let style = match op.tag {
            DiffTag::Equal => Style::default().fg(Color::DarkGray),
            DiffTag::Insert => Style::default().fg(Color::Green),
            DiffTag::Delete => {
                Style::default().fg(Color::Red).add_modifier(Modifier::CROSSED_OUT)
            }
        };
        let changed = op.tag != DiffTag::Equal;

        let mut pieces = op.text.split('\n');
        // First piece continues the current line; the rest start new ones.
        if let Some(first) = pieces.next() {
            if !first.is_empty() {
                current.push(Span::styled(first.to_owned(), style));
                current_changed |= changed;
            }
        }
        for piece in pieces {
            lines.push(Line::from(std::mem::take(&mut current)));
            line_changed.push(current_changed);
            current_changed = false;
            if !piece.is_empty() {
                current.push(Span::styled(piece.to_owned(), style));
                current_changed |= changed;
            }
        }
    }
    if !current.is_empty() {
        lines.push(Line::from(current));
        line_changed.push(current_changed);
    }

    let mut change_offsets = Vec::new();
    let mut previous = false;
    for (i, changed) in line_changed.iter().copied().enumerate() {
        if changed && !previous {
            change_offsets.push(i);
        }
        previous = changed;
    }

    (lines, change_offsets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_lines_split_on_newlines() {
        let ops = diff::compute_diff("one\ntwo\nthree", "one\n2\nthree");
        let (lines, change_offsets) = render_diff_lines(&ops);
        assert!(lines.len() >= 3);
        assert_eq!(change_offsets.len(), 1, "single changed region: {change_offsets:?}");
    }

    #[test]
    fn all_added_document_is_one_changed_run() {
        let ops = diff::compute_diff("", "fresh\ncontent");
        let (lines, change_offsets) = render_diff_lines(&ops);
        assert_eq!(lines.len(), 2);
        assert_eq!(change_offsets, [0]);
    }

    #[test]
    fn unchanged_document_has_no_change_offsets() {
        let ops = diff::compute_diff("same\ntext", "same\ntext");
        let (_, change_offsets) = render_diff_lines(&ops);
        assert!(change_offsets.is_empty());
    }
}
