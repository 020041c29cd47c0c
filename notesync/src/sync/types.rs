//! Owned data types for the replica-watcher background thread.
//!
//! All types here are fully owned (no borrowed lifetimes) and implement
//! `Send` so they can cross from the background thread that owns the
//! `rusqlite::Connection` to the main UI thread. Pre-styled
//! `ratatui::text::Line<'static>` values are built in the worker so the
//! render path never re-computes a diff.

use notesync_core::diff::DiffSummary;
use notesync_core::types::ActivityEntry;

/// Commands sent from the main thread to the replica-watcher thread.
///
/// Sent over a `crossbeam_channel::Sender<SyncRequest>` owned by the main
/// thread. The worker receives these and answers via `AppEvent::Sync`.
#[derive(Debug)]
pub enum SyncRequest {
    /// Scan the replica for revision changes since the previous poll.
    Poll,
    /// Compute the last-seen → current diff for one file.
    LoadDiff {
        /// Document id (note path) to diff.
        path: String,
    },
}

/// One note file as listed in the files panel.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: String,
    /// Current revision token.
    pub rev: String,
    /// Author of the current revision, as reported by the feed.
    pub modified_by: String,
    /// Unix timestamp (seconds) of the current revision.
    pub updated_at: i64,
    /// Durable unread flag: no read state, or last-seen revision differs.
    pub unread: bool,
}

/// Result of one poll: the full file listing plus the delta since the
/// previous poll. `changes` is empty on the first poll — the baseline scan
/// is not replayed as activity.
#[derive(Debug, Default)]
pub struct PollPayload {
    pub files: Vec<FileEntry>,
    pub changes: Vec<ActivityEntry>,
}

/// A computed diff ready for the diff panel.
#[derive(Debug)]
pub struct DiffPayload {
    pub path: String,
    /// Revision the old side came from; `None` when the file was never
    /// marked read (the whole document renders as added).
    pub old_rev: Option<String>,
    pub new_rev: String,
    pub summary: DiffSummary,
    /// Pre-styled lines for the diff panel.
    pub lines: Vec<ratatui::text::Line<'static>>,
    /// Indices into `lines` where each contiguous run of changed lines
    /// begins. Used by the `[` / `]` jump keys.
    pub change_offsets: Vec<usize>,
}

/// Payload sent from the worker back to the main thread inside
/// `AppEvent::Sync(Box<SyncUpdate>)`. Boxed to keep the event enum small.
#[derive(Debug)]
pub enum SyncUpdate {
    Poll(PollPayload),
    Diff(Box<DiffPayload>),
}
