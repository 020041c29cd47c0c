//! Central application state for notesync.
//!
//! This module owns all mutable UI state: the current mode, which panel has
//! focus, per-panel scroll offsets and viewport heights, the file listing
//! with unread flags, the change tracker, the current diff, and the
//! relocated annotations for the selected file. No ratatui rendering logic
//! lives here — `app.rs` is pure state that is read by the render module
//! and mutated by the keybinding dispatcher and the event-loop appliers.

use std::collections::HashSet;

use ratatui::layout::Rect;
use ratatui::widgets::ListState;

use notesync_core::diff::DiffSummary;
use notesync_core::tracker::ChangeTracker;
use notesync_core::types::{ActivityEntry, RenderAnnotation};

use crate::sync::types::{DiffPayload, FileEntry, PollPayload};

/// UI mode controlling which keybinding set is active.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Normal vim-style navigation mode (default).
    #[default]
    Normal,
    /// Full-screen help overlay is shown above all panels.
    HelpOverlay,
}

/// Which panel currently has keyboard focus.
///
/// The default focus is `Files`. Navigation cycles Files → Diff → Team and
/// back via `next()` / `prev()`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    /// Left panel showing the note files with unread markers.
    #[default]
    Files,
    /// Centre panel showing the last-seen → current diff.
    Diff,
    /// Right panel showing the activity feed and the file's annotations.
    Team,
}

impl PanelFocus {
    /// Returns the panel that precedes `self` in the cycle (wraps around).
    pub fn prev(self) -> Self {
        match self {
            PanelFocus::Files => PanelFocus::Team,
            PanelFocus::Diff => PanelFocus::Files,
            PanelFocus::Team => PanelFocus::Diff,
        }
    }

    /// Returns the panel that follows `self` in the cycle (wraps around).
    pub fn next(self) -> Self {
        match self {
            PanelFocus::Files => PanelFocus::Diff,
            PanelFocus::Diff => PanelFocus::Team,
            PanelFocus::Team => PanelFocus::Files,
        }
    }
}

/// All mutable UI state passed through every render cycle.
///
/// Bundled so the render function receives a single reference and the
/// keybinding dispatcher a single mutable reference.
pub struct AppState {
    /// Current mode governing which keybindings are active.
    pub mode: Mode,
    /// Which panel currently receives keyboard scroll/navigation events.
    pub focus: PanelFocus,

    /// The local user's name, shown in the status bar and fed to the tracker.
    pub username: String,

    /// In-memory unread set + activity feed, driven by poll deltas.
    pub tracker: ChangeTracker,
    /// Cached activity feed snapshot, refreshed whenever changes arrive.
    pub activity: Vec<ActivityEntry>,

    /// Current note listing from the replica, in path order.
    pub files: Vec<FileEntry>,
    /// Paths currently shown with an unread marker: the durable flags from
    /// the poll merged with the tracker's advisory set.
    pub unread: HashSet<String>,
    /// Stateful list widget backing the files panel.
    pub file_list_state: ListState,

    /// Diff currently shown in the centre panel, if any.
    pub diff: Option<DiffPayload>,
    /// True while the watcher is computing a requested diff.
    pub diff_loading: bool,
    /// Vertical scroll offset for the diff panel.
    pub diff_scroll: usize,
    /// Cursor into the current diff's `change_offsets` for `[` / `]` jumps.
    pub change_cursor: usize,

    /// Relocated annotations for `notes_for`, newest-created last.
    pub notes: Vec<RenderAnnotation>,
    /// Path the `notes` list belongs to. A stale refresh for a different
    /// path is dropped instead of overwriting the current file's notes.
    pub notes_for: Option<String>,

    /// Vertical scroll offset for the team panel.
    pub team_scroll: u16,
    /// Vertical scroll offset for the help overlay.
    pub help_scroll: u16,

    /// Inner heights of the three panels after borders, cached after each
    /// render for half-page and full-page scroll calculations.
    pub files_viewport_height: u16,
    pub diff_viewport_height: u16,
    pub team_viewport_height: u16,

    /// Panel rects from the last layout pass, for click-to-focus hit tests.
    pub panel_rects: [Rect; 3],

    /// Width percentages for the left / centre / right panels.
    pub left_pct: u16,
    pub center_pct: u16,
    pub right_pct: u16,
}

impl AppState {
    /// Constructs `AppState` for `username` with nothing loaded yet.
    ///
    /// Panel percentages are 22 / 50 / 28 (left / centre / right). All
    /// scroll offsets start at zero; the file list starts unselected.
    pub fn new(username: String) -> Self {
        let tracker = ChangeTracker::new(username.clone());
        Self {
            mode: Mode::default(),
            focus: PanelFocus::default(),
            username,
            tracker,
            activity: Vec::new(),
            files: Vec::new(),
            unread: HashSet::new(),
            file_list_state: ListState::default(),
            diff: None,
            diff_loading: false,
            diff_scroll: 0,
            change_cursor: 0,
            notes: Vec::new(),
            notes_for: None,
            team_scroll: 0,
            help_scroll: 0,
            files_viewport_height: 0,
            diff_viewport_height: 0,
            team_viewport_height: 0,
            panel_rects: [Rect::default(); 3],
            left_pct: 22,
            center_pct: 50,
            right_pct: 28,
        }
    }

    /// Path of the file currently selected in the files panel.
    pub fn selected_file(&self) -> Option<&FileEntry> {
        self.files.get(self.file_list_state.selected()?)
    }

    /// Applies one poll result: replaces the listing, replays the delta
    /// through the tracker, and rebuilds the unread set.
    ///
    /// The unread marker shows when either notion of unread holds: the
    /// durable read-ledger flag from the poll, or the tracker's advisory
    /// "changed by someone else since launch" set.
    pub fn apply_poll(&mut self, payload: PollPayload) {
        for change in &payload.changes {
            self.tracker.track_change(
                &change.file_path,
                &change.modified_by,
                change.timestamp,
                &change.rev,
            );
        }
        if !payload.changes.is_empty() {
            self.activity = self.tracker.activity_feed();
        }

        self.files = payload.files;
        self.unread = self
            .files
            .iter()
            .filter(|f| f.unread)
            .map(|f| f.path.clone())
            .collect();
        self.unread.extend(self.tracker.unread_files());

        // Keep the selection on the list after the listing changed size.
        if let Some(selected) = self.file_list_state.selected() {
            if selected >= self.files.len() {
                self.file_list_state.select(if self.files.is_empty() {
                    None
                } else {
                    Some(self.files.len() - 1)
                });
            }
        }
    }

    /// Applies a computed diff to the centre panel.
    ///
    /// A reply for a file other than the current selection is stale (the
    /// user moved on while the watcher worked) and is dropped.
    pub fn apply_diff(&mut self, payload: DiffPayload) {
        if self.selected_file().map(|f| f.path.as_str()) != Some(payload.path.as_str()) {
            return;
        }
        self.diff = Some(payload);
        self.diff_loading = false;
        self.diff_scroll = 0;
        self.change_cursor = 0;
    }

    /// Applies a relocated-annotations refresh, dropping stale replies.
    pub fn apply_notes(&mut self, path: String, notes: Vec<RenderAnnotation>) {
        if self.selected_file().map(|f| f.path.as_str()) != Some(path.as_str()) {
            return;
        }
        self.notes = notes;
        self.notes_for = Some(path);
    }

    /// Marks a file read in the advisory state immediately; the durable
    /// ledger write completes asynchronously and the next poll confirms it.
    pub fn mark_read_locally(&mut self, path: &str) {
        self.tracker.mark_as_read(path);
        self.unread.remove(path);
        if let Some(entry) = self.files.iter_mut().find(|f| f.path == path) {
            entry.unread = false;
        }
    }

    /// Summary of the current diff for the status bar, if one is loaded.
    pub fn diff_summary(&self) -> Option<DiffSummary> {
        self.diff.as_ref().map(|d| d.summary)
    }

    /// Scrolls the focused panel down by `lines` rows.
    pub fn scroll_down(&mut self, lines: u16) {
        match self.focus {
            PanelFocus::Files => {
                self.file_list_state.scroll_down_by(lines);
            }
            PanelFocus::Diff => {
                self.diff_scroll = self.diff_scroll.saturating_add(lines as usize);
            }
            PanelFocus::Team => {
                self.team_scroll = self.team_scroll.saturating_add(lines);
            }
        }
    }

    /// Scrolls the focused panel up by `lines` rows.
    pub fn scroll_up(&mut self, lines: u16) {
        match self.focus {
            PanelFocus::Files => {
                self.file_list_state.scroll_up_by(lines);
            }
            PanelFocus::Diff => {
                self.diff_scroll = self.diff_scroll.saturating_sub(lines as usize);
            }
            PanelFocus::Team => {
                self.team_scroll = self.team_scroll.saturating_sub(lines);
            }
        }
    }

    /// Scrolls the focused panel to the very top.
    pub fn scroll_top(&mut self) {
        match self.focus {
            PanelFocus::Files => self.file_list_state.select_first(),
            PanelFocus::Diff => self.diff_scroll = 0,
            PanelFocus::Team => self.team_scroll = 0,
        }
    }

    /// Scrolls the focused panel to the very bottom.
    ///
    /// For `Diff` the offset is set to the last line index (clamped by the
    /// renderer); for `Team` to `u16::MAX` (ratatui clamps).
    pub fn scroll_bottom(&mut self) {
        match self.focus {
            PanelFocus::Files => self.file_list_state.select_last(),
            PanelFocus::Diff => {
                self.diff_scroll =
                    self.diff.as_ref().map(|d| d.lines.len().saturating_sub(1)).unwrap_or(0);
            }
            PanelFocus::Team => self.team_scroll = u16::MAX,
        }
    }

    /// Scrolls the focused panel down by half its visible height.
    ///
    /// Uses the viewport height cached from the previous render; on the
    /// first frame (cached height zero) scrolls by 1 to avoid a no-op.
    pub fn half_page_down(&mut self) {
        self.scroll_down((self.focused_viewport_height() / 2).max(1));
    }

    /// Scrolls the focused panel up by half its visible height.
    pub fn half_page_up(&mut self) {
        self.scroll_up((self.focused_viewport_height() / 2).max(1));
    }

    /// Scrolls the focused panel down by its full visible height.
    pub fn full_page_down(&mut self) {
        self.scroll_down(self.focused_viewport_height().max(1));
    }

    /// Scrolls the focused panel up by its full visible height.
    pub fn full_page_up(&mut self) {
        self.scroll_up(self.focused_viewport_height().max(1));
    }

    fn focused_viewport_height(&self) -> u16 {
        match self.focus {
            PanelFocus::Files => self.files_viewport_height,
            PanelFocus::Diff => self.diff_viewport_height,
            PanelFocus::Team => self.team_viewport_height,
        }
    }

    /// Moves the files selection up one row, regardless of focus.
    pub fn prev_file(&mut self) {
        self.file_list_state.scroll_up_by(1);
    }

    /// Moves the files selection down one row, regardless of focus.
    pub fn next_file(&mut self) {
        self.file_list_state.scroll_down_by(1);
    }

    /// Jumps the diff panel to the previous changed region (`[` key).
    pub fn prev_change(&mut self) {
        let Some(diff) = &self.diff else { return };
        if diff.change_offsets.is_empty() {
            return;
        }
        self.change_cursor = self.change_cursor.saturating_sub(1);
        self.diff_scroll = diff.change_offsets[self.change_cursor];
    }

    /// Jumps the diff panel to the next changed region (`]` key).
    pub fn next_change(&mut self) {
        let Some(diff) = &self.diff else { return };
        if diff.change_offsets.is_empty() {
            return;
        }
        self.change_cursor = (self.change_cursor + 1).min(diff.change_offsets.len() - 1);
        self.diff_scroll = diff.change_offsets[self.change_cursor];
    }

    /// Moves focus to the diff panel for the selected file (Enter / `l`).
    ///
    /// The caller is responsible for requesting the diff and the annotation
    /// refresh; this only adjusts view state.
    pub fn open_selected(&mut self) {
        if self.file_list_state.selected().is_some() {
            self.diff = None;
            self.diff_loading = true;
            self.diff_scroll = 0;
            self.change_cursor = 0;
            self.notes.clear();
            self.notes_for = None;
            self.focus = PanelFocus::Diff;
        }
    }

    /// Shrinks the diff (centre) panel by transferring 5% to the side panels.
    ///
    /// The centre panel will not shrink below 20%.
    pub fn shrink_diff_panel(&mut self) {
        const MIN_CENTER: u16 = 20;
        const STEP: u16 = 5;
        if self.center_pct <= MIN_CENTER {
            return;
        }
        let transfer = STEP.min(self.center_pct - MIN_CENTER);
        self.center_pct -= transfer;
        let left_gain = transfer / 2;
        self.left_pct = self.left_pct.saturating_add(left_gain);
        self.right_pct = self.right_pct.saturating_add(transfer - left_gain);
    }

    /// Grows the diff (centre) panel by pulling 5% from the side panels.
    ///
    /// The centre panel will not grow above 80%; side panels keep at least
    /// 5% each.
    pub fn grow_diff_panel(&mut self) {
        const MAX_CENTER: u16 = 80;
        const MIN_SIDE: u16 = 5;
        const STEP: u16 = 5;
        if self.center_pct >= MAX_CENTER {
            return;
        }
        let transfer = STEP.min(MAX_CENTER - self.center_pct);
        let left_give = (transfer / 2).min(self.left_pct.saturating_sub(MIN_SIDE));
        let right_give = (transfer - transfer / 2).min(self.right_pct.saturating_sub(MIN_SIDE));
        self.left_pct -= left_give;
        self.right_pct -= right_give;
        self.center_pct += left_give + right_give;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notesync_core::types::ActivityEntry;

    fn entry(path: &str, rev: &str, by: &str, unread: bool) -> FileEntry {
        FileEntry {
            path: path.to_owned(),
            rev: rev.to_owned(),
            modified_by: by.to_owned(),
            updated_at: 1,
            unread,
        }
    }

    #[test]
    fn poll_merges_durable_and_advisory_unread() {
        let mut state = AppState::new("alice".to_owned());
        state.apply_poll(PollPayload {
            files: vec![entry("a.md", "1-x", "bob", true), entry("b.md", "1-y", "alice", false)],
            changes: vec![],
        });
        assert!(state.unread.contains("a.md"));
        assert!(!state.unread.contains("b.md"));

        // A remote change arrives for b.md: advisory unread plus feed entry.
        state.apply_poll(PollPayload {
            files: vec![entry("a.md", "1-x", "bob", true), entry("b.md", "2-z", "bob", true)],
            changes: vec![ActivityEntry {
                file_path: "b.md".to_owned(),
                modified_by: "bob".to_owned(),
                timestamp: 2,
                rev: "2-z".to_owned(),
            }],
        });
        assert!(state.unread.contains("b.md"));
        assert_eq!(state.activity.len(), 1);
    }

    #[test]
    fn own_changes_do_not_mark_unread() {
        let mut state = AppState::new("alice".to_owned());
        state.apply_poll(PollPayload {
            files: vec![entry("a.md", "2-x", "alice", false)],
            changes: vec![ActivityEntry {
                file_path: "a.md".to_owned(),
                modified_by: "alice".to_owned(),
                timestamp: 2,
                rev: "2-x".to_owned(),
            }],
        });
        assert!(!state.unread.contains("a.md"));
        assert_eq!(state.activity.len(), 1, "own edits still appear in the feed");
    }

    #[test]
    fn mark_read_locally_clears_both_views() {
        let mut state = AppState::new("alice".to_owned());
        state.apply_poll(PollPayload {
            files: vec![entry("a.md", "2-x", "bob", true)],
            changes: vec![ActivityEntry {
                file_path: "a.md".to_owned(),
                modified_by: "bob".to_owned(),
                timestamp: 2,
                rev: "2-x".to_owned(),
            }],
        });
        assert!(state.unread.contains("a.md"));
        state.mark_read_locally("a.md");
        assert!(!state.unread.contains("a.md"));
        assert!(!state.tracker.is_unread("a.md"));
        assert!(!state.files[0].unread);
    }

    #[test]
    fn stale_diff_and_notes_replies_are_dropped() {
        let mut state = AppState::new("alice".to_owned());
        state.apply_poll(PollPayload {
            files: vec![entry("a.md", "1-x", "bob", false), entry("b.md", "1-y", "bob", false)],
            changes: vec![],
        });
        state.file_list_state.select(Some(0));

        state.apply_notes("b.md".to_owned(), vec![]);
        assert!(state.notes_for.is_none(), "stale notes reply must be ignored");

        state.apply_diff(DiffPayload {
            path: "b.md".to_owned(),
            old_rev: None,
            new_rev: "1-y".to_owned(),
            summary: DiffSummary::default(),
            lines: vec![],
            change_offsets: vec![],
        });
        assert!(state.diff.is_none(), "stale diff reply must be ignored");
    }

    #[test]
    fn panel_resize_keeps_percentages_bounded() {
        let mut state = AppState::new("alice".to_owned());
        for _ in 0..30 {
            state.grow_diff_panel();
        }
        assert!(state.center_pct <= 80);
        assert!(state.left_pct >= 5 && state.right_pct >= 5);
        for _ in 0..30 {
            state.shrink_diff_panel();
        }
        assert!(state.center_pct >= 20);
    }

    #[test]
    fn focus_cycle_round_trips() {
        let mut focus = PanelFocus::Files;
        for _ in 0..3 {
            focus = focus.next();
        }
        assert_eq!(focus, PanelFocus::Files);
        assert_eq!(PanelFocus::Files.prev(), PanelFocus::Team);
    }
}
