//! In-memory change tracking: the unread-file set and the activity feed.
//!
//! One tracker instance per running session. It is an observer of the
//! replication feed, not an orderer: entries are recorded in arrival order
//! (front insertion, index 0 newest), which may differ from the true causal
//! order of edits across authors. Nothing here is persisted — the tracker is
//! rebuilt from the feed on every launch; the durable notion of "seen" lives
//! in the read-state ledger.

use std::collections::{HashSet, VecDeque};

use crate::types::ActivityEntry;

/// Maximum number of entries retained in the activity feed.
pub const MAX_ACTIVITY_ENTRIES: usize = 100;

/// Tracks file changes from team members and maintains the activity feed.
///
/// - Unread files: paths changed by someone other than the current user
///   since they were last marked read.
/// - Activity feed: the most recent [`MAX_ACTIVITY_ENTRIES`] changes from
///   anyone, reverse chronological.
#[derive(Debug)]
pub struct ChangeTracker {
    current_user: String,
    unread_files: HashSet<String>,
    activity_feed: VecDeque<ActivityEntry>,
}

impl ChangeTracker {
    pub fn new(current_user: impl Into<String>) -> Self {
        ChangeTracker {
            current_user: current_user.into(),
            unread_files: HashSet::new(),
            activity_feed: VecDeque::new(),
        }
    }

    /// Records one replicated change.
    ///
    /// Always prepends to the activity feed (evicting the oldest entry past
    /// the cap). Marks the file unread only when the change came from someone
    /// else — a user's own edits never flag their own files.
    pub fn track_change(&mut self, file_path: &str, modified_by: &str, timestamp: i64, rev: &str) {
        self.activity_feed.push_front(ActivityEntry {
            file_path: file_path.to_owned(),
            modified_by: modified_by.to_owned(),
            timestamp,
            rev: rev.to_owned(),
        });
        self.activity_feed.truncate(MAX_ACTIVITY_ENTRIES);

        if modified_by != self.current_user {
            self.unread_files.insert(file_path.to_owned());
        }
    }

    /// Clears the unread indicator for a file. The activity feed is untouched.
    pub fn mark_as_read(&mut self, file_path: &str) {
        self.unread_files.remove(file_path);
    }

    pub fn is_unread(&self, file_path: &str) -> bool {
        self.unread_files.contains(file_path)
    }

    /// Snapshot of the unread paths.
    pub fn unread_files(&self) -> HashSet<String> {
        self.unread_files.clone()
    }

    /// Snapshot of the activity feed, newest first.
    pub fn activity_feed(&self) -> Vec<ActivityEntry> {
        self.activity_feed.iter().cloned().collect()
    }

    /// De-duplicated set of authors appearing in the current feed.
    pub fn authors(&self) -> HashSet<String> {
        self.activity_feed.iter().map(|e| e.modified_by.clone()).collect()
    }

    /// Updates the current username (e.g. after a settings change).
    pub fn set_current_user(&mut self, username: impl Into<String>) {
        self.current_user = username.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_changes_feed_but_never_flag_unread() {
        let mut tracker = ChangeTracker::new("alice");
        tracker.track_change("notes/a.md", "alice", 100, "1-aa");
        assert!(!tracker.is_unread("notes/a.md"));
        assert_eq!(tracker.activity_feed().len(), 1);
    }

    #[test]
    fn remote_changes_flag_unread() {
        let mut tracker = ChangeTracker::new("alice");
        tracker.track_change("notes/a.md", "bob", 100, "2-bb");
        assert!(tracker.is_unread("notes/a.md"));
        assert_eq!(tracker.unread_files().len(), 1);
    }

    #[test]
    fn mark_as_read_clears_only_the_unread_set() {
        let mut tracker = ChangeTracker::new("alice");
        tracker.track_change("notes/a.md", "bob", 100, "2-bb");
        tracker.mark_as_read("notes/a.md");
        assert!(!tracker.is_unread("notes/a.md"));
        assert_eq!(tracker.activity_feed().len(), 1);
    }

    #[test]
    fn feed_is_capped_and_newest_first() {
        let mut tracker = ChangeTracker::new("alice");
        for i in 0..110 {
            tracker.track_change(&format!("notes/{i}.md"), "bob", i, &format!("{i}-rev"));
        }
        let feed = tracker.activity_feed();
        assert_eq!(feed.len(), MAX_ACTIVITY_ENTRIES);
        assert_eq!(feed[0].file_path, "notes/109.md");
        assert_eq!(feed.last().unwrap().file_path, "notes/10.md");
    }

    #[test]
    fn authors_deduplicate_across_the_feed() {
        let mut tracker = ChangeTracker::new("alice");
        tracker.track_change("a", "bob", 1, "1-a");
        tracker.track_change("b", "carol", 2, "1-b");
        tracker.track_change("c", "bob", 3, "1-c");
        let authors = tracker.authors();
        assert_eq!(authors.len(), 2);
        assert!(authors.contains("bob") && authors.contains("carol"));
    }

    #[test]
    fn identity_update_applies_to_later_changes() {
        let mut tracker = ChangeTracker::new("alice");
        tracker.set_current_user("bob");
        tracker.track_change("notes/a.md", "bob", 1, "1-a");
        assert!(!tracker.is_unread("notes/a.md"));
        tracker.track_change("notes/b.md", "alice", 2, "1-b");
        assert!(tracker.is_unread("notes/b.md"));
    }

    #[test]
    fn queries_return_defensive_copies() {
        let mut tracker = ChangeTracker::new("alice");
        tracker.track_change("a", "bob", 1, "1-a");
        let mut unread = tracker.unread_files();
        unread.clear();
        assert!(tracker.is_unread("a"));
    }
}
