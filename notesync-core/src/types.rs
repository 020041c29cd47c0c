use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Document-id prefix for annotation records in the shared store.
pub const ANNOTATION_PREFIX: &str = "team:annotation:";

/// Document id of the single team configuration record.
pub const TEAM_CONFIG_ID: &str = "team:config";

/// Document-id prefix for pushed team settings entries (one per plugin id).
pub const SETTINGS_PREFIX: &str = "team:settings:";

/// Document id of the team notification configuration record.
pub const NOTIFICATION_CONFIG_ID: &str = "team:notifications:config";

/// Document-id prefix for per-user notification preference records.
pub const NOTIFICATION_PREFS_PREFIX: &str = "team:notifications:prefs:";

/// Document-id prefix for read-state records, when a deployment chooses to
/// replicate them. The core itself keeps read state in the local ledger only;
/// the prefix exists because the store's write policy names it (see `policy`).
pub const READ_STATE_PREFIX: &str = "readstate:";

/// A span of text expressed in editor coordinates.
///
/// Lines are 0-based and split on `\n`. Character offsets are 0-based counts
/// of Unicode scalar values within a line; the end is exclusive. A range
/// produced by relocation always satisfies start ≤ end in document order and
/// stays within the current document bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRange {
    pub start_line: usize,
    pub start_char: usize,
    pub end_line: usize,
    pub end_char: usize,
}

/// The stored fingerprint used to relocate a span after edits.
///
/// Captured once at annotation-creation time and never regenerated by the
/// relocation path. `original_range` is advisory: it is the fallback position
/// shown when every relocation strategy misses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorContext {
    /// The originally selected substring.
    pub selected_text: String,
    /// Up to 50 characters immediately preceding the selection at capture
    /// time (fewer at document start — truncated, never padded).
    pub context_before: String,
    /// Up to 50 characters immediately following the selection at capture
    /// time (fewer at document end).
    pub context_after: String,
    /// The line/column span at capture time.
    pub original_range: AnchorRange,
}

/// A threaded, anchored comment on a span of a shared document.
///
/// Stored as a JSON body in the shared document store under an
/// `ANNOTATION_PREFIX` id. Replies are independent records pointing at their
/// parent via `parent_id` — there is no containment. The `resolved` flag is
/// monotonic: once true it never reverts. Records are never physically
/// removed by this layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Creation-time id: fixed-width base36 millisecond timestamp plus a
    /// random suffix, so ids sort roughly by creation time.
    pub id: String,
    pub file_path: String,
    pub range: AnchorRange,
    pub context_before: String,
    pub context_after: String,
    pub selected_text: String,
    pub content: String,
    pub author: String,
    pub mentions: Vec<String>,
    /// Unix timestamp (seconds) at creation.
    pub timestamp: i64,
    pub resolved: bool,
    /// `None` for top-level annotations; `Some(parent)` for replies.
    pub parent_id: Option<String>,
}

/// Caller-supplied fields for creating a new annotation.
///
/// The store assigns the id and timestamp and sets `resolved = false`.
/// `parent_id` is not validated against an existing record — a dangling
/// parent simply yields zero matches from the reply query.
#[derive(Debug, Clone)]
pub struct CreateAnnotation {
    pub file_path: String,
    pub range: AnchorRange,
    pub context_before: String,
    pub context_after: String,
    pub selected_text: String,
    pub content: String,
    pub author: String,
    pub mentions: Vec<String>,
    pub parent_id: Option<String>,
}

/// A render-ready annotation produced by the relocation refresh cycle.
///
/// `range` is the relocated span when the anchor was found in the current
/// text, or the last-known stored span when it was not — an orphaned
/// annotation degrades to "possibly misplaced", never to "gone".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderAnnotation {
    pub id: String,
    pub range: AnchorRange,
    pub content: String,
    pub author: String,
    pub resolved: bool,
    pub reply_count: usize,
}

/// One remote-edit notification as observed by the change tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    pub file_path: String,
    pub modified_by: String,
    /// Unix timestamp (seconds) reported by the replication feed.
    pub timestamp: i64,
    /// Opaque revision token of the document after the edit.
    pub rev: String,
}

/// Durable per-file read state for the local user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReadState {
    /// Revision token last marked as seen. Opaque — compared only for
    /// equality, never ordered.
    pub last_seen_rev: String,
    /// Unix timestamp (seconds) of the mark-as-read.
    pub last_seen_at: i64,
}

/// Role of a team member, in decreasing order of capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Admin,
    Editor,
    Viewer,
}

impl TeamRole {
    /// Lowercase name as stored in team config documents.
    pub fn as_str(self) -> &'static str {
        match self {
            TeamRole::Admin => "admin",
            TeamRole::Editor => "editor",
            TeamRole::Viewer => "viewer",
        }
    }
}

/// A single member entry inside the team config document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub role: TeamRole,
    /// Unix timestamp (seconds) of the member's last completed sync, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<i64>,
}

/// Feature toggles carried in the team config document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamFeatures {
    pub annotations: bool,
    pub settings_push: bool,
    pub change_indicators: bool,
}

/// The `team:config` document: team name, member roster, feature toggles.
///
/// Team mode is enabled for a replica exactly when this document exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamConfig {
    pub team_name: String,
    /// Keyed by directory username.
    pub members: BTreeMap<String, TeamMember>,
    pub features: TeamFeatures,
}

impl TeamConfig {
    /// Builds the initial config written when a team is first created:
    /// one admin member, change indicators on, everything else opt-in.
    pub fn initial(team_name: &str, admin_username: &str) -> Self {
        let mut members = BTreeMap::new();
        members.insert(
            admin_username.to_owned(),
            TeamMember { role: TeamRole::Admin, last_sync: None },
        );
        TeamConfig {
            team_name: team_name.to_owned(),
            members,
            features: TeamFeatures {
                annotations: false,
                settings_push: false,
                change_indicators: true,
            },
        }
    }
}

/// The record kinds multiplexed into the shared store's single keyspace.
///
/// Every typed record kind maps to exactly one id prefix. Ids matching no
/// prefix are ordinary note documents whose body is the note text itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    TeamConfig,
    Annotation,
    Settings,
    NotificationConfig,
    NotificationPrefs,
    ReadState,
}

impl RecordKind {
    /// Classifies a document id by its prefix. Returns `None` for plain
    /// note documents.
    pub fn of_id(id: &str) -> Option<RecordKind> {
        if id == TEAM_CONFIG_ID {
            Some(RecordKind::TeamConfig)
        } else if id == NOTIFICATION_CONFIG_ID {
            Some(RecordKind::NotificationConfig)
        } else if id.starts_with(ANNOTATION_PREFIX) {
            Some(RecordKind::Annotation)
        } else if id.starts_with(NOTIFICATION_PREFS_PREFIX) {
            Some(RecordKind::NotificationPrefs)
        } else if id.starts_with(SETTINGS_PREFIX) {
            Some(RecordKind::Settings)
        } else if id.starts_with(READ_STATE_PREFIX) {
            Some(RecordKind::ReadState)
        } else {
            None
        }
    }
}
