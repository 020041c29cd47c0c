//! The store-side write policy, as a documented table.
//!
//! Enforcement happens inside the document store's server at write time —
//! not in this crate. The table below reproduces that policy so the test
//! suite (and an operator reading the code) can check a deployment's actual
//! enforcement against the intended contract. No core write path consults
//! this module.
//!
//! | Role            | May write                                         |
//! |-----------------|---------------------------------------------------|
//! | (server admin)  | everything (bypasses validation entirely)         |
//! | `team_admin`    | everything                                        |
//! | `team_editor`   | everything except `team:config` and `team:settings:*` |
//! | `team_viewer`   | only `readstate:*` documents                      |
//! | (no team role)  | everything (pre-team deployments keep working)    |

use crate::types::{TeamRole, READ_STATE_PREFIX, SETTINGS_PREFIX, TEAM_CONFIG_ID};

/// Whether a member holding `role` may write the document `doc_id`,
/// per the table above. `None` means the user carries no team role.
pub fn can_write(role: Option<TeamRole>, doc_id: &str) -> bool {
    match role {
        Some(TeamRole::Admin) | None => true,
        Some(TeamRole::Viewer) => doc_id.starts_with(READ_STATE_PREFIX),
        Some(TeamRole::Editor) => {
            doc_id != TEAM_CONFIG_ID && !doc_id.starts_with(SETTINGS_PREFIX)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admins_and_roleless_users_write_anything() {
        for role in [Some(TeamRole::Admin), None] {
            assert!(can_write(role, "team:config"));
            assert!(can_write(role, "team:settings:editor"));
            assert!(can_write(role, "notes/plan.md"));
            assert!(can_write(role, "readstate:notes/plan.md"));
        }
    }

    #[test]
    fn editors_cannot_touch_team_administration() {
        let editor = Some(TeamRole::Editor);
        assert!(!can_write(editor, "team:config"));
        assert!(!can_write(editor, "team:settings:editor"));
        assert!(can_write(editor, "team:annotation:0abc-def"));
        assert!(can_write(editor, "notes/plan.md"));
        assert!(can_write(editor, "readstate:notes/plan.md"));
    }

    #[test]
    fn viewers_write_read_state_only() {
        let viewer = Some(TeamRole::Viewer);
        assert!(can_write(viewer, "readstate:notes/plan.md"));
        assert!(!can_write(viewer, "notes/plan.md"));
        assert!(!can_write(viewer, "team:annotation:0abc-def"));
        assert!(!can_write(viewer, "team:config"));
    }
}
