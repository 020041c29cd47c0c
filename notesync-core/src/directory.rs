//! The user-directory collaborator: team roles mapped onto directory roles.
//!
//! Member accounts live in an HTTP-managed user directory owned by the
//! document store's server. The HTTP calls themselves are out of scope —
//! they sit behind [`UserDirectory`], with every operation reduced to a
//! success/failure boolean — but the pure mapping from team roles to
//! directory role strings and the shape of a user record are part of this
//! system's contract and live here so tests can pin them down.

use async_trait::async_trait;
use serde_json::json;

use crate::types::TeamRole;

/// Directory role granted to team admins (alongside directory admin).
pub const ROLE_TEAM_ADMIN: &str = "team_admin";
/// Directory role granted to team editors.
pub const ROLE_TEAM_EDITOR: &str = "team_editor";
/// Directory role granted to team viewers.
pub const ROLE_TEAM_VIEWER: &str = "team_viewer";

/// Maps a team role to the directory role strings it carries.
///
/// The server's write policy keys off these strings (see [`crate::policy`]).
pub fn directory_roles(role: TeamRole) -> Vec<&'static str> {
    match role {
        TeamRole::Admin => vec!["admin", ROLE_TEAM_ADMIN],
        TeamRole::Editor => vec![ROLE_TEAM_EDITOR],
        TeamRole::Viewer => vec![ROLE_TEAM_VIEWER],
    }
}

/// Builds the JSON user record the directory API accepts on create/update.
pub fn build_user_record(username: &str, password: &str, roles: &[&str]) -> serde_json::Value {
    json!({
        "name": username,
        "type": "user",
        "roles": roles,
        "password": password,
    })
}

/// Administrative operations against the user directory.
///
/// Implementations carry the admin credentials and endpoint, perform the
/// HTTP calls, and reduce every failure (transport or rejection) to `false`
/// or an empty list — a directory outage degrades member management, never
/// crashes it.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn create_user(&self, username: &str, password: &str, role: TeamRole) -> bool;
    async fn update_user_role(&self, username: &str, role: TeamRole) -> bool;
    async fn reset_password(&self, username: &str, new_password: &str) -> bool;
    async fn delete_user(&self, username: &str) -> bool;
    /// Usernames of all directory accounts, empty on failure.
    async fn list_users(&self) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_mapping_matches_policy_contract() {
        assert_eq!(directory_roles(TeamRole::Admin), ["admin", "team_admin"]);
        assert_eq!(directory_roles(TeamRole::Editor), ["team_editor"]);
        assert_eq!(directory_roles(TeamRole::Viewer), ["team_viewer"]);
    }

    #[test]
    fn user_record_shape() {
        let record = build_user_record("bob", "hunter2", &directory_roles(TeamRole::Editor));
        assert_eq!(record["name"], "bob");
        assert_eq!(record["type"], "user");
        assert_eq!(record["roles"][0], "team_editor");
        assert_eq!(record["password"], "hunter2");
    }
}
