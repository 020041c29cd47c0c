//! The `team:config` document and its lifecycle.
//!
//! Team mode is enabled for a replica exactly when this document exists.
//! The config is an ordinary replicated document, so membership changes made
//! by an admin propagate to every replica through the normal feed. Nothing
//! here caches the config globally — components that need the current user
//! identity receive it explicitly (see [`crate::tracker::ChangeTracker`]).

use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::store::{DocWrite, DocumentStore, PutResult};
use crate::types::{TeamConfig, TeamMember, TeamRole, TEAM_CONFIG_ID};

/// Manager for the team config document over any [`DocumentStore`].
pub struct TeamConfigManager<S> {
    store: S,
}

impl<S: DocumentStore> TeamConfigManager<S> {
    pub fn new(store: S) -> Self {
        TeamConfigManager { store }
    }

    /// The current team config, or `None` when team mode is not configured.
    /// A malformed stored document also reads as `None` rather than an error.
    pub async fn get_config(&self) -> Result<Option<TeamConfig>, StoreError> {
        let Some(doc) = self.store.fetch(TEAM_CONFIG_ID, None).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&doc.body) {
            Ok(config) => Ok(Some(config)),
            Err(e) => {
                tracing::warn!(error = %e, "team config document is malformed; treating as absent");
                Ok(None)
            }
        }
    }

    /// Writes the config (create or update).
    ///
    /// Returns `Ok(false)` when the write lost an optimistic-concurrency
    /// race against another admin's update; the caller refetches and retries
    /// at its own discretion.
    pub async fn save_config(&self, config: &TeamConfig) -> Result<bool, StoreError> {
        let existing_rev = self
            .store
            .fetch(TEAM_CONFIG_ID, None)
            .await?
            .map(|doc| doc.rev);
        let write = DocWrite {
            id: TEAM_CONFIG_ID.to_owned(),
            expected_rev: existing_rev,
            body: serde_json::to_string(config)?,
            modified_by: String::new(),
        };
        Ok(matches!(self.store.put(write).await?, PutResult::Stored { .. }))
    }

    /// Creates the team config with a single admin member. Returns
    /// `Ok(false)` when a team already exists.
    pub async fn initialize_team(
        &self,
        team_name: &str,
        admin_username: &str,
    ) -> Result<bool, StoreError> {
        if self.get_config().await?.is_some() {
            return Ok(false);
        }
        self.save_config(&TeamConfig::initial(team_name, admin_username)).await
    }

    /// Adds (or re-adds) a member with the given role.
    pub async fn add_member(&self, username: &str, role: TeamRole) -> Result<bool, StoreError> {
        let Some(mut config) = self.get_config().await? else { return Ok(false) };
        config
            .members
            .insert(username.to_owned(), TeamMember { role, last_sync: None });
        self.save_config(&config).await
    }

    /// Changes an existing member's role. Unknown members report failure.
    pub async fn update_member_role(
        &self,
        username: &str,
        role: TeamRole,
    ) -> Result<bool, StoreError> {
        let Some(mut config) = self.get_config().await? else { return Ok(false) };
        match config.members.get_mut(username) {
            Some(member) => member.role = role,
            None => return Ok(false),
        }
        self.save_config(&config).await
    }

    /// Removes a member. Unknown members report failure.
    pub async fn remove_member(&self, username: &str) -> Result<bool, StoreError> {
        let Some(mut config) = self.get_config().await? else { return Ok(false) };
        if config.members.remove(username).is_none() {
            return Ok(false);
        }
        self.save_config(&config).await
    }

    /// The member roster, empty when team mode is not configured.
    pub async fn members(&self) -> Result<BTreeMap<String, TeamMember>, StoreError> {
        Ok(self.get_config().await?.map(|c| c.members).unwrap_or_default())
    }

    /// Convenience: the role of `username`, when a team exists and the user
    /// is a member of it.
    pub async fn role_of(&self, username: &str) -> Result<Option<TeamRole>, StoreError> {
        Ok(self
            .get_config()
            .await?
            .and_then(|c| c.members.get(username).map(|m| m.role)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn initialize_once_then_manage_members() {
        let manager = TeamConfigManager::new(MemoryStore::new());
        assert!(manager.get_config().await.unwrap().is_none());

        assert!(manager.initialize_team("docs", "alice").await.unwrap());
        assert!(!manager.initialize_team("docs", "mallory").await.unwrap());

        assert!(manager.add_member("bob", TeamRole::Editor).await.unwrap());
        assert!(manager.update_member_role("bob", TeamRole::Viewer).await.unwrap());
        assert!(!manager.update_member_role("nobody", TeamRole::Viewer).await.unwrap());

        let members = manager.members().await.unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members["bob"].role, TeamRole::Viewer);
        assert_eq!(manager.role_of("alice").await.unwrap(), Some(TeamRole::Admin));
        assert_eq!(manager.role_of("nobody").await.unwrap(), None);

        assert!(manager.remove_member("bob").await.unwrap());
        assert!(!manager.remove_member("bob").await.unwrap());
    }
}
