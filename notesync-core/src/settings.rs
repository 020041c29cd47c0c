//! Team settings push: shared entries, local overrides, and the apply pass.
//!
//! Admins publish per-plugin settings entries into the shared store. Each
//! setting carries a mode: `enforced` values always win on every replica,
//! `default` values apply only until the member customizes that key locally.
//! The record of which keys a member customized is the local-only
//! `setting_overrides` ledger — deliberately not replicated, like read
//! state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio_rusqlite::Connection;

use crate::error::StoreError;
use crate::store::{DocWrite, DocumentStore, PutResult};
use crate::types::SETTINGS_PREFIX;

/// How a pushed setting interacts with local customization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingMode {
    /// Applied unless the member has customized the key locally.
    Default,
    /// Always applied; local customization is overwritten.
    Enforced,
}

/// One pushed setting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingSpec {
    pub value: serde_json::Value,
    pub mode: SettingMode,
}

/// A per-plugin settings entry as stored under `team:settings:{plugin_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsEntry {
    pub managed_by: String,
    /// Unix timestamp (seconds) of the last admin edit.
    pub updated_at: i64,
    pub settings: BTreeMap<String, SettingSpec>,
}

/// Store facade for settings entries over any [`DocumentStore`].
pub struct TeamSettingsStore<S> {
    store: S,
}

impl<S: DocumentStore> TeamSettingsStore<S> {
    pub fn new(store: S) -> Self {
        TeamSettingsStore { store }
    }

    fn entry_id(plugin_id: &str) -> String {
        format!("{SETTINGS_PREFIX}{plugin_id}")
    }

    /// The entry for one plugin id, or `None` when nothing is pushed for it.
    pub async fn get_entry(&self, plugin_id: &str) -> Result<Option<SettingsEntry>, StoreError> {
        let Some(doc) = self.store.fetch(&Self::entry_id(plugin_id), None).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&doc.body) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                tracing::warn!(plugin_id, error = %e, "malformed settings entry; treating as absent");
                Ok(None)
            }
        }
    }

    /// Every pushed entry, as `(plugin_id, entry)` pairs.
    pub async fn all_entries(&self) -> Result<Vec<(String, SettingsEntry)>, StoreError> {
        let docs = self.store.list_by_prefix(SETTINGS_PREFIX).await?;
        Ok(docs
            .into_iter()
            .filter_map(|doc| {
                let plugin_id = doc.id.strip_prefix(SETTINGS_PREFIX)?.to_owned();
                match serde_json::from_str(&doc.body) {
                    Ok(entry) => Some((plugin_id, entry)),
                    Err(e) => {
                        tracing::warn!(id = %doc.id, error = %e, "skipping malformed settings entry");
                        None
                    }
                }
            })
            .collect())
    }

    /// Writes an entry (create or update). `Ok(false)` on a lost write race.
    pub async fn save_entry(
        &self,
        plugin_id: &str,
        entry: &SettingsEntry,
    ) -> Result<bool, StoreError> {
        let id = Self::entry_id(plugin_id);
        let existing_rev = self.store.fetch(&id, None).await?.map(|doc| doc.rev);
        let write = DocWrite {
            id,
            expected_rev: existing_rev,
            body: serde_json::to_string(entry)?,
            modified_by: entry.managed_by.clone(),
        };
        Ok(matches!(self.store.put(write).await?, PutResult::Stored { .. }))
    }

    /// Removes one key from a plugin's entry. `Ok(false)` when the entry
    /// does not exist.
    pub async fn remove_setting(
        &self,
        plugin_id: &str,
        setting_key: &str,
    ) -> Result<bool, StoreError> {
        let Some(mut entry) = self.get_entry(plugin_id).await? else { return Ok(false) };
        entry.settings.remove(setting_key);
        self.save_entry(plugin_id, &entry).await
    }
}

/// Local ledger of team-default settings the member customized.
///
/// Backed by the `setting_overrides` table; follows the read-state pattern
/// (local-only, per-user).
#[derive(Clone)]
pub struct OverrideTracker {
    conn: Connection,
}

impl OverrideTracker {
    pub fn new(conn: Connection) -> Self {
        OverrideTracker { conn }
    }

    pub async fn is_overridden(
        &self,
        plugin_id: &str,
        setting_key: &str,
    ) -> Result<bool, StoreError> {
        let plugin_id = plugin_id.to_owned();
        let setting_key = setting_key.to_owned();
        let count: i64 = self
            .conn
            .call(move |db| {
                let count = db.query_row(
                    "SELECT COUNT(*) FROM setting_overrides
                     WHERE plugin_id = ?1 AND setting_key = ?2",
                    rusqlite::params![&plugin_id, &setting_key],
                    |r| r.get(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(count > 0)
    }

    pub async fn mark_overridden(
        &self,
        plugin_id: &str,
        setting_key: &str,
    ) -> Result<(), StoreError> {
        let plugin_id = plugin_id.to_owned();
        let setting_key = setting_key.to_owned();
        self.conn
            .call(move |db| {
                db.execute(
                    "INSERT OR IGNORE INTO setting_overrides (plugin_id, setting_key)
                     VALUES (?1, ?2)",
                    rusqlite::params![&plugin_id, &setting_key],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn clear_override(
        &self,
        plugin_id: &str,
        setting_key: &str,
    ) -> Result<(), StoreError> {
        let plugin_id = plugin_id.to_owned();
        let setting_key = setting_key.to_owned();
        self.conn
            .call(move |db| {
                db.execute(
                    "DELETE FROM setting_overrides WHERE plugin_id = ?1 AND setting_key = ?2",
                    rusqlite::params![&plugin_id, &setting_key],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn overrides(&self, plugin_id: &str) -> Result<Vec<String>, StoreError> {
        let plugin_id = plugin_id.to_owned();
        let keys = self
            .conn
            .call(move |db| {
                let mut stmt = db.prepare(
                    "SELECT setting_key FROM setting_overrides
                     WHERE plugin_id = ?1 ORDER BY setting_key",
                )?;
                let keys = stmt
                    .query_map(rusqlite::params![&plugin_id], |r| r.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                Ok(keys)
            })
            .await?;
        Ok(keys)
    }

    pub async fn clear_all_overrides(&self, plugin_id: &str) -> Result<(), StoreError> {
        let plugin_id = plugin_id.to_owned();
        self.conn
            .call(move |db| {
                db.execute(
                    "DELETE FROM setting_overrides WHERE plugin_id = ?1",
                    rusqlite::params![&plugin_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

/// Result of applying a settings entry to a member's current settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyResult {
    /// The settings map after the pass.
    pub applied: BTreeMap<String, serde_json::Value>,
    /// Keys that were forced by `enforced` mode.
    pub enforced: Vec<String>,
}

/// Applies pushed settings over the member's current values.
pub struct SettingsApplier<'a> {
    overrides: &'a OverrideTracker,
}

impl<'a> SettingsApplier<'a> {
    pub fn new(overrides: &'a OverrideTracker) -> Self {
        SettingsApplier { overrides }
    }

    /// Merges `entry` into `current_settings`: enforced keys always win,
    /// default keys win only when the member has not customized them.
    pub async fn apply(
        &self,
        plugin_id: &str,
        entry: &SettingsEntry,
        current_settings: &BTreeMap<String, serde_json::Value>,
    ) -> Result<ApplyResult, StoreError> {
        let mut applied = current_settings.clone();
        let mut enforced = Vec::new();

        for (key, spec) in &entry.settings {
            match spec.mode {
                SettingMode::Enforced => {
                    applied.insert(key.clone(), spec.value.clone());
                    enforced.push(key.clone());
                }
                SettingMode::Default => {
                    if !self.overrides.is_overridden(plugin_id, key).await? {
                        applied.insert(key.clone(), spec.value.clone());
                    }
                }
            }
        }

        Ok(ApplyResult { applied, enforced })
    }

    /// Records whether a member's edit to one key counts as a customization.
    ///
    /// Setting a default-mode key back to the pushed value clears the
    /// override; setting it to anything else marks one. Keys that are not
    /// default-mode pushed settings are ignored.
    pub async fn detect_customization(
        &self,
        plugin_id: &str,
        entry: &SettingsEntry,
        setting_key: &str,
        new_value: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let Some(spec) = entry.settings.get(setting_key) else { return Ok(()) };
        if spec.mode != SettingMode::Default {
            return Ok(());
        }
        if *new_value == spec.value {
            self.overrides.clear_override(plugin_id, setting_key).await
        } else {
            self.overrides.mark_overridden(plugin_id, setting_key).await
        }
    }
}
