//! Durable per-file read state for the local user.
//!
//! Lives in the local `read_state` table — never replicated; every user
//! keeps their own ledger. A file is unread when no state exists for it or
//! when its current revision differs (string inequality — revision tokens
//! are opaque, not ordered) from the last-seen revision.

use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::db::now_secs;
use crate::error::StoreError;
use crate::types::FileReadState;

/// Handle over the `read_state` table. Cheap to clone.
#[derive(Clone)]
pub struct ReadStateStore {
    conn: Connection,
}

impl ReadStateStore {
    pub fn new(conn: Connection) -> Self {
        ReadStateStore { conn }
    }

    /// Whether `current_rev` is new to the local user.
    ///
    /// Total: a lookup failure degrades to "unknown, assume unread" rather
    /// than surfacing an error — the read path must never block rendering.
    pub async fn is_unread(&self, file_path: &str, current_rev: &str) -> bool {
        match self.get_read_state(file_path).await {
            Ok(Some(state)) => state.last_seen_rev != current_rev,
            Ok(None) => true,
            Err(e) => {
                tracing::warn!(file_path, error = %e, "read-state lookup failed; assuming unread");
                true
            }
        }
    }

    /// Marks `file_path` as read at `rev`, unconditionally overwriting any
    /// prior state for that path.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the upsert transaction fails — write failures
    /// surface, unlike read failures.
    pub async fn mark_as_read(&self, file_path: &str, rev: &str) -> Result<(), StoreError> {
        let file_path = file_path.to_owned();
        let rev = rev.to_owned();
        self.conn
            .call(move |db| {
                let now = now_secs();
                let tx =
                    db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
                tx.execute(
                    "INSERT INTO read_state (file_path, last_seen_rev, last_seen_at)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(file_path)
                     DO UPDATE SET last_seen_rev = excluded.last_seen_rev,
                                   last_seen_at = excluded.last_seen_at",
                    rusqlite::params![&file_path, &rev, now],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Loads the read state for a file. `Ok(None)` means never seen.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    pub async fn get_read_state(
        &self,
        file_path: &str,
    ) -> Result<Option<FileReadState>, StoreError> {
        let file_path = file_path.to_owned();
        let state = self
            .conn
            .call(move |db| {
                let state = db
                    .query_row(
                        "SELECT last_seen_rev, last_seen_at FROM read_state WHERE file_path = ?1",
                        rusqlite::params![&file_path],
                        |r| {
                            Ok(FileReadState {
                                last_seen_rev: r.get(0)?,
                                last_seen_at: r.get(1)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(state)
            })
            .await?;
        Ok(state)
    }

    /// Removes the read state for a file, returning it to "never seen".
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the delete fails.
    pub async fn clear_read_state(&self, file_path: &str) -> Result<(), StoreError> {
        let file_path = file_path.to_owned();
        self.conn
            .call(move |db| {
                db.execute(
                    "DELETE FROM read_state WHERE file_path = ?1",
                    rusqlite::params![&file_path],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}
