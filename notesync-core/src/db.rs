//! SQLite plumbing for the local replica.
//!
//! One WAL-mode database file holds the replicated document set (`docs` +
//! `doc_history`) and the local-only ledgers (`read_state`,
//! `setting_overrides`). [`open_db`] is the single entry point for all
//! connections; [`SqliteDocStore`] is the [`DocumentStore`] implementation
//! over that file.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::error::StoreError;
use crate::store::{parse_generation, DocWrite, DocumentStore, PutResult, StoredDoc};

/// Opens (or creates) the SQLite database at `path`, configures WAL mode,
/// and applies schema migrations via the `schema_version` table.
///
/// This function is the single entry point for all database connections.
/// It sets `busy_timeout` via the `Connection` method (not a PRAGMA string)
/// so the setting takes effect regardless of pragma caching.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the file cannot be opened, WAL
/// configuration fails, or schema DDL fails.
pub async fn open_db(path: &str) -> Result<Connection, tokio_rusqlite::Error> {
    let conn = Connection::open(path).await?;

    // Connection-level WAL pragmas, re-applied on every open.
    conn.call(|db| {
        db.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
        db.busy_timeout(Duration::from_secs(5))?;
        Ok(())
    })
    .await?;

    // Checkpoint any leftover WAL from a previous run.
    conn.call(|db| {
        db.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    })
    .await?;

    // Apply schema migrations via the schema_version versioning system.
    conn.call(|db| {
        crate::schema::migrate(db)?;
        Ok(())
    })
    .await?;

    Ok(conn)
}

/// Returns the current Unix timestamp in seconds.
pub(crate) fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Returns the current Unix timestamp in milliseconds.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Generates the revision token for a new write: generation counter
/// incremented from the parent revision, plus a random suffix.
fn new_rev(parent: Option<&str>) -> String {
    let generation = parent.map(parse_generation).unwrap_or(0) + 1;
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{generation}-{}", &suffix[..8])
}

/// Smallest string strictly greater than every string with this prefix,
/// for half-open range scans over the id column. `None` when no bound
/// exists (empty prefix, or a prefix of only `char::MAX`).
fn prefix_upper_bound(prefix: &str) -> Option<String> {
    let mut chars: Vec<char> = prefix.chars().collect();
    while let Some(last) = chars.pop() {
        if let Some(bumped) = char::from_u32(last as u32 + 1) {
            chars.push(bumped);
            return Some(chars.into_iter().collect());
        }
    }
    None
}

fn row_to_doc(r: &rusqlite::Row<'_>) -> rusqlite::Result<StoredDoc> {
    Ok(StoredDoc {
        id: r.get(0)?,
        rev: r.get(1)?,
        body: r.get(2)?,
        modified_by: r.get(3)?,
        updated_at: r.get(4)?,
    })
}

/// [`DocumentStore`] backed by the local SQLite replica.
///
/// Cheap to clone — wraps the shared [`Connection`] handle. Every write
/// records the revision in `doc_history`, so any revision ever stored
/// locally remains fetchable for diffing.
#[derive(Clone)]
pub struct SqliteDocStore {
    conn: Connection,
}

impl SqliteDocStore {
    pub fn new(conn: Connection) -> Self {
        SqliteDocStore { conn }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocStore {
    async fn fetch(&self, id: &str, rev: Option<&str>) -> Result<Option<StoredDoc>, StoreError> {
        let id = id.to_owned();
        let rev = rev.map(str::to_owned);
        let doc = self
            .conn
            .call(move |db| {
                let doc = match rev {
                    Some(rev) => db
                        .query_row(
                            "SELECT id, rev, body, modified_by, saved_at
                             FROM doc_history WHERE id = ?1 AND rev = ?2",
                            rusqlite::params![&id, &rev],
                            row_to_doc,
                        )
                        .optional()?,
                    None => db
                        .query_row(
                            "SELECT id, rev, body, modified_by, updated_at
                             FROM docs WHERE id = ?1",
                            rusqlite::params![&id],
                            row_to_doc,
                        )
                        .optional()?,
                };
                Ok(doc)
            })
            .await?;
        Ok(doc)
    }

    async fn put(&self, write: DocWrite) -> Result<PutResult, StoreError> {
        let result = self
            .conn
            .call(move |db| {
                let now = now_secs();
                let tx =
                    db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
                let current: Option<String> = tx
                    .query_row(
                        "SELECT rev FROM docs WHERE id = ?1",
                        rusqlite::params![&write.id],
                        |r| r.get(0),
                    )
                    .optional()?;

                // Optimistic concurrency: the expected revision must match the
                // stored one exactly (both absent counts as a match for create).
                let rev = match (&write.expected_rev, &current) {
                    (None, None) => new_rev(None),
                    (Some(expected), Some(current)) if expected == current => {
                        new_rev(Some(current))
                    }
                    _ => return Ok(PutResult::Conflict),
                };

                tx.execute(
                    "INSERT INTO docs (id, rev, body, modified_by, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(id)
                     DO UPDATE SET rev = excluded.rev,
                                   body = excluded.body,
                                   modified_by = excluded.modified_by,
                                   updated_at = excluded.updated_at",
                    rusqlite::params![&write.id, &rev, &write.body, &write.modified_by, now],
                )?;
                tx.execute(
                    "INSERT OR REPLACE INTO doc_history (id, rev, body, modified_by, saved_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![&write.id, &rev, &write.body, &write.modified_by, now],
                )?;
                tx.commit()?;
                Ok(PutResult::Stored { rev })
            })
            .await?;
        Ok(result)
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<StoredDoc>, StoreError> {
        let prefix = prefix.to_owned();
        let docs = self
            .conn
            .call(move |db| {
                let docs = match prefix_upper_bound(&prefix) {
                    Some(upper) => {
                        let mut stmt = db.prepare(
                            "SELECT id, rev, body, modified_by, updated_at
                             FROM docs WHERE id >= ?1 AND id < ?2 ORDER BY id",
                        )?;
                        let rows = stmt
                            .query_map(rusqlite::params![&prefix, &upper], row_to_doc)?
                            .collect::<rusqlite::Result<Vec<_>>>()?;
                        rows
                    }
                    None => {
                        let mut stmt = db.prepare(
                            "SELECT id, rev, body, modified_by, updated_at
                             FROM docs ORDER BY id",
                        )?;
                        let rows = stmt
                            .query_map([], row_to_doc)?
                            .collect::<rusqlite::Result<Vec<_>>>()?;
                        rows
                    }
                };
                Ok(docs)
            })
            .await?;
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_generations_increment() {
        let first = new_rev(None);
        assert!(first.starts_with("1-"));
        let second = new_rev(Some(&first));
        assert!(second.starts_with("2-"));
        assert_ne!(first, second);
    }

    #[test]
    fn prefix_bound_bumps_final_character() {
        assert_eq!(prefix_upper_bound("team:annotation:").as_deref(), Some("team:annotation;"));
        assert_eq!(prefix_upper_bound("").as_deref(), None);
    }
}
