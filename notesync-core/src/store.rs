//! The revisioned document store contract.
//!
//! The shared store is an external collaborator: a key-value store where
//! each document carries an opaque revision token, supporting fetch (current
//! or by revision), optimistic put, and prefix listing. This module defines
//! the trait the core programs against, plus an in-memory implementation
//! used throughout the test suites. The SQLite-backed replica adapter lives
//! in [`crate::db`].

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;

/// A document as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDoc {
    pub id: String,
    /// Opaque revision token. Compared only for equality.
    pub rev: String,
    /// Raw body: note text for plain documents, JSON for typed records.
    pub body: String,
    /// Username that produced this revision, when the feed knows it.
    pub modified_by: String,
    /// Unix timestamp (seconds) of the revision.
    pub updated_at: i64,
}

/// A write request. `expected_rev` is `None` when creating a document and
/// must match the store's current revision when updating one.
#[derive(Debug, Clone)]
pub struct DocWrite {
    pub id: String,
    pub expected_rev: Option<String>,
    pub body: String,
    pub modified_by: String,
}

/// Outcome of an optimistic put.
///
/// A conflict is an expected outcome, not an error: the write lost a race
/// against a concurrent revision and the caller decides whether to refetch.
/// No retry happens inside the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutResult {
    Stored { rev: String },
    Conflict,
}

/// Interface to the revisioned document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches a document by id: the current revision when `rev` is `None`,
    /// or a specific historical revision. `Ok(None)` means absent — the
    /// store's own not-found condition is translated here, never propagated
    /// as an error.
    async fn fetch(&self, id: &str, rev: Option<&str>) -> Result<Option<StoredDoc>, StoreError>;

    /// Writes a document with optimistic concurrency control.
    async fn put(&self, write: DocWrite) -> Result<PutResult, StoreError>;

    /// Lists all current documents whose id starts with `prefix`, in id order.
    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<StoredDoc>, StoreError>;
}

/// In-memory `DocumentStore` keeping full revision history per document.
///
/// Intended for tests and examples; revisions are `{generation}-mem{n}` and
/// timestamps come from a logical counter so runs are deterministic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    /// id -> all revisions, oldest first; the last entry is current.
    docs: BTreeMap<String, Vec<StoredDoc>>,
    clock: i64,
    rev_counter: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch(&self, id: &str, rev: Option<&str>) -> Result<Option<StoredDoc>, StoreError> {
        let inner = self.inner.lock().expect("memory store poisoned");
        let revisions = match inner.docs.get(id) {
            Some(revisions) => revisions,
            None => return Ok(None),
        };
        Ok(match rev {
            Some(rev) => revisions.iter().find(|d| d.rev == rev).cloned(),
            None => revisions.last().cloned(),
        })
    }

    async fn put(&self, write: DocWrite) -> Result<PutResult, StoreError> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        let current_rev = inner.docs.get(&write.id).and_then(|r| r.last()).map(|d| d.rev.clone());

        let generation = match (&write.expected_rev, &current_rev) {
            (None, None) => 1,
            (Some(expected), Some(current)) if expected == current => {
                parse_generation(current) + 1
            }
            _ => return Ok(PutResult::Conflict),
        };

        inner.clock += 1;
        inner.rev_counter += 1;
        let rev = format!("{generation}-mem{}", inner.rev_counter);
        let doc = StoredDoc {
            id: write.id.clone(),
            rev: rev.clone(),
            body: write.body,
            modified_by: write.modified_by,
            updated_at: inner.clock,
        };
        inner.docs.entry(write.id).or_default().push(doc);
        Ok(PutResult::Stored { rev })
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<StoredDoc>, StoreError> {
        let inner = self.inner.lock().expect("memory store poisoned");
        Ok(inner
            .docs
            .iter()
            .filter(|(id, _)| id.starts_with(prefix))
            .filter_map(|(_, revisions)| revisions.last().cloned())
            .collect())
    }
}

/// Extracts the numeric generation from a `{generation}-{suffix}` revision
/// token. Unparseable tokens count as generation zero.
pub fn parse_generation(rev: &str) -> u64 {
    rev.split('-').next().and_then(|n| n.parse().ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_fetch_update_round_trip() {
        let store = MemoryStore::new();
        let result = store
            .put(DocWrite {
                id: "notes/a.md".into(),
                expected_rev: None,
                body: "v1".into(),
                modified_by: "alice".into(),
            })
            .await
            .unwrap();
        let PutResult::Stored { rev: rev1 } = result else { panic!("create conflicted") };

        let doc = store.fetch("notes/a.md", None).await.unwrap().unwrap();
        assert_eq!(doc.body, "v1");
        assert_eq!(doc.rev, rev1);

        let result = store
            .put(DocWrite {
                id: "notes/a.md".into(),
                expected_rev: Some(rev1.clone()),
                body: "v2".into(),
                modified_by: "bob".into(),
            })
            .await
            .unwrap();
        let PutResult::Stored { rev: rev2 } = result else { panic!("update conflicted") };
        assert_ne!(rev1, rev2);

        // Both revisions stay fetchable.
        assert_eq!(store.fetch("notes/a.md", Some(&rev1)).await.unwrap().unwrap().body, "v1");
        assert_eq!(store.fetch("notes/a.md", None).await.unwrap().unwrap().body, "v2");
    }

    #[tokio::test]
    async fn stale_revision_conflicts() {
        let store = MemoryStore::new();
        let PutResult::Stored { rev } = store
            .put(DocWrite {
                id: "doc".into(),
                expected_rev: None,
                body: "v1".into(),
                modified_by: "alice".into(),
            })
            .await
            .unwrap()
        else {
            panic!()
        };
        store
            .put(DocWrite {
                id: "doc".into(),
                expected_rev: Some(rev.clone()),
                body: "v2".into(),
                modified_by: "bob".into(),
            })
            .await
            .unwrap();

        // A second writer holding the old revision loses.
        let result = store
            .put(DocWrite {
                id: "doc".into(),
                expected_rev: Some(rev),
                body: "v2-conflicting".into(),
                modified_by: "carol".into(),
            })
            .await
            .unwrap();
        assert_eq!(result, PutResult::Conflict);
    }

    #[tokio::test]
    async fn create_over_existing_conflicts() {
        let store = MemoryStore::new();
        store
            .put(DocWrite {
                id: "doc".into(),
                expected_rev: None,
                body: "v1".into(),
                modified_by: "alice".into(),
            })
            .await
            .unwrap();
        let result = store
            .put(DocWrite {
                id: "doc".into(),
                expected_rev: None,
                body: "again".into(),
                modified_by: "bob".into(),
            })
            .await
            .unwrap();
        assert_eq!(result, PutResult::Conflict);
    }

    #[tokio::test]
    async fn prefix_listing_returns_current_revisions_in_order() {
        let store = MemoryStore::new();
        for id in ["team:annotation:b", "team:annotation:a", "team:config", "notes/x.md"] {
            store
                .put(DocWrite {
                    id: id.into(),
                    expected_rev: None,
                    body: "{}".into(),
                    modified_by: "alice".into(),
                })
                .await
                .unwrap();
        }
        let listed = store.list_by_prefix("team:annotation:").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["team:annotation:a", "team:annotation:b"]);
    }
}
