//! Annotation records: CRUD plus the relocation refresh cycle.
//!
//! Annotations are JSON documents in the shared store under the
//! `team:annotation:` prefix, so they replicate like any other document.
//! Queries are linear scans over the prefix listing filtered by predicate —
//! fine at this scale, and exactly how the store's key-ordered listing is
//! meant to be used.

use std::collections::HashMap;

use crate::anchor;
use crate::db::now_millis;
use crate::error::StoreError;
use crate::store::{DocWrite, DocumentStore, PutResult, StoredDoc};
use crate::types::{
    AnchorContext, AnchorRange, Annotation, CreateAnnotation, RenderAnnotation,
    ANNOTATION_PREFIX,
};

/// Fields that may be changed after creation. Everything else — author,
/// file path, timestamp, thread parent — is immutable once stored.
#[derive(Debug, Clone, Default)]
pub struct AnnotationPatch {
    pub content: Option<String>,
    pub mentions: Option<Vec<String>>,
    pub range: Option<AnchorRange>,
    pub context_before: Option<String>,
    pub context_after: Option<String>,
    pub selected_text: Option<String>,
}

/// Store facade for annotation records over any [`DocumentStore`].
pub struct AnnotationStore<S> {
    store: S,
}

impl<S: DocumentStore> AnnotationStore<S> {
    pub fn new(store: S) -> Self {
        AnnotationStore { store }
    }

    /// New annotation id: prefix + fixed-width base36 millisecond timestamp
    /// + random suffix. The timestamp prefix makes ids sort roughly by
    /// creation time; the suffix makes collisions vanishingly unlikely.
    fn generate_id() -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("{ANNOTATION_PREFIX}{}-{}", base36(now_millis() as u64), &suffix[..6])
    }

    /// Creates and persists a new annotation.
    ///
    /// Assigns the id and creation timestamp and sets `resolved = false`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` only if the generated id already
    /// exists (practically impossible), otherwise backend errors.
    pub async fn create(&self, input: CreateAnnotation) -> Result<Annotation, StoreError> {
        let annotation = Annotation {
            id: Self::generate_id(),
            file_path: input.file_path,
            range: input.range,
            context_before: input.context_before,
            context_after: input.context_after,
            selected_text: input.selected_text,
            content: input.content,
            author: input.author.clone(),
            mentions: input.mentions,
            timestamp: now_millis() / 1000,
            resolved: false,
            parent_id: input.parent_id,
        };
        let write = DocWrite {
            id: annotation.id.clone(),
            expected_rev: None,
            body: serde_json::to_string(&annotation)?,
            modified_by: input.author,
        };
        match self.store.put(write).await? {
            PutResult::Stored { .. } => Ok(annotation),
            PutResult::Conflict => Err(StoreError::Conflict),
        }
    }

    /// Fetches one annotation by id. `Ok(None)` when absent or unreadable.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Annotation>, StoreError> {
        let doc = self.store.fetch(id, None).await?;
        Ok(doc.as_ref().and_then(decode))
    }

    /// All annotations (top-level and replies) for one file path.
    pub async fn get_by_file(&self, file_path: &str) -> Result<Vec<Annotation>, StoreError> {
        Ok(self.load_all().await?.into_iter().filter(|a| a.file_path == file_path).collect())
    }

    /// All annotations mentioning `username`.
    pub async fn get_by_mention(&self, username: &str) -> Result<Vec<Annotation>, StoreError> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .filter(|a| a.mentions.iter().any(|m| m == username))
            .collect())
    }

    /// All replies referencing `parent_id`. A dangling parent id simply
    /// yields an empty list.
    pub async fn get_replies(&self, parent_id: &str) -> Result<Vec<Annotation>, StoreError> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .filter(|a| a.parent_id.as_deref() == Some(parent_id))
            .collect())
    }

    /// Merges the patch fields into the stored record.
    ///
    /// Returns `Ok(false)` when the id does not exist or the write lost an
    /// optimistic-concurrency race; no retry is attempted.
    pub async fn update(&self, id: &str, patch: AnnotationPatch) -> Result<bool, StoreError> {
        let Some(doc) = self.store.fetch(id, None).await? else { return Ok(false) };
        let Some(mut annotation) = decode(&doc) else { return Ok(false) };

        if let Some(content) = patch.content {
            annotation.content = content;
        }
        if let Some(mentions) = patch.mentions {
            annotation.mentions = mentions;
        }
        if let Some(range) = patch.range {
            annotation.range = range;
        }
        if let Some(context_before) = patch.context_before {
            annotation.context_before = context_before;
        }
        if let Some(context_after) = patch.context_after {
            annotation.context_after = context_after;
        }
        if let Some(selected_text) = patch.selected_text {
            annotation.selected_text = selected_text;
        }

        self.put_back(&doc, &annotation).await
    }

    /// Sets `resolved = true`. Idempotent; the flag never reverts.
    ///
    /// Returns `Ok(false)` when the id does not exist or the write conflicts.
    pub async fn resolve(&self, id: &str) -> Result<bool, StoreError> {
        let Some(doc) = self.store.fetch(id, None).await? else { return Ok(false) };
        let Some(mut annotation) = decode(&doc) else { return Ok(false) };
        annotation.resolved = true;
        self.put_back(&doc, &annotation).await
    }

    /// The relocation refresh cycle for one open file.
    ///
    /// Loads the file's top-level annotations (replies are counted, not
    /// anchored), relocates each against `current_text`, and falls back to
    /// the stored range when the anchor misses. An annotation is never
    /// dropped because relocation failed — it degrades to its stale
    /// position. Results are in id order (creation order, by construction).
    pub async fn refresh_for_file(
        &self,
        file_path: &str,
        current_text: &str,
    ) -> Result<Vec<RenderAnnotation>, StoreError> {
        let all = self.load_all().await?;

        let mut reply_counts: HashMap<&str, usize> = HashMap::new();
        for annotation in &all {
            if let Some(parent) = annotation.parent_id.as_deref() {
                *reply_counts.entry(parent).or_default() += 1;
            }
        }

        let mut rendered = Vec::new();
        for annotation in &all {
            if annotation.parent_id.is_some() || annotation.file_path != file_path {
                continue;
            }
            let context = AnchorContext {
                selected_text: annotation.selected_text.clone(),
                context_before: annotation.context_before.clone(),
                context_after: annotation.context_after.clone(),
                original_range: annotation.range,
            };
            let range =
                anchor::find_anchor(current_text, &context).unwrap_or(annotation.range);
            rendered.push(RenderAnnotation {
                id: annotation.id.clone(),
                range,
                content: annotation.content.clone(),
                author: annotation.author.clone(),
                resolved: annotation.resolved,
                reply_count: reply_counts.get(annotation.id.as_str()).copied().unwrap_or(0),
            });
        }
        Ok(rendered)
    }

    async fn load_all(&self) -> Result<Vec<Annotation>, StoreError> {
        let docs = self.store.list_by_prefix(ANNOTATION_PREFIX).await?;
        Ok(docs.iter().filter_map(decode).collect())
    }

    async fn put_back(&self, doc: &StoredDoc, annotation: &Annotation) -> Result<bool, StoreError> {
        let write = DocWrite {
            id: doc.id.clone(),
            expected_rev: Some(doc.rev.clone()),
            body: serde_json::to_string(annotation)?,
            modified_by: doc.modified_by.clone(),
        };
        Ok(matches!(self.store.put(write).await?, PutResult::Stored { .. }))
    }
}

/// Decodes a stored document body, skipping malformed records — one bad
/// annotation must not take down a whole listing.
fn decode(doc: &StoredDoc) -> Option<Annotation> {
    match serde_json::from_str(&doc.body) {
        Ok(annotation) => Some(annotation),
        Err(e) => {
            tracing::warn!(id = %doc.id, error = %e, "skipping malformed annotation record");
            None
        }
    }
}

/// Fixed-width (9 digit) base36 rendering, zero-padded so that ids sort
/// lexicographically by timestamp. Nine digits cover millisecond timestamps
/// until well past year 5000.
fn base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut buf = [b'0'; 9];
    let mut i = buf.len();
    while n > 0 && i > 0 {
        i -= 1;
        buf[i] = DIGITS[(n % 36) as usize];
        n /= 36;
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::CreateAnnotation;

    fn sample_input(path: &str, parent: Option<String>) -> CreateAnnotation {
        CreateAnnotation {
            file_path: path.to_owned(),
            range: AnchorRange { start_line: 0, start_char: 10, end_line: 0, end_char: 19 },
            context_before: "The quick ".to_owned(),
            context_after: " jumps over the lazy dog".to_owned(),
            selected_text: "brown fox".to_owned(),
            content: "nice fox".to_owned(),
            author: "alice".to_owned(),
            mentions: vec!["bob".to_owned()],
            parent_id: parent,
        }
    }

    #[test]
    fn base36_is_fixed_width_and_ordered() {
        let early = base36(1_700_000_000_000);
        let late = base36(1_800_000_000_000);
        assert_eq!(early.len(), 9);
        assert_eq!(late.len(), 9);
        assert!(early < late);
    }

    #[tokio::test]
    async fn create_assigns_identity_and_defaults() {
        let store = AnnotationStore::new(MemoryStore::new());
        let created = store.create(sample_input("notes/a.md", None)).await.unwrap();
        assert!(created.id.starts_with(ANNOTATION_PREFIX));
        assert!(!created.resolved);
        assert!(created.timestamp > 0);

        let loaded = store.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(loaded, created);
    }

    #[tokio::test]
    async fn file_mention_and_reply_queries_filter() {
        let store = AnnotationStore::new(MemoryStore::new());
        let top = store.create(sample_input("notes/a.md", None)).await.unwrap();
        store.create(sample_input("notes/b.md", None)).await.unwrap();
        let mut reply = sample_input("notes/a.md", Some(top.id.clone()));
        reply.mentions = vec!["carol".to_owned()];
        store.create(reply).await.unwrap();

        assert_eq!(store.get_by_file("notes/a.md").await.unwrap().len(), 2);
        assert_eq!(store.get_by_mention("bob").await.unwrap().len(), 2);
        assert_eq!(store.get_by_mention("carol").await.unwrap().len(), 1);
        assert_eq!(store.get_replies(&top.id).await.unwrap().len(), 1);
        assert!(store.get_replies("team:annotation:missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_merges_allowed_fields_only() {
        let store = AnnotationStore::new(MemoryStore::new());
        let created = store.create(sample_input("notes/a.md", None)).await.unwrap();

        let ok = store
            .update(
                &created.id,
                AnnotationPatch {
                    content: Some("sharper fox".to_owned()),
                    mentions: Some(vec![]),
                    ..AnnotationPatch::default()
                },
            )
            .await
            .unwrap();
        assert!(ok);

        let loaded = store.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(loaded.content, "sharper fox");
        assert!(loaded.mentions.is_empty());
        assert_eq!(loaded.author, created.author);
        assert_eq!(loaded.timestamp, created.timestamp);
    }

    #[tokio::test]
    async fn update_missing_id_reports_failure() {
        let store = AnnotationStore::new(MemoryStore::new());
        let ok = store
            .update("team:annotation:nope", AnnotationPatch::default())
            .await
            .unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn resolve_is_idempotent_and_monotonic() {
        let store = AnnotationStore::new(MemoryStore::new());
        let created = store.create(sample_input("notes/a.md", None)).await.unwrap();

        assert!(store.resolve(&created.id).await.unwrap());
        assert!(store.resolve(&created.id).await.unwrap());
        assert!(store.get_by_id(&created.id).await.unwrap().unwrap().resolved);
        assert!(!store.resolve("team:annotation:nope").await.unwrap());
    }

    #[tokio::test]
    async fn refresh_relocates_and_counts_replies() {
        let store = AnnotationStore::new(MemoryStore::new());
        let top = store.create(sample_input("notes/a.md", None)).await.unwrap();
        store.create(sample_input("notes/a.md", Some(top.id.clone()))).await.unwrap();

        // The document gained a prefix; the anchor must follow the text.
        let edited = "PREFIX The quick brown fox jumps over the lazy dog";
        let rendered = store.refresh_for_file("notes/a.md", edited).await.unwrap();
        assert_eq!(rendered.len(), 1, "replies are not rendered inline");
        assert_eq!(rendered[0].reply_count, 1);
        assert_eq!(
            rendered[0].range,
            AnchorRange { start_line: 0, start_char: 17, end_line: 0, end_char: 26 }
        );
    }

    #[tokio::test]
    async fn refresh_falls_back_to_stored_range_when_orphaned() {
        let store = AnnotationStore::new(MemoryStore::new());
        let created = store.create(sample_input("notes/a.md", None)).await.unwrap();

        let rendered = store
            .refresh_for_file("notes/a.md", "entirely different content now")
            .await
            .unwrap();
        assert_eq!(rendered.len(), 1, "orphaned annotations stay visible");
        assert_eq!(rendered[0].range, created.range);
    }
}
