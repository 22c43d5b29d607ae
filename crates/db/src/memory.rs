//! In-process [`DocumentStore`] with optional JSON snapshots.
//!
//! Used by the test suites and by the CLI when no `DATABASE_URL` is set.
//! A snapshot file lets consecutive CLI runs share state.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use storefront_core::EntityKind;
use tokio::sync::RwLock;

use crate::document::{doc_id, natural_key, Document};
use crate::error::{StoreError, StoreResult};
use crate::link::LinkRecord;
use crate::store::DocumentStore;

#[derive(Debug, Default, Serialize, Deserialize)]
struct MemoryState {
    /// Collections keyed by [`EntityKind::as_str`].
    collections: BTreeMap<String, Vec<Document>>,
    links: Vec<LinkRecord>,
}

impl MemoryState {
    fn collection(&self, kind: EntityKind) -> &[Document] {
        self.collections
            .get(kind.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Reject `doc` if another document (other than `except_id`) holds the
    /// same id or natural key.
    fn check_unique(
        &self,
        kind: EntityKind,
        doc: &Document,
        except_id: Option<&str>,
    ) -> StoreResult<()> {
        let id = doc_id(doc)?;
        let key = natural_key(kind, doc);
        for existing in self.collection(kind) {
            let existing_id = doc_id(existing)?;
            if Some(existing_id) == except_id {
                continue;
            }
            if existing_id == id {
                return Err(StoreError::AlreadyExists {
                    kind,
                    key: id.to_string(),
                });
            }
            if let Some(key) = &key {
                if natural_key(kind, existing).as_ref() == Some(key) {
                    return Err(StoreError::AlreadyExists {
                        kind,
                        key: key.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Document store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a snapshot file, or start empty if the file does
    /// not exist yet.
    pub async fn load_snapshot(path: &Path) -> StoreResult<Self> {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let state: MemoryState = serde_json::from_slice(&bytes)?;
                tracing::info!(path = %path.display(), "Loaded store snapshot");
                Ok(Self {
                    state: RwLock::new(state),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No snapshot found, starting empty");
                Ok(Self::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write the current state to `path` as pretty-printed JSON.
    pub async fn save_snapshot(&self, path: &Path) -> StoreResult<()> {
        let bytes = {
            let state = self.state.read().await;
            serde_json::to_vec_pretty(&*state)?
        };
        tokio::fs::write(path, bytes).await?;
        tracing::info!(path = %path.display(), "Saved store snapshot");
        Ok(())
    }

    /// Number of documents of `kind`.
    pub async fn count(&self, kind: EntityKind) -> usize {
        self.state.read().await.collection(kind).len()
    }
}

fn reject_embedded(kind: EntityKind) -> StoreResult<()> {
    if kind.is_embedded() {
        return Err(StoreError::Malformed(format!(
            "{kind} is embedded and has no collection"
        )));
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, kind: EntityKind) -> StoreResult<Vec<Document>> {
        reject_embedded(kind)?;
        Ok(self.state.read().await.collection(kind).to_vec())
    }

    async fn get(&self, kind: EntityKind, id: &str) -> StoreResult<Option<Document>> {
        reject_embedded(kind)?;
        let state = self.state.read().await;
        Ok(state
            .collection(kind)
            .iter()
            .find(|doc| doc_id(doc).ok() == Some(id))
            .cloned())
    }

    async fn insert(&self, kind: EntityKind, doc: Document) -> StoreResult<Document> {
        reject_embedded(kind)?;
        let mut state = self.state.write().await;
        state.check_unique(kind, &doc, None)?;
        state
            .collections
            .entry(kind.as_str().to_string())
            .or_default()
            .push(doc.clone());
        Ok(doc)
    }

    async fn replace(&self, kind: EntityKind, doc: Document) -> StoreResult<Document> {
        reject_embedded(kind)?;
        let id = doc_id(&doc)?.to_string();
        let mut state = self.state.write().await;
        state.check_unique(kind, &doc, Some(&id))?;
        let slot = state
            .collections
            .get_mut(kind.as_str())
            .and_then(|docs| docs.iter_mut().find(|d| doc_id(d).ok() == Some(id.as_str())))
            .ok_or_else(|| StoreError::NotFound {
                kind,
                id: id.clone(),
            })?;
        *slot = doc.clone();
        Ok(doc)
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> StoreResult<bool> {
        reject_embedded(kind)?;
        let mut state = self.state.write().await;
        let Some(docs) = state.collections.get_mut(kind.as_str()) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| doc_id(d).ok() != Some(id));
        Ok(docs.len() != before)
    }

    async fn position(&self, kind: EntityKind, id: &str) -> StoreResult<Option<i64>> {
        reject_embedded(kind)?;
        let state = self.state.read().await;
        Ok(state
            .collection(kind)
            .iter()
            .position(|doc| doc_id(doc).ok() == Some(id))
            .map(|index| index as i64))
    }

    async fn restore(&self, kind: EntityKind, doc: Document, position: i64) -> StoreResult<Document> {
        reject_embedded(kind)?;
        let mut state = self.state.write().await;
        state.check_unique(kind, &doc, None)?;
        let docs = state.collections.entry(kind.as_str().to_string()).or_default();
        let index = usize::try_from(position).unwrap_or(0).min(docs.len());
        docs.insert(index, doc.clone());
        Ok(doc)
    }

    async fn insert_link(&self, link: &LinkRecord) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.links.contains(link) {
            return Err(StoreError::DuplicateLink(link.composite_key()));
        }
        state.links.push(link.clone());
        Ok(())
    }

    async fn list_links(&self) -> StoreResult<Vec<LinkRecord>> {
        Ok(self.state.read().await.links.clone())
    }

    async fn delete_link(&self, link: &LinkRecord) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let before = state.links.len();
        state.links.retain(|l| l != link);
        Ok(state.links.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::document::into_document;
    use crate::link::LinkSide;

    fn doc(value: serde_json::Value) -> Document {
        into_document(value).unwrap()
    }

    #[tokio::test]
    async fn insert_preserves_order() {
        let store = MemoryStore::new();
        for name in ["b", "a", "c"] {
            store
                .insert(
                    EntityKind::SalesChannel,
                    doc(json!({"id": format!("sc_{name}"), "name": name})),
                )
                .await
                .unwrap();
        }
        let names: Vec<_> = store
            .list(EntityKind::SalesChannel)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[tokio::test]
    async fn restore_returns_document_to_its_slot() {
        let store = MemoryStore::new();
        for name in ["a", "b", "c"] {
            store
                .insert(
                    EntityKind::StockLocation,
                    doc(json!({"id": format!("sloc_{name}"), "name": name})),
                )
                .await
                .unwrap();
        }
        let removed = store.get(EntityKind::StockLocation, "sloc_a").await.unwrap().unwrap();
        let position = store.position(EntityKind::StockLocation, "sloc_a").await.unwrap();
        assert_eq!(position, Some(0));
        assert!(store.delete(EntityKind::StockLocation, "sloc_a").await.unwrap());
        assert_eq!(store.position(EntityKind::StockLocation, "sloc_a").await.unwrap(), None);

        store
            .restore(EntityKind::StockLocation, removed, 0)
            .await
            .unwrap();
        let ids: Vec<_> = store
            .list(EntityKind::StockLocation)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, ["sloc_a", "sloc_b", "sloc_c"]);
    }

    #[tokio::test]
    async fn duplicate_natural_key_is_rejected() {
        let store = MemoryStore::new();
        store
            .insert(EntityKind::Region, doc(json!({"id": "reg_1", "name": "Pakistan"})))
            .await
            .unwrap();
        let err = store
            .insert(EntityKind::Region, doc(json!({"id": "reg_2", "name": "Pakistan"})))
            .await
            .unwrap_err();
        assert_matches!(err, StoreError::AlreadyExists { kind: EntityKind::Region, ref key } if key == "Pakistan");
        assert_eq!(store.count(EntityKind::Region).await, 1);
    }

    #[tokio::test]
    async fn stock_locations_may_share_names() {
        let store = MemoryStore::new();
        for id in ["sloc_1", "sloc_2"] {
            store
                .insert(
                    EntityKind::StockLocation,
                    doc(json!({"id": id, "name": "European Warehouse"})),
                )
                .await
                .unwrap();
        }
        assert_eq!(store.count(EntityKind::StockLocation).await, 2);
    }

    #[tokio::test]
    async fn replace_requires_existing_document() {
        let store = MemoryStore::new();
        let err = store
            .replace(EntityKind::Store, doc(json!({"id": "store_1", "name": "Shop"})))
            .await
            .unwrap_err();
        assert_matches!(err, StoreError::NotFound { .. });
    }

    #[tokio::test]
    async fn replace_may_keep_its_own_key() {
        let store = MemoryStore::new();
        store
            .insert(EntityKind::Region, doc(json!({"id": "reg_1", "name": "Pakistan"})))
            .await
            .unwrap();
        store
            .replace(
                EntityKind::Region,
                doc(json!({"id": "reg_1", "name": "Pakistan", "currency_code": "pkr"})),
            )
            .await
            .unwrap();
        let region = store.get(EntityKind::Region, "reg_1").await.unwrap().unwrap();
        assert_eq!(region["currency_code"], "pkr");
    }

    #[tokio::test]
    async fn embedded_kinds_have_no_collection() {
        let store = MemoryStore::new();
        assert_matches!(
            store.list(EntityKind::ProductVariant).await,
            Err(StoreError::Malformed(_))
        );
    }

    #[tokio::test]
    async fn duplicate_links_are_rejected() {
        let store = MemoryStore::new();
        let link = LinkRecord::new(LinkSide::api_key("apk_1"), LinkSide::sales_channel("sc_1"));
        store.insert_link(&link).await.unwrap();
        assert_matches!(
            store.insert_link(&link).await,
            Err(StoreError::DuplicateLink(_))
        );
        assert!(store.delete_link(&link).await.unwrap());
        assert!(store.list_links().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn snapshot_round_trip_keeps_documents_and_links() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = MemoryStore::new();
        store
            .insert(EntityKind::Region, doc(json!({"id": "reg_1", "name": "Pakistan"})))
            .await
            .unwrap();
        store
            .insert_link(&LinkRecord::new(
                LinkSide::api_key("apk_1"),
                LinkSide::sales_channel("sc_1"),
            ))
            .await
            .unwrap();
        store.save_snapshot(&path).await.unwrap();

        let loaded = MemoryStore::load_snapshot(&path).await.unwrap();
        assert_eq!(loaded.count(EntityKind::Region).await, 1);
        assert_eq!(loaded.list_links().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_snapshot_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::load_snapshot(&dir.path().join("absent.json"))
            .await
            .unwrap();
        assert_eq!(store.count(EntityKind::Region).await, 0);
    }
}
