//! The storage seam every provisioning component talks through.

use async_trait::async_trait;
use storefront_core::EntityKind;

use crate::document::Document;
use crate::error::StoreResult;
use crate::link::LinkRecord;

/// Persistence for entity documents and link records.
///
/// Implementations must:
/// - return documents of a collection in insertion order, with restored
///   documents back in their original place;
/// - reject a second live document sharing an id or natural key with
///   [`StoreError::AlreadyExists`](crate::error::StoreError::AlreadyExists);
/// - reject a duplicate link with
///   [`StoreError::DuplicateLink`](crate::error::StoreError::DuplicateLink);
/// - refuse embedded kinds, which have no collection of their own.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents of `kind`, oldest first.
    async fn list(&self, kind: EntityKind) -> StoreResult<Vec<Document>>;

    async fn get(&self, kind: EntityKind, id: &str) -> StoreResult<Option<Document>>;

    /// Insert a new document. The document must carry its `id`.
    async fn insert(&self, kind: EntityKind, doc: Document) -> StoreResult<Document>;

    /// Replace an existing document wholesale, matched by `id`.
    async fn replace(&self, kind: EntityKind, doc: Document) -> StoreResult<Document>;

    /// Delete a document. Returns whether anything was removed.
    async fn delete(&self, kind: EntityKind, id: &str) -> StoreResult<bool>;

    /// Ordering token of a live document, understood only by
    /// [`DocumentStore::restore`].
    async fn position(&self, kind: EntityKind, id: &str) -> StoreResult<Option<i64>>;

    /// Put a deleted document back where [`DocumentStore::position`] placed
    /// it before the delete, so listing order is unchanged.
    async fn restore(&self, kind: EntityKind, doc: Document, position: i64) -> StoreResult<Document>;

    async fn insert_link(&self, link: &LinkRecord) -> StoreResult<()>;

    /// All links, oldest first.
    async fn list_links(&self) -> StoreResult<Vec<LinkRecord>>;

    async fn delete_link(&self, link: &LinkRecord) -> StoreResult<bool>;
}
