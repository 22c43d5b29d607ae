//! Write-ahead record of one workflow run.
//!
//! Every mutation a workflow performs goes through [`Transaction`], which
//! remembers how to undo it. When the workflow fails the engine calls
//! [`Transaction::compensate`], which reverts the recorded steps newest
//! first, so a failed batch leaves the store as it found it.

use std::sync::Arc;

use serde_json::Value;
use storefront_core::types::generate_id;
use storefront_core::{CoreError, EntityKind};
use storefront_db::document::{doc_id, into_document, str_field, Document};
use storefront_db::{DocumentStore, LinkRecord};
use storefront_events::CommerceEvent;

use crate::error::WorkflowResult;

/// An undoable step.
#[derive(Debug)]
enum Undo {
    Created(EntityKind, String),
    Replaced(EntityKind, Document),
    /// Deleted document with its ordering token, when the store had one.
    Deleted(EntityKind, Document, Option<i64>),
    Linked(LinkRecord),
    Dismissed(LinkRecord),
}

pub struct Transaction {
    store: Arc<dyn DocumentStore>,
    workflow: &'static str,
    undo: Vec<Undo>,
    events: Vec<CommerceEvent>,
}

impl Transaction {
    pub(crate) fn new(store: Arc<dyn DocumentStore>, workflow: &'static str) -> Self {
        Self {
            store,
            workflow,
            undo: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn workflow(&self) -> &'static str {
        self.workflow
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn list(&self, kind: EntityKind) -> WorkflowResult<Vec<Document>> {
        Ok(self.store.list(kind).await?)
    }

    pub async fn get(&self, kind: EntityKind, id: &str) -> WorkflowResult<Option<Document>> {
        Ok(self.store.get(kind, id).await?)
    }

    /// Fetch a document that must exist.
    pub async fn require(&self, kind: EntityKind, id: &str) -> WorkflowResult<Document> {
        self.get(kind, id)
            .await?
            .ok_or_else(|| CoreError::not_found(kind.as_str(), id).into())
    }

    /// First document whose string field `field` equals `value`.
    pub async fn find_by(
        &self,
        kind: EntityKind,
        field: &str,
        value: &str,
    ) -> WorkflowResult<Option<Document>> {
        Ok(self
            .list(kind)
            .await?
            .into_iter()
            .find(|doc| str_field(doc, field) == Some(value)))
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert a new document. An `id` with the kind's prefix is generated
    /// when the value carries none.
    pub async fn insert(&mut self, kind: EntityKind, value: Value) -> WorkflowResult<Document> {
        let mut doc = into_document(value)?;
        if !doc.contains_key("id") {
            doc.insert("id".into(), Value::String(generate_id(kind.id_prefix())));
        }
        let doc = self.store.insert(kind, doc).await?;
        let id = doc_id(&doc)?.to_string();
        self.events
            .push(CommerceEvent::entity(kind, "created", id.clone()));
        self.undo.push(Undo::Created(kind, id));
        Ok(doc)
    }

    /// Replace a stored document wholesale.
    pub async fn replace(&mut self, kind: EntityKind, doc: Document) -> WorkflowResult<Document> {
        let id = doc_id(&doc)?.to_string();
        let original = self.require(kind, &id).await?;
        let doc = self.store.replace(kind, doc).await?;
        self.events
            .push(CommerceEvent::entity(kind, "updated", id));
        self.undo.push(Undo::Replaced(kind, original));
        Ok(doc)
    }

    /// Delete a document. Returns `false` when it was already gone.
    pub async fn delete(&mut self, kind: EntityKind, id: &str) -> WorkflowResult<bool> {
        let Some(original) = self.get(kind, id).await? else {
            return Ok(false);
        };
        let position = self.store.position(kind, id).await?;
        let removed = self.store.delete(kind, id).await?;
        if removed {
            self.events.push(CommerceEvent::entity(kind, "deleted", id));
            self.undo.push(Undo::Deleted(kind, original, position));
        }
        Ok(removed)
    }

    /// Create a link. Emits `link.created` with both sides as payload.
    pub async fn link(&mut self, link: LinkRecord) -> WorkflowResult<LinkRecord> {
        self.store.insert_link(&link).await?;
        self.events
            .push(CommerceEvent::new("link.created").with_payload(link.to_json()));
        self.undo.push(Undo::Linked(link.clone()));
        Ok(link)
    }

    pub async fn dismiss(&mut self, link: LinkRecord) -> WorkflowResult<bool> {
        let removed = self.store.delete_link(&link).await?;
        if removed {
            self.events
                .push(CommerceEvent::new("link.dismissed").with_payload(link.to_json()));
            self.undo.push(Undo::Dismissed(link));
        }
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Completion
    // -----------------------------------------------------------------------

    /// Number of recorded mutations.
    pub fn steps(&self) -> usize {
        self.undo.len()
    }

    pub(crate) fn into_events(self) -> Vec<CommerceEvent> {
        let workflow = self.workflow;
        self.events
            .into_iter()
            .map(|e| e.with_workflow(workflow))
            .collect()
    }

    /// Revert every recorded step, newest first. Failures to undo a step are
    /// logged and do not stop the remaining steps. Returns the number of
    /// steps reverted.
    pub(crate) async fn compensate(self) -> usize {
        let mut reverted = 0;
        for step in self.undo.into_iter().rev() {
            let result = match &step {
                Undo::Created(kind, id) => self.store.delete(*kind, id).await.map(|_| ()),
                Undo::Replaced(kind, doc) => self.store.replace(*kind, doc.clone()).await.map(|_| ()),
                Undo::Deleted(kind, doc, Some(position)) => self
                    .store
                    .restore(*kind, doc.clone(), *position)
                    .await
                    .map(|_| ()),
                Undo::Deleted(kind, doc, None) => self.store.insert(*kind, doc.clone()).await.map(|_| ()),
                Undo::Linked(link) => self.store.delete_link(link).await.map(|_| ()),
                Undo::Dismissed(link) => self.store.insert_link(link).await,
            };
            match result {
                Ok(()) => reverted += 1,
                Err(e) => tracing::warn!(
                    workflow = self.workflow,
                    step = ?step,
                    error = %e,
                    "Compensation step failed"
                ),
            }
        }
        reverted
    }
}
