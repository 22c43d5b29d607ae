//! Existence guard and workflow invoker shared by the provisioning scripts.
//!
//! Guards read by natural key and short-circuit on a hit. When several
//! records match, the first in store order (the oldest) wins. Creation goes
//! through a workflow closure; a failure that only says the record already
//! exists is logged at info and answered by re-reading, anything else is
//! logged at warn with the error text and swallowed.

use std::future::Future;

use storefront_db::document::{str_field, Document};
use storefront_db::{GraphQuery, LinkRecord, Linker, Query, StoreError};
use storefront_workflows::WorkflowResult;

use crate::error::ScriptResult;

// ---------------------------------------------------------------------------
// Provisioned
// ---------------------------------------------------------------------------

/// Outcome of an existence-guarded creation.
#[derive(Debug, Clone, PartialEq)]
pub enum Provisioned<T> {
    /// Found by the guard; nothing was written.
    Existing(T),
    /// Created by this run.
    Created(T),
    /// Creation failed and no record could be found afterwards.
    Skipped,
}

impl<T> Provisioned<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Existing(v) | Self::Created(v) => Some(v),
            Self::Skipped => None,
        }
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Self::Existing(v) | Self::Created(v) => Some(v),
            Self::Skipped => None,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

/// Return the first record matching `guard`, or create one with `create`.
pub async fn ensure_one<F, Fut>(
    query: &Query,
    guard: &GraphQuery,
    label: &str,
    create: F,
) -> ScriptResult<Provisioned<Document>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = WorkflowResult<Vec<Document>>>,
{
    if let Some(found) = query.graph(guard).await?.into_iter().next() {
        tracing::info!(entity = label, "Already exists, skipping creation");
        return Ok(Provisioned::Existing(found));
    }

    match create().await {
        Ok(created) => match created.into_iter().next() {
            Some(doc) => {
                tracing::info!(entity = label, "Created");
                Ok(Provisioned::Created(doc))
            }
            None => Ok(Provisioned::Skipped),
        },
        Err(e) if e.is_already_exists() => {
            tracing::info!(entity = label, error = %e, "Creation skipped, already exists");
            Ok(query
                .graph(guard)
                .await?
                .into_iter()
                .next()
                .map_or(Provisioned::Skipped, Provisioned::Existing))
        }
        Err(e) => {
            tracing::warn!(entity = label, error = %e, "Creation failed");
            Ok(Provisioned::Skipped)
        }
    }
}

/// Make sure a record exists for every value of `wanted` under `key`.
///
/// `create` receives only the missing values, in `wanted` order. The
/// returned records follow `wanted` order too; values that could not be
/// provisioned are absent.
pub async fn ensure_all<F, Fut>(
    query: &Query,
    guard: &GraphQuery,
    key: &str,
    wanted: &[&str],
    label: &str,
    create: F,
) -> ScriptResult<Vec<Document>>
where
    F: FnOnce(Vec<String>) -> Fut,
    Fut: Future<Output = WorkflowResult<Vec<Document>>>,
{
    let existing = query.graph(guard).await?;
    let missing: Vec<String> = wanted
        .iter()
        .filter(|w| !existing.iter().any(|d| str_field(d, key) == Some(**w)))
        .map(|w| w.to_string())
        .collect();

    if missing.is_empty() {
        tracing::info!(entity = label, count = wanted.len(), "All already exist, skipping creation");
    } else {
        let count = missing.len();
        match create(missing).await {
            Ok(created) => tracing::info!(entity = label, count = created.len(), "Created"),
            Err(e) if e.is_already_exists() => {
                tracing::info!(entity = label, error = %e, "Creation skipped, already exists")
            }
            Err(e) => tracing::warn!(entity = label, count, error = %e, "Creation failed"),
        }
    }

    let all = query.graph(guard).await?;
    Ok(wanted
        .iter()
        .filter_map(|w| all.iter().find(|d| str_field(d, key) == Some(*w)).cloned())
        .collect())
}

/// Run a workflow whose failure must not stop the script.
pub async fn attempt<T, Fut>(label: &str, run: Fut) -> Option<T>
where
    Fut: Future<Output = WorkflowResult<T>>,
{
    match run.await {
        Ok(output) => Some(output),
        Err(e) if e.is_already_exists() => {
            tracing::info!(step = label, error = %e, "Skipped, already exists");
            None
        }
        Err(e) => {
            tracing::warn!(step = label, error = %e, "Step failed");
            None
        }
    }
}

/// Create a link, treating an existing one as success.
pub async fn ensure_link(linker: &Linker, link: LinkRecord) -> ScriptResult<()> {
    match linker.create(link).await {
        Ok(link) => {
            tracing::info!(link = %link, "Linked");
            Ok(())
        }
        Err(StoreError::DuplicateLink(key)) => {
            tracing::info!(link = %key, "Link already exists");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use storefront_core::{CoreError, EntityKind};
    use storefront_db::document::into_document;
    use storefront_db::{DocumentStore, LinkSide, MemoryStore};
    use storefront_workflows::WorkflowError;

    use super::*;

    async fn store_with_channel() -> (Arc<dyn DocumentStore>, Query) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        store
            .insert(
                EntityKind::SalesChannel,
                into_document(json!({"id": "sc_1", "name": "Default Sales Channel"})).unwrap(),
            )
            .await
            .unwrap();
        let query = Query::new(Arc::clone(&store));
        (store, query)
    }

    fn channel_guard(name: &str) -> GraphQuery {
        GraphQuery::new(EntityKind::SalesChannel).filter("name", name)
    }

    fn doc(value: serde_json::Value) -> Document {
        into_document(value).unwrap()
    }

    #[tokio::test]
    async fn hit_skips_creation() {
        let (_, query) = store_with_channel().await;
        let mut called = false;

        let outcome = ensure_one(&query, &channel_guard("Default Sales Channel"), "channel", || {
            called = true;
            async { Ok(Vec::new()) }
        })
        .await
        .unwrap();

        assert!(!called);
        assert_eq!(outcome.as_option().and_then(|d| str_field(d, "id")), Some("sc_1"));
        assert!(!outcome.was_created());
    }

    #[tokio::test]
    async fn miss_runs_creation() {
        let (_, query) = store_with_channel().await;

        let outcome = ensure_one(&query, &channel_guard("Outlet"), "channel", || async {
            Ok(vec![doc(json!({"id": "sc_2", "name": "Outlet"}))])
        })
        .await
        .unwrap();

        assert!(outcome.was_created());
    }

    #[tokio::test]
    async fn already_exists_falls_back_to_reread() {
        let (store, query) = store_with_channel().await;
        let racing = Arc::clone(&store);

        let outcome = ensure_one(&query, &channel_guard("Outlet"), "channel", || async move {
            racing
                .insert(
                    EntityKind::SalesChannel,
                    doc(json!({"id": "sc_2", "name": "Outlet"})),
                )
                .await
                .unwrap();
            Err(WorkflowError::from(CoreError::AlreadyExists {
                entity: "sales_channel",
                key: "Outlet".into(),
            }))
        })
        .await
        .unwrap();

        assert_eq!(outcome.into_option().and_then(|d| d.get("id").cloned()), Some(json!("sc_2")));
    }

    #[tokio::test]
    async fn other_failures_are_swallowed() {
        let (_, query) = store_with_channel().await;

        let outcome = ensure_one(&query, &channel_guard("Outlet"), "channel", || async {
            Err(WorkflowError::from(CoreError::Conflict("boom".into())))
        })
        .await
        .unwrap();

        assert_eq!(outcome, Provisioned::Skipped);
    }

    #[tokio::test]
    async fn ensure_all_creates_only_missing() {
        let (store, query) = store_with_channel().await;
        let writer = Arc::clone(&store);

        let docs = ensure_all(
            &query,
            &GraphQuery::new(EntityKind::SalesChannel),
            "name",
            &["Outlet", "Default Sales Channel"],
            "channels",
            |missing| async move {
                assert_eq!(missing, vec!["Outlet".to_string()]);
                let created = writer
                    .insert(EntityKind::SalesChannel, doc(json!({"id": "sc_2", "name": "Outlet"})))
                    .await
                    .unwrap();
                Ok(vec![created])
            },
        )
        .await
        .unwrap();

        let ids: Vec<_> = docs.iter().filter_map(|d| str_field(d, "id")).collect();
        assert_eq!(ids, vec!["sc_2", "sc_1"]);
    }

    #[tokio::test]
    async fn attempt_swallows_errors() {
        let failed: Option<()> = attempt("step", async {
            Err(WorkflowError::from(CoreError::Validation("bad".into())))
        })
        .await;
        assert!(failed.is_none());
        assert_eq!(attempt("step", async { Ok(3) }).await, Some(3));
    }

    #[tokio::test]
    async fn duplicate_links_are_benign() {
        let (store, _) = store_with_channel().await;
        let linker = Linker::new(store);
        let link = LinkRecord::new(LinkSide::api_key("apk_1"), LinkSide::sales_channel("sc_1"));

        ensure_link(&linker, link.clone()).await.unwrap();
        ensure_link(&linker, link).await.unwrap();

        assert_eq!(linker.list(None).await.unwrap().len(), 1);
    }
}
