//! The admin API surface the stock widget depends on.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storefront_core::{CoreError, EntityKind};
use storefront_db::document::str_field;
use storefront_db::{GraphQuery, Query, StoreError};
use storefront_workflows::inventory::{InventoryLevelInput, UpdateInventoryLevel};
use storefront_workflows::{WorkflowEngine, WorkflowError};

use crate::widget::{ProductView, VariantView};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLocation {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryLevelUpdate {
    pub inventory_item_id: String,
    pub location_id: String,
    pub stocked_quantity: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

#[async_trait]
pub trait AdminInventoryClient: Send + Sync {
    async fn list_stock_locations(&self) -> Result<Vec<StockLocation>, ClientError>;

    async fn update_inventory_level(&self, update: InventoryLevelUpdate) -> Result<(), ClientError>;
}

// ---------------------------------------------------------------------------
// Engine-backed client
// ---------------------------------------------------------------------------

/// Client that reads through the entity reader and writes through the
/// workflow engine of the same store.
#[derive(Clone)]
pub struct EngineAdminClient {
    query: Query,
    engine: WorkflowEngine,
}

impl EngineAdminClient {
    pub fn new(engine: WorkflowEngine) -> Self {
        Self {
            query: Query::new(engine.store()),
            engine,
        }
    }

    /// Load a product with each variant's inventory item and the quantity
    /// stocked for it across all locations.
    pub async fn retrieve_product(&self, id: &str) -> Result<ProductView, ClientError> {
        let product = self
            .query
            .graph(
                &GraphQuery::new(EntityKind::Product)
                    .fields(&["id", "title", "variants.id", "variants.title", "variants.inventory.id"])
                    .filter("id", id),
            )
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::not_found(EntityKind::Product.as_str(), id))?;

        let mut stocked: HashMap<String, i64> = HashMap::new();
        for level in self.query.list(EntityKind::InventoryLevel, &[]).await? {
            if let Some(item) = str_field(&level, "inventory_item_id") {
                let quantity = level.get("stocked_quantity").and_then(Value::as_i64).unwrap_or(0);
                *stocked.entry(item.to_string()).or_default() += quantity;
            }
        }

        let variants = product
            .get("variants")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
            .map(|variant| {
                let inventory_item_id = variant
                    .get("inventory")
                    .and_then(|inv| inv.get(0))
                    .and_then(|item| item.get("id"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let inventory_quantity = inventory_item_id
                    .as_ref()
                    .and_then(|item| stocked.get(item))
                    .copied()
                    .unwrap_or(0);
                VariantView {
                    id: str_field(variant, "id").unwrap_or_default().to_string(),
                    title: str_field(variant, "title").unwrap_or_default().to_string(),
                    inventory_item_id,
                    inventory_quantity,
                }
            })
            .collect();

        Ok(ProductView {
            id: id.to_string(),
            title: str_field(&product, "title").unwrap_or_default().to_string(),
            variants,
        })
    }
}

#[async_trait]
impl AdminInventoryClient for EngineAdminClient {
    async fn list_stock_locations(&self) -> Result<Vec<StockLocation>, ClientError> {
        let locations = self
            .query
            .graph_as(&GraphQuery::new(EntityKind::StockLocation).fields(&["id", "name"]))
            .await?;
        Ok(locations)
    }

    async fn update_inventory_level(&self, update: InventoryLevelUpdate) -> Result<(), ClientError> {
        self.engine
            .run(
                UpdateInventoryLevel,
                InventoryLevelInput::new(
                    &update.inventory_item_id,
                    &update.location_id,
                    update.stocked_quantity,
                ),
            )
            .await?;
        Ok(())
    }
}
