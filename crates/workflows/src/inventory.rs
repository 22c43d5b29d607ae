//! Inventory level workflows.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use storefront_core::{CoreError, EntityKind};
use storefront_db::document::{str_field, Document};
use validator::Validate;

use crate::engine::Workflow;
use crate::error::WorkflowResult;
use crate::transaction::Transaction;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InventoryLevelInput {
    #[validate(length(min = 1))]
    pub inventory_item_id: String,
    #[validate(length(min = 1))]
    pub location_id: String,
    #[validate(range(min = 0))]
    pub stocked_quantity: i64,
}

impl InventoryLevelInput {
    pub fn new(inventory_item_id: &str, location_id: &str, stocked_quantity: i64) -> Self {
        Self {
            inventory_item_id: inventory_item_id.to_string(),
            location_id: location_id.to_string(),
            stocked_quantity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateInventoryLevelsInput {
    #[validate(nested)]
    pub inventory_levels: Vec<InventoryLevelInput>,
}

/// Create stock levels. A level for an item/location pair that already
/// exists fails the whole batch as already-exists.
pub struct CreateInventoryLevels;

#[async_trait]
impl Workflow for CreateInventoryLevels {
    const NAME: &'static str = "create-inventory-levels";
    type Input = CreateInventoryLevelsInput;
    type Output = Vec<Document>;

    async fn run(
        &self,
        tx: &mut Transaction,
        input: CreateInventoryLevelsInput,
    ) -> WorkflowResult<Vec<Document>> {
        let mut created = Vec::with_capacity(input.inventory_levels.len());
        for level in input.inventory_levels {
            tx.require(EntityKind::InventoryItem, &level.inventory_item_id)
                .await?;
            tx.require(EntityKind::StockLocation, &level.location_id)
                .await?;
            let doc = tx
                .insert(
                    EntityKind::InventoryLevel,
                    json!({
                        "inventory_item_id": level.inventory_item_id,
                        "location_id": level.location_id,
                        "stocked_quantity": level.stocked_quantity,
                        "reserved_quantity": 0,
                        "incoming_quantity": 0,
                    }),
                )
                .await?;
            created.push(doc);
        }
        Ok(created)
    }
}

/// Set the stocked quantity of an existing level.
pub struct UpdateInventoryLevel;

#[async_trait]
impl Workflow for UpdateInventoryLevel {
    const NAME: &'static str = "update-inventory-level";
    type Input = InventoryLevelInput;
    type Output = Document;

    async fn run(&self, tx: &mut Transaction, input: InventoryLevelInput) -> WorkflowResult<Document> {
        let mut level = tx
            .list(EntityKind::InventoryLevel)
            .await?
            .into_iter()
            .find(|l| {
                str_field(l, "inventory_item_id") == Some(input.inventory_item_id.as_str())
                    && str_field(l, "location_id") == Some(input.location_id.as_str())
            })
            .ok_or_else(|| {
                CoreError::not_found(
                    EntityKind::InventoryLevel.as_str(),
                    format!("{}:{}", input.inventory_item_id, input.location_id),
                )
            })?;
        level.insert("stocked_quantity".into(), json!(input.stocked_quantity));
        tx.replace(EntityKind::InventoryLevel, level).await
    }
}
