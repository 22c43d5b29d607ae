//! `add-stock`: stock every inventory item at the first stock location.

use storefront_core::EntityKind;
use storefront_db::document::{doc_id, str_field};
use storefront_workflows::inventory::{
    CreateInventoryLevels, CreateInventoryLevelsInput, InventoryLevelInput,
};

use crate::context::ScriptContext;
use crate::error::ScriptResult;

const STOCK_PER_ITEM: i64 = 1000;

pub async fn run(ctx: &ScriptContext) -> ScriptResult<()> {
    tracing::info!("Fetching stock locations...");
    let locations = ctx.query.list(EntityKind::StockLocation, &[]).await?;
    let Some(location) = locations.first() else {
        tracing::error!("No stock locations found!");
        return Ok(());
    };
    let location_id = doc_id(location)?;
    tracing::info!(
        "Using stock location: {} ({location_id})",
        str_field(location, "name").unwrap_or_default()
    );

    let items = ctx.query.list(EntityKind::InventoryItem, &[]).await?;
    tracing::info!(
        "Found {} inventory items. Adding stock at {location_id}...",
        items.len()
    );
    if items.is_empty() {
        return Ok(());
    }

    let levels = items
        .iter()
        .filter_map(|item| str_field(item, "id"))
        .map(|id| InventoryLevelInput::new(id, location_id, STOCK_PER_ITEM))
        .collect();
    let result = ctx
        .engine
        .run(
            CreateInventoryLevels,
            CreateInventoryLevelsInput {
                inventory_levels: levels,
            },
        )
        .await;
    match result {
        Ok(_) => tracing::info!("Stock added successfully!"),
        Err(e) => {
            tracing::info!("Stock addition skipped or failed (might already exist): {e}")
        }
    }
    Ok(())
}
