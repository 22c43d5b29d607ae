//! `ensure-link`: attach the first publishable API key to the default sales
//! channel.

use storefront_core::EntityKind;
use storefront_db::document::{doc_id, str_field};
use storefront_db::Filter;
use storefront_workflows::sales_channel::{LinkSalesChannelsInput, LinkSalesChannelsToApiKey};

use super::seed::DEFAULT_SALES_CHANNEL;
use crate::context::ScriptContext;
use crate::error::ScriptResult;

pub async fn run(ctx: &ScriptContext) -> ScriptResult<()> {
    let keys = ctx
        .query
        .list(EntityKind::ApiKey, &[Filter::eq("type", "publishable")])
        .await?;
    let Some(key) = keys.first() else {
        tracing::error!("No publishable API key found!");
        return Ok(());
    };
    let key_id = doc_id(key)?;
    tracing::info!(
        "Found API Key: {} ({key_id})",
        str_field(key, "title").unwrap_or_default()
    );

    let channels = ctx
        .query
        .list(EntityKind::SalesChannel, &[Filter::eq("name", DEFAULT_SALES_CHANNEL)])
        .await?;
    let Some(channel) = channels.first() else {
        tracing::error!("Default Sales Channel not found!");
        return Ok(());
    };
    let channel_id = doc_id(channel)?;
    tracing::info!("Found Sales Channel: {DEFAULT_SALES_CHANNEL} ({channel_id})");

    let result = ctx
        .engine
        .run(
            LinkSalesChannelsToApiKey,
            LinkSalesChannelsInput::add(key_id, &[channel_id]),
        )
        .await;
    match result {
        Ok(changes) if changes.created.is_empty() => {
            tracing::info!("Link already in place, nothing to do.")
        }
        Ok(_) => tracing::info!("Linking successful!"),
        Err(e) => tracing::info!("Linking skipped or failed (might already exist): {e}"),
    }
    Ok(())
}
