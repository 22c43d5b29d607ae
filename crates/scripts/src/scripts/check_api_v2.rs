//! `check-api-v2`: publishable keys resolved through raw link records, then
//! the products of each sales channel found by filtering on the link.

use storefront_core::{EntityKind, Module};
use storefront_db::document::{doc_id, Document};
use storefront_db::{Filter, GraphQuery, LinkSide, StoreError};

use crate::context::ScriptContext;
use crate::error::ScriptResult;
use crate::report::{scalar, Report, NONE};

pub async fn report(ctx: &ScriptContext) -> ScriptResult<Report> {
    let mut report = Report::new("check-api-v2");

    report.section("FETCHING API KEYS");
    let keys = ctx
        .query
        .list(EntityKind::ApiKey, &[Filter::eq("type", "publishable")])
        .await?;
    for key in &keys {
        let key_id = doc_id(key)?;
        report.line(format!("Key: {} | ID: {key_id}", scalar(key, "title")));

        let channel_ids = ctx
            .linker
            .linked_ids(&LinkSide::api_key(key_id), Module::SalesChannel, "sales_channel_id")
            .await?;
        if channel_ids.is_empty() {
            report.line(format!(" -> Linked to SC: {NONE}"));
        }
        for channel_id in &channel_ids {
            let name = channel_name(ctx, channel_id).await?;
            report.line(format!(" -> Linked to SC: {name} ({channel_id})"));
        }
    }

    report.section("FETCHING PRODUCTS IN SALES CHANNELS");
    let channels = ctx.query.list(EntityKind::SalesChannel, &[]).await?;
    for channel in &channels {
        let channel_id = doc_id(channel)?;
        report.line(format!("SC: {} ({channel_id})", scalar(channel, "name")));

        let products = ctx
            .query
            .graph(
                &GraphQuery::new(EntityKind::Product)
                    .fields(&["id", "title", "handle", "status"])
                    .filter("sales_channels.id", channel_id),
            )
            .await?;
        if products.is_empty() {
            report.line(format!("  - Product: {NONE}"));
        }
        for product in &products {
            report.line(product_line(product));
        }
    }
    Ok(report)
}

fn product_line(product: &Document) -> String {
    format!(
        "  - Product: {} ({}) | Status: {}",
        scalar(product, "title"),
        scalar(product, "handle"),
        scalar(product, "status")
    )
}

/// Name of a linked channel; a dangling link shows the placeholder.
async fn channel_name(ctx: &ScriptContext, id: &str) -> ScriptResult<String> {
    match ctx.query.retrieve(EntityKind::SalesChannel, id).await {
        Ok(channel) => Ok(scalar(&channel, "name")),
        Err(StoreError::NotFound { .. }) => Ok(NONE.to_string()),
        Err(e) => Err(e.into()),
    }
}

pub async fn run(ctx: &ScriptContext) -> ScriptResult<()> {
    report(ctx).await?.emit();
    Ok(())
}
