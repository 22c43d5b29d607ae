//! `check-api`: API keys with their sales channels, then sales channels
//! with their products.

use storefront_core::EntityKind;
use storefront_db::GraphQuery;

use crate::context::ScriptContext;
use crate::error::ScriptResult;
use crate::report::{join_or, related, related_field, scalar, Report, NONE};

pub async fn report(ctx: &ScriptContext) -> ScriptResult<Report> {
    let mut report = Report::new("check-api");

    let keys = ctx
        .query
        .graph(&GraphQuery::new(EntityKind::ApiKey).fields(&[
            "id",
            "title",
            "type",
            "sales_channels.name",
            "sales_channels.id",
        ]))
        .await?;
    report.section("API KEYS");
    for key in &keys {
        let channels: Vec<String> = related(key, "sales_channels")
            .into_iter()
            .map(|c| format!("{} ({})", scalar(c, "name"), scalar(c, "id")))
            .collect();
        report.line(format!(
            "Key: {} | Type: {} | Channels: {}",
            scalar(key, "title"),
            scalar(key, "type"),
            join_or(&channels, NONE)
        ));
    }

    let channels = ctx
        .query
        .graph(&GraphQuery::new(EntityKind::SalesChannel).fields(&["id", "name", "products.title"]))
        .await?;
    report.section("SALES CHANNELS");
    for channel in &channels {
        let titles = related_field(channel, "products", "title");
        report.line(format!(
            "SC: {} | Products: {}",
            scalar(channel, "name"),
            join_or(&titles, NONE)
        ));
    }
    Ok(report)
}

pub async fn run(ctx: &ScriptContext) -> ScriptResult<()> {
    report(ctx).await?.emit();
    Ok(())
}
