//! `check-products`: regions, sales channels, then every product with its
//! channels, variants and prices.

use storefront_core::EntityKind;
use storefront_db::document::Document;
use storefront_db::GraphQuery;

use crate::context::ScriptContext;
use crate::error::ScriptResult;
use crate::report::{join_or, price_rules, related, related_field, scalar, Report, NONE_DETAIL};

const SEPARATOR: &str = "------------------------------------------------";

pub async fn report(ctx: &ScriptContext) -> ScriptResult<Report> {
    let mut report = Report::new("check-products");

    report.section("CHECKING REGIONS");
    let regions = ctx
        .query
        .graph(&GraphQuery::new(EntityKind::Region).fields(&["id", "name", "currency_code", "countries.*"]))
        .await?;
    for region in &regions {
        report.line(format!(
            "Region: {} ({}) - Currency: {}",
            scalar(region, "name"),
            scalar(region, "id"),
            scalar(region, "currency_code")
        ));
        let countries = related_field(region, "countries", "iso_2");
        report.line(format!("Countries: {}", join_or(&countries, NONE_DETAIL)));
    }

    report.section("CHECKING SALES CHANNELS");
    let channels = ctx
        .query
        .graph(&GraphQuery::new(EntityKind::SalesChannel).fields(&["id", "name"]))
        .await?;
    for channel in &channels {
        report.line(format!(
            "Sales Channel: {} ({})",
            scalar(channel, "name"),
            scalar(channel, "id")
        ));
    }

    report.section("CHECKING PRODUCTS");
    let products = ctx
        .query
        .graph(&GraphQuery::new(EntityKind::Product).fields(&[
            "id",
            "title",
            "status",
            "sales_channels.*",
            "variants.*",
            "variants.prices.*",
        ]))
        .await?;
    for product in &products {
        product_lines(&mut report, product);
    }
    Ok(report)
}

fn product_lines(report: &mut Report, product: &Document) {
    report.line(format!(
        "Product: {} ({})",
        scalar(product, "title"),
        scalar(product, "id")
    ));
    report.line(format!("  Status: {}", scalar(product, "status")));
    let channels = related_field(product, "sales_channels", "name");
    report.line(format!("  Sales Channels: {}", join_or(&channels, NONE_DETAIL)));

    let variants = related(product, "variants");
    if variants.is_empty() {
        report.line("  No variants found.");
    }
    for variant in variants {
        report.line(format!(
            "  Variant: {} ({})",
            scalar(variant, "title"),
            scalar(variant, "id")
        ));
        let prices = related(variant, "prices");
        if prices.is_empty() {
            report.line("    No prices found for variant.");
        }
        for price in prices {
            report.line(format!(
                "    Price: {} {} (Rules: {})",
                scalar(price, "amount"),
                scalar(price, "currency_code"),
                price_rules(price)
            ));
        }
    }
    report.line(SEPARATOR);
}

pub async fn run(ctx: &ScriptContext) -> ScriptResult<()> {
    report(ctx).await?.emit();
    Ok(())
}
