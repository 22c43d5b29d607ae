//! `verify-final`: regions with their countries, then products with their
//! prices.
//!
//! With `--handle`, only the matching product is shown together with its
//! sales channels; when nothing matches, every product is listed instead.

use storefront_core::EntityKind;
use storefront_db::document::Document;
use storefront_db::GraphQuery;

use crate::context::ScriptContext;
use crate::error::ScriptResult;
use crate::report::{join_or, price_rules, related, related_field, scalar, Report, NONE};

const PRODUCT_FIELDS: [&str; 6] = [
    "id",
    "title",
    "status",
    "sales_channels.name",
    "variants.title",
    "variants.prices.*",
];

pub async fn report(ctx: &ScriptContext) -> ScriptResult<Report> {
    let mut report = Report::new("verify-final");

    report.section("REGIONS");
    let regions = ctx
        .query
        .graph(&GraphQuery::new(EntityKind::Region).fields(&["id", "name", "currency_code", "countries.iso_2"]))
        .await?;
    for region in &regions {
        let countries = related_field(region, "countries", "iso_2");
        report.line(format!(
            "R: {} | ID: {} | CC: {} | Countries: {}",
            scalar(region, "name"),
            scalar(region, "id"),
            scalar(region, "currency_code"),
            join_or(&countries, NONE)
        ));
    }

    report.section("PRODUCTS");
    let focused = match &ctx.options.product_handle {
        Some(handle) => {
            ctx.query
                .graph(
                    &GraphQuery::new(EntityKind::Product)
                        .fields(&PRODUCT_FIELDS)
                        .filter("handle", handle.as_str()),
                )
                .await?
        }
        None => Vec::new(),
    };

    if focused.is_empty() {
        let products = ctx
            .query
            .graph(&GraphQuery::new(EntityKind::Product).fields(&PRODUCT_FIELDS))
            .await?;
        for product in &products {
            report.line(format!(
                "P: {} | Status: {}",
                scalar(product, "title"),
                scalar(product, "status")
            ));
            price_lines(&mut report, product);
        }
    } else {
        for product in &focused {
            let channels = related_field(product, "sales_channels", "name");
            report.line(format!(
                "P: {} | Status: {} | SC: {}",
                scalar(product, "title"),
                scalar(product, "status"),
                join_or(&channels, NONE)
            ));
            price_lines(&mut report, product);
        }
    }
    Ok(report)
}

fn price_lines(report: &mut Report, product: &Document) {
    for variant in related(product, "variants") {
        for price in related(variant, "prices") {
            report.line(format!(
                "  Price: {} {} | Rules: {}",
                scalar(price, "amount"),
                scalar(price, "currency_code"),
                price_rules(price)
            ));
        }
    }
}

pub async fn run(ctx: &ScriptContext) -> ScriptResult<()> {
    report(ctx).await?.emit();
    Ok(())
}
