//! `fix-regions`: delete every region and recreate Pakistan.
//!
//! Destructive, so it refuses to run unless the caller confirmed with
//! `--confirm-destructive`.

use storefront_core::EntityKind;
use storefront_db::document::doc_id;
use storefront_db::GraphQuery;
use storefront_workflows::region::{
    CreateRegions, CreateRegionsInput, DeleteRegions, DeleteRegionsInput, RegionInput,
};

use super::seed::{COUNTRY, CURRENCY, PAYMENT_PROVIDER, REGION_NAME};
use crate::context::ScriptContext;
use crate::error::ScriptResult;
use crate::provision::attempt;
use crate::report::{join_or, related_field, NONE};

fn regions_query() -> GraphQuery {
    GraphQuery::new(EntityKind::Region).fields(&["id", "name", "currency_code", "countries.*"])
}

pub async fn run(ctx: &ScriptContext) -> ScriptResult<()> {
    if !ctx.options.confirm_destructive {
        tracing::error!(
            "fix-regions deletes every region; re-run with --confirm-destructive to proceed"
        );
        return Ok(());
    }

    let regions = ctx.query.graph(&regions_query()).await?;
    tracing::info!("Found {} regions.", regions.len());

    let ids = regions
        .iter()
        .map(|r| doc_id(r).map(str::to_string))
        .collect::<Result<Vec<_>, _>>()?;
    if !ids.is_empty() {
        let deleted = attempt(
            "delete regions",
            ctx.engine.run(DeleteRegions, DeleteRegionsInput { ids }),
        )
        .await;
        if let Some(deleted) = deleted {
            tracing::info!(count = deleted.len(), "Deleted regions");
        }
    }

    attempt(
        "create Pakistan region",
        ctx.engine.run(
            CreateRegions,
            CreateRegionsInput {
                regions: vec![RegionInput::new(REGION_NAME, CURRENCY, &[COUNTRY])
                    .with_payment_provider(PAYMENT_PROVIDER)],
            },
        ),
    )
    .await;

    let pakistan = ctx
        .query
        .graph(&regions_query().filter("name", REGION_NAME))
        .await?
        .into_iter()
        .next();
    match pakistan {
        Some(region) => {
            tracing::info!("New Pakistan Region ID: {}", doc_id(&region)?);
            let countries = related_field(&region, "countries", "iso_2");
            tracing::info!("Countries: {}", join_or(&countries, NONE));
        }
        None => tracing::error!("Failed to create Pakistan region!"),
    }
    Ok(())
}
