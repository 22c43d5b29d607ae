//! `add-shipping-options`: make Pakistan shippable from the seeded
//! fulfillment set.
//!
//! Needs the Pakistan region, the default shipping profile and the seeded
//! fulfillment set; a missing prerequisite is logged and nothing is
//! written. The script is done once a shipping option serves a zone that
//! covers `pk`. Otherwise it adds the "Pakistan" zone (reusing one left by an
//! earlier partial run) and a standard shipping option priced in rupees.

use serde_json::Value;
use storefront_core::EntityKind;
use storefront_db::document::{doc_id, str_field, Document};
use storefront_db::{Filter, GraphQuery};
use storefront_workflows::common::Price;
use storefront_workflows::fulfillment::{
    CreateServiceZones, CreateServiceZonesInput, CreateShippingOptions,
    CreateShippingOptionsInput, PriceType, ServiceZoneInput, ShippingOptionInput,
    ShippingOptionRule, ShippingOptionType,
};

use super::seed::{
    COUNTRY, CURRENCY, FULFILLMENT_PROVIDER, FULFILLMENT_SET, REGION_NAME, SHIPPING_PROFILE_TYPE,
};
use crate::context::ScriptContext;
use crate::error::ScriptResult;
use crate::provision::attempt;

const ZONE_NAME: &str = "Pakistan";
const OPTION_NAME: &str = "Standard Shipping";
const OPTION_PRICE: i64 = 500;

/// Ids of the service zones of `set` with a country geo zone for `country`.
fn zones_covering(set: &Document, country: &str) -> Vec<String> {
    set.get("service_zones")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|zone| {
            zone.get("geo_zones")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .any(|geo| geo.get("country_code").and_then(Value::as_str) == Some(country))
        })
        .filter_map(|zone| zone.get("id").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

pub async fn run(ctx: &ScriptContext) -> ScriptResult<()> {
    tracing::info!("Adding shipping options for Pakistan...");

    let regions = ctx
        .query
        .graph(&GraphQuery::new(EntityKind::Region).filter("name", REGION_NAME))
        .await?;
    let Some(region) = regions.first() else {
        tracing::error!("Pakistan region not found. Please run `fix-regions` script first.");
        return Ok(());
    };
    tracing::info!("Found Pakistan region with ID: {}", doc_id(region)?);

    let profile = ctx
        .query
        .list(EntityKind::ShippingProfile, &[Filter::eq("type", SHIPPING_PROFILE_TYPE)])
        .await?;
    let Some(profile) = profile.first() else {
        tracing::error!("Default shipping profile not found.");
        return Ok(());
    };
    let profile_id = doc_id(profile)?;
    tracing::info!("Found default shipping profile with ID: {profile_id}");

    let sets = ctx
        .query
        .list(EntityKind::FulfillmentSet, &[Filter::eq("name", FULFILLMENT_SET)])
        .await?;
    let Some(set) = sets.first() else {
        tracing::error!(
            "Fulfillment set '{FULFILLMENT_SET}' not found. Please run `seed` script first."
        );
        return Ok(());
    };

    let set_id = doc_id(set)?;
    tracing::info!("Found fulfillment set with ID: {set_id}");

    let covering = zones_covering(set, COUNTRY);
    let options = ctx.query.list(EntityKind::ShippingOption, &[]).await?;
    let served = options.iter().any(|option| {
        str_field(option, "service_zone_id").is_some_and(|id| covering.iter().any(|z| z == id))
    });
    if served {
        tracing::info!("Shipping option for Pakistan already exists.");
        return Ok(());
    }

    let zone_id = match covering.into_iter().next() {
        Some(zone_id) => {
            tracing::info!("Reusing service zone {zone_id} for Pakistan.");
            zone_id
        }
        None => {
            let zones = attempt(
                "create Pakistan service zone",
                ctx.engine.run(
                    CreateServiceZones,
                    CreateServiceZonesInput {
                        fulfillment_set_id: set_id.to_string(),
                        service_zones: vec![ServiceZoneInput::countries(ZONE_NAME, &[COUNTRY])],
                    },
                ),
            )
            .await;
            let created = zones
                .as_ref()
                .and_then(|zones| zones.first())
                .and_then(|zone| zone.get("id"))
                .and_then(Value::as_str);
            let Some(zone_id) = created else {
                tracing::error!("Failed to create shipping option for Pakistan: no service zone");
                return Ok(());
            };
            zone_id.to_string()
        }
    };

    let result = ctx
        .engine
        .run(
            CreateShippingOptions,
            CreateShippingOptionsInput {
                shipping_options: vec![ShippingOptionInput {
                    name: OPTION_NAME.to_string(),
                    price_type: PriceType::Flat,
                    provider_id: FULFILLMENT_PROVIDER.to_string(),
                    service_zone_id: zone_id,
                    shipping_profile_id: profile_id.to_string(),
                    option_type: ShippingOptionType {
                        label: "Standard".to_string(),
                        description: "Ship in 5-7 days.".to_string(),
                        code: "standard".to_string(),
                    },
                    prices: vec![Price::new(OPTION_PRICE, CURRENCY)],
                    rules: ShippingOptionRule::store_defaults(),
                }],
            },
        )
        .await;
    match result {
        Ok(_) => tracing::info!("Successfully created shipping option for Pakistan."),
        Err(e) => tracing::error!("Failed to create shipping option for Pakistan: {e}"),
    }
    Ok(())
}
