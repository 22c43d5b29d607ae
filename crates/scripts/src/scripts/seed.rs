//! `seed`: provision a complete single-region storefront with a demo
//! catalog.
//!
//! Each step is guarded, so re-running the script only fills in what is
//! missing. A step whose prerequisite could not be provisioned is skipped
//! with a warning.

use std::collections::HashMap;

use storefront_core::EntityKind;
use storefront_db::document::{doc_id, str_field, Document};
use storefront_db::{Filter, GraphQuery, LinkRecord, LinkSide};
use storefront_workflows::api_key::{ApiKeyInput, CreateApiKeys, CreateApiKeysInput};
use storefront_workflows::common::Price;
use storefront_workflows::fulfillment::{
    CreateFulfillmentSets, CreateFulfillmentSetsInput, CreateShippingOptions,
    CreateShippingOptionsInput, CreateShippingProfiles, CreateShippingProfilesInput,
    FulfillmentSetInput, PriceType, ServiceZoneInput, ShippingOptionInput, ShippingOptionRule,
    ShippingOptionType, ShippingProfileInput,
};
use storefront_workflows::inventory::{
    CreateInventoryLevels, CreateInventoryLevelsInput, InventoryLevelInput,
};
use storefront_workflows::product::{
    CreateProductCategories, CreateProductCategoriesInput, CreateProducts, CreateProductsInput,
    IdRef, ImageInput, ProductCategoryInput, ProductInput, ProductOptionInput, ProductStatus,
    ProductVariantInput,
};
use storefront_workflows::region::{
    CreateRegions, CreateRegionsInput, CreateTaxRegions, CreateTaxRegionsInput, RegionInput,
    TaxRegionInput,
};
use storefront_workflows::sales_channel::{
    CreateSalesChannels, CreateSalesChannelsInput, LinkSalesChannelsInput,
    LinkSalesChannelsToApiKey, LinkSalesChannelsToStockLocation, SalesChannelInput,
};
use storefront_workflows::stock_location::{
    AddressInput, CreateStockLocations, CreateStockLocationsInput, StockLocationInput,
};
use storefront_workflows::store::{
    CreateStores, CreateStoresInput, Locale, StoreCurrency, StoreInput, StoreSelector,
    StoreUpdate, UpdateStoreCurrencies, UpdateStoreCurrenciesInput, UpdateStores,
    UpdateStoresInput,
};

use crate::context::ScriptContext;
use crate::error::ScriptResult;
use crate::provision::{attempt, ensure_all, ensure_link, ensure_one};

pub const STORE_NAME: &str = "Medusa Store";
pub const DEFAULT_SALES_CHANNEL: &str = "Default Sales Channel";
pub const REGION_NAME: &str = "Pakistan";
pub const CURRENCY: &str = "pkr";
pub const COUNTRY: &str = "pk";
pub const PAYMENT_PROVIDER: &str = "pp_system_default";
pub const TAX_PROVIDER: &str = "tp_system";
pub const STOCK_LOCATION: &str = "European Warehouse";
pub const FULFILLMENT_SET: &str = "European Warehouse delivery";
pub const FULFILLMENT_PROVIDER: &str = "manual_manual";
pub const SHIPPING_PROFILE_TYPE: &str = "default";
pub const API_KEY_TITLE: &str = "Webshop";
pub const CATEGORIES: [&str; 4] = ["Shirts", "Sweatshirts", "Pants", "Merch"];
pub const EUROPE: [&str; 7] = ["gb", "de", "dk", "se", "fr", "es", "it"];

const SHIPPING_PRICE: i64 = 1000;
const PRODUCT_PRICE: i64 = 3000;
const PRODUCT_WEIGHT: u32 = 400;
const STOCK_PER_ITEM: i64 = 1_000_000;
const SIZES: [&str; 4] = ["S", "M", "L", "XL"];
const COLORS: [&str; 2] = ["Black", "White"];
const IMAGE_BASE: &str = "https://medusa-public-images.s3.eu-west-1.amazonaws.com";

pub async fn run(ctx: &ScriptContext) -> ScriptResult<()> {
    tracing::info!("Seeding store data...");
    let Some(store_id) = seed_store(ctx).await? else {
        tracing::error!("Store could not be provisioned, aborting seed");
        return Ok(());
    };
    let channel_id = seed_sales_channel(ctx, &store_id).await?;

    seed_region(ctx).await?;

    tracing::info!("Seeding stock location data...");
    let location_id = seed_stock_location(ctx, &store_id).await?;

    tracing::info!("Seeding fulfillment data...");
    let profile_id = seed_shipping_profile(ctx).await?;
    if let Some(location_id) = &location_id {
        seed_fulfillment(ctx, location_id, profile_id.as_deref()).await?;
        if let Some(channel_id) = &channel_id {
            attempt(
                "link sales channel to stock location",
                ctx.engine.run(
                    LinkSalesChannelsToStockLocation,
                    LinkSalesChannelsInput::add(location_id, &[channel_id.as_str()]),
                ),
            )
            .await;
        }
    }
    tracing::info!("Finished seeding stock location data.");

    tracing::info!("Seeding publishable API key data...");
    seed_api_key(ctx, channel_id.as_deref()).await?;
    tracing::info!("Finished seeding publishable API key data.");

    tracing::info!("Seeding product data...");
    seed_catalog(ctx, profile_id.as_deref(), channel_id.as_deref()).await?;
    tracing::info!("Finished seeding product data.");

    tracing::info!("Seeding inventory levels.");
    match &location_id {
        Some(location_id) => seed_inventory(ctx, location_id).await?,
        None => tracing::warn!("No stock location, skipping inventory levels"),
    }
    tracing::info!("Finished seeding inventory levels data.");
    Ok(())
}

// ---------------------------------------------------------------------------
// Store, sales channel, region
// ---------------------------------------------------------------------------

async fn seed_store(ctx: &ScriptContext) -> ScriptResult<Option<String>> {
    let store = ensure_one(&ctx.query, &GraphQuery::new(EntityKind::Store), "store", || {
        ctx.engine.run(
            CreateStores,
            CreateStoresInput {
                stores: vec![StoreInput {
                    name: STORE_NAME.to_string(),
                    ..Default::default()
                }],
            },
        )
    })
    .await?;
    let Some(store) = store.into_option() else {
        return Ok(None);
    };
    let store_id = doc_id(&store)?.to_string();

    attempt(
        "update store locales",
        ctx.engine.run(
            UpdateStores,
            store_update(
                &store_id,
                StoreUpdate {
                    supported_locales: Some(vec![Locale::new("fr-FR"), Locale::new("es-ES")]),
                    ..Default::default()
                },
            ),
        ),
    )
    .await;
    Ok(Some(store_id))
}

fn store_update(store_id: &str, update: StoreUpdate) -> UpdateStoresInput {
    UpdateStoresInput {
        selector: StoreSelector {
            id: Some(store_id.to_string()),
        },
        update,
    }
}

async fn seed_sales_channel(ctx: &ScriptContext, store_id: &str) -> ScriptResult<Option<String>> {
    let guard = GraphQuery::new(EntityKind::SalesChannel).filter("name", DEFAULT_SALES_CHANNEL);
    let channel = ensure_one(&ctx.query, &guard, "sales_channel", || {
        ctx.engine.run(
            CreateSalesChannels,
            CreateSalesChannelsInput {
                sales_channels: vec![SalesChannelInput::new(DEFAULT_SALES_CHANNEL)],
            },
        )
    })
    .await?;

    attempt(
        "update store currencies",
        ctx.engine.run(
            UpdateStoreCurrencies,
            UpdateStoreCurrenciesInput {
                store_id: store_id.to_string(),
                supported_currencies: vec![StoreCurrency::new(CURRENCY, true)],
            },
        ),
    )
    .await;

    let Some(channel) = channel.into_option() else {
        return Ok(None);
    };
    let channel_id = doc_id(&channel)?.to_string();
    attempt(
        "set default sales channel",
        ctx.engine.run(
            UpdateStores,
            store_update(
                store_id,
                StoreUpdate {
                    default_sales_channel_id: Some(channel_id.clone()),
                    ..Default::default()
                },
            ),
        ),
    )
    .await;
    Ok(Some(channel_id))
}

async fn seed_region(ctx: &ScriptContext) -> ScriptResult<()> {
    let guard = GraphQuery::new(EntityKind::Region).filter("name", REGION_NAME);
    ensure_one(&ctx.query, &guard, "region", || {
        ctx.engine.run(
            CreateRegions,
            CreateRegionsInput {
                regions: vec![RegionInput::new(REGION_NAME, CURRENCY, &[COUNTRY])
                    .with_payment_provider(PAYMENT_PROVIDER)],
            },
        )
    })
    .await?;
    tracing::info!("Finished seeding regions.");

    tracing::info!("Seeding tax regions...");
    let guard = GraphQuery::new(EntityKind::TaxRegion).filter("country_code", COUNTRY);
    ensure_one(&ctx.query, &guard, "tax_region", || {
        ctx.engine.run(
            CreateTaxRegions,
            CreateTaxRegionsInput {
                tax_regions: vec![TaxRegionInput::new(COUNTRY, TAX_PROVIDER)],
            },
        )
    })
    .await?;
    tracing::info!("Finished seeding tax regions.");
    Ok(())
}

// ---------------------------------------------------------------------------
// Stock location and fulfillment
// ---------------------------------------------------------------------------

async fn seed_stock_location(ctx: &ScriptContext, store_id: &str) -> ScriptResult<Option<String>> {
    let guard = GraphQuery::new(EntityKind::StockLocation).filter("name", STOCK_LOCATION);
    let location = ensure_one(&ctx.query, &guard, "stock_location", || {
        ctx.engine.run(
            CreateStockLocations,
            CreateStockLocationsInput {
                locations: vec![StockLocationInput {
                    name: STOCK_LOCATION.to_string(),
                    address: Some(AddressInput {
                        address_1: String::new(),
                        city: Some("Copenhagen".to_string()),
                        country_code: "DK".to_string(),
                        postal_code: None,
                    }),
                }],
            },
        )
    })
    .await?;
    let Some(location) = location.into_option() else {
        return Ok(None);
    };
    let location_id = doc_id(&location)?.to_string();

    attempt(
        "set default location",
        ctx.engine.run(
            UpdateStores,
            store_update(
                store_id,
                StoreUpdate {
                    default_location_id: Some(location_id.clone()),
                    ..Default::default()
                },
            ),
        ),
    )
    .await;

    ensure_link(
        &ctx.linker,
        LinkRecord::new(
            LinkSide::stock_location(&location_id),
            LinkSide::fulfillment_provider(FULFILLMENT_PROVIDER),
        ),
    )
    .await?;
    Ok(Some(location_id))
}

async fn seed_shipping_profile(ctx: &ScriptContext) -> ScriptResult<Option<String>> {
    let guard = GraphQuery::new(EntityKind::ShippingProfile).filter("type", SHIPPING_PROFILE_TYPE);
    let profile = ensure_one(&ctx.query, &guard, "shipping_profile", || {
        ctx.engine.run(
            CreateShippingProfiles,
            CreateShippingProfilesInput {
                data: vec![ShippingProfileInput {
                    name: "Default Shipping Profile".to_string(),
                    profile_type: SHIPPING_PROFILE_TYPE.to_string(),
                }],
            },
        )
    })
    .await?;
    Ok(match profile.into_option() {
        Some(profile) => Some(doc_id(&profile)?.to_string()),
        None => None,
    })
}

async fn seed_fulfillment(
    ctx: &ScriptContext,
    location_id: &str,
    profile_id: Option<&str>,
) -> ScriptResult<()> {
    let guard = GraphQuery::new(EntityKind::FulfillmentSet)
        .fields(&["id", "name", "service_zones.id", "service_zones.name"])
        .filter("name", FULFILLMENT_SET);
    let set = ensure_one(&ctx.query, &guard, "fulfillment_set", || {
        ctx.engine.run(
            CreateFulfillmentSets,
            CreateFulfillmentSetsInput {
                fulfillment_sets: vec![FulfillmentSetInput {
                    name: FULFILLMENT_SET.to_string(),
                    set_type: "shipping".to_string(),
                    service_zones: vec![ServiceZoneInput::countries("Europe", &EUROPE)],
                }],
            },
        )
    })
    .await?;
    let Some(set) = set.into_option() else {
        tracing::warn!("No fulfillment set, skipping shipping options");
        return Ok(());
    };
    let set_id = doc_id(&set)?.to_string();

    ensure_link(
        &ctx.linker,
        LinkRecord::new(
            LinkSide::stock_location(location_id),
            LinkSide::fulfillment_set(&set_id),
        ),
    )
    .await?;

    let zone_id = set
        .get("service_zones")
        .and_then(|zones| zones.get(0))
        .and_then(|zone| zone.get("id"))
        .and_then(|id| id.as_str());
    let (Some(zone_id), Some(profile_id)) = (zone_id, profile_id) else {
        tracing::warn!("Missing service zone or shipping profile, skipping shipping options");
        return Ok(());
    };

    let option = |name: &str, description: &str, code: &str| ShippingOptionInput {
        name: name.to_string(),
        price_type: PriceType::Flat,
        provider_id: FULFILLMENT_PROVIDER.to_string(),
        service_zone_id: zone_id.to_string(),
        shipping_profile_id: profile_id.to_string(),
        option_type: ShippingOptionType {
            label: name.split(' ').next().unwrap_or(name).to_string(),
            description: description.to_string(),
            code: code.to_string(),
        },
        prices: vec![Price::new(SHIPPING_PRICE, CURRENCY)],
        rules: ShippingOptionRule::store_defaults(),
    };
    attempt(
        "create shipping options",
        ctx.engine.run(
            CreateShippingOptions,
            CreateShippingOptionsInput {
                shipping_options: vec![
                    option("Standard Shipping", "Ship in 2-3 days.", "standard"),
                    option("Express Shipping", "Ship in 24 hours.", "express"),
                ],
            },
        ),
    )
    .await;
    tracing::info!("Finished seeding fulfillment data.");
    Ok(())
}

// ---------------------------------------------------------------------------
// API key
// ---------------------------------------------------------------------------

async fn seed_api_key(ctx: &ScriptContext, channel_id: Option<&str>) -> ScriptResult<()> {
    let guard = GraphQuery::new(EntityKind::ApiKey)
        .filter("type", "publishable")
        .filter("title", API_KEY_TITLE);
    let key = ensure_one(&ctx.query, &guard, "api_key", || {
        ctx.engine.run(
            CreateApiKeys,
            CreateApiKeysInput {
                api_keys: vec![ApiKeyInput::publishable(API_KEY_TITLE)],
            },
        )
    })
    .await?;

    let (Some(key), Some(channel_id)) = (key.into_option(), channel_id) else {
        tracing::warn!("Missing API key or sales channel, skipping link");
        return Ok(());
    };
    attempt(
        "link sales channel to API key",
        ctx.engine.run(
            LinkSalesChannelsToApiKey,
            LinkSalesChannelsInput::add(doc_id(&key)?, &[channel_id]),
        ),
    )
    .await;
    Ok(())
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

async fn seed_catalog(
    ctx: &ScriptContext,
    profile_id: Option<&str>,
    channel_id: Option<&str>,
) -> ScriptResult<()> {
    let categories = ensure_all(
        &ctx.query,
        &GraphQuery::new(EntityKind::ProductCategory),
        "name",
        &CATEGORIES,
        "product_category",
        |missing| {
            ctx.engine.run(
                CreateProductCategories,
                CreateProductCategoriesInput {
                    product_categories: missing
                        .iter()
                        .map(|name| ProductCategoryInput::active(name))
                        .collect(),
                },
            )
        },
    )
    .await?;
    let category_ids = index_by(&categories, "name");

    let products = catalog(&category_ids, profile_id, channel_id);
    let handles: Vec<String> = products.iter().filter_map(|p| p.handle.clone()).collect();
    let wanted: Vec<&str> = handles.iter().map(String::as_str).collect();
    ensure_all(
        &ctx.query,
        &GraphQuery::new(EntityKind::Product).fields(&["id", "handle"]),
        "handle",
        &wanted,
        "product",
        |missing| {
            let products = products
                .into_iter()
                .filter(|p| p.handle.as_ref().is_some_and(|h| missing.contains(h)))
                .collect();
            ctx.engine.run(CreateProducts, CreateProductsInput { products })
        },
    )
    .await?;
    Ok(())
}

/// Map `key` to id over `docs`.
fn index_by(docs: &[Document], key: &str) -> HashMap<String, String> {
    docs.iter()
        .filter_map(|d| Some((str_field(d, key)?.to_string(), str_field(d, "id")?.to_string())))
        .collect()
}

fn images(names: &[&str]) -> Vec<ImageInput> {
    names
        .iter()
        .map(|name| ImageInput {
            url: format!("{IMAGE_BASE}/{name}.png"),
        })
        .collect()
}

fn prices() -> Vec<Price> {
    vec![Price::new(PRODUCT_PRICE, CURRENCY)]
}

/// A product sold in sizes only, with SKUs `<PREFIX>-<SIZE>`.
fn sized_product(
    title: &str,
    handle: &str,
    description: &str,
    image_names: &[&str],
    sku_prefix: &str,
) -> ProductInput {
    ProductInput {
        title: title.to_string(),
        handle: Some(handle.to_string()),
        description: Some(description.to_string()),
        images: images(image_names),
        options: vec![ProductOptionInput::new("Size", &SIZES)],
        variants: SIZES
            .into_iter()
            .map(|size| {
                ProductVariantInput::new(size, &format!("{sku_prefix}-{size}"), &[("Size", size)], prices())
            })
            .collect(),
        ..Default::default()
    }
}

/// The four demo products, in the channel and under the given profile.
pub(crate) fn catalog(
    category_ids: &HashMap<String, String>,
    profile_id: Option<&str>,
    channel_id: Option<&str>,
) -> Vec<ProductInput> {
    let t_shirt = ProductInput {
        title: "Medusa T-Shirt".to_string(),
        handle: Some("t-shirt".to_string()),
        description: Some(
            "Reimagine the feeling of a classic T-shirt. With our cotton T-shirts, everyday essentials no longer have to be ordinary."
                .to_string(),
        ),
        images: images(&["tee-black-front", "tee-black-back", "tee-white-front", "tee-white-back"]),
        options: vec![
            ProductOptionInput::new("Size", &SIZES),
            ProductOptionInput::new("Color", &COLORS),
        ],
        variants: SIZES
            .into_iter()
            .flat_map(|size| {
                COLORS.into_iter().map(move |color| {
                    ProductVariantInput::new(
                        &format!("{size} / {color}"),
                        &format!("SHIRT-{size}-{}", color.to_uppercase()),
                        &[("Size", size), ("Color", color)],
                        prices(),
                    )
                })
            })
            .collect(),
        ..Default::default()
    };

    let entries = [
        ("Shirts", t_shirt),
        (
            "Sweatshirts",
            sized_product(
                "Medusa Sweatshirt",
                "sweatshirt",
                "Reimagine the feeling of a classic sweatshirt. With our cotton sweatshirt, everyday essentials no longer have to be ordinary.",
                &["sweatshirt-vintage-front", "sweatshirt-vintage-back"],
                "SWEATSHIRT",
            ),
        ),
        (
            "Pants",
            sized_product(
                "Medusa Sweatpants",
                "sweatpants",
                "Reimagine the feeling of classic sweatpants. With our cotton sweatpants, everyday essentials no longer have to be ordinary.",
                &["sweatpants-gray-front", "sweatpants-gray-back"],
                "SWEATPANTS",
            ),
        ),
        (
            "Merch",
            sized_product(
                "Medusa Shorts",
                "shorts",
                "Reimagine the feeling of classic shorts. With our cotton shorts, everyday essentials no longer have to be ordinary.",
                &["shorts-vintage-front", "shorts-vintage-back"],
                "SHORTS",
            ),
        ),
    ];

    entries
        .into_iter()
        .map(|(category, product)| ProductInput {
            weight: Some(PRODUCT_WEIGHT),
            status: ProductStatus::Published,
            shipping_profile_id: profile_id.map(str::to_string),
            category_ids: category_ids.get(category).cloned().into_iter().collect(),
            sales_channels: channel_id
                .map(|id| IdRef { id: id.to_string() })
                .into_iter()
                .collect(),
            ..product
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

async fn seed_inventory(ctx: &ScriptContext, location_id: &str) -> ScriptResult<()> {
    let items = ctx.query.list(EntityKind::InventoryItem, &[]).await?;
    let stocked = ctx
        .query
        .list(EntityKind::InventoryLevel, &[Filter::eq("location_id", location_id)])
        .await?;

    let levels: Vec<InventoryLevelInput> = items
        .iter()
        .filter_map(|item| str_field(item, "id"))
        .filter(|id| !stocked.iter().any(|l| str_field(l, "inventory_item_id") == Some(*id)))
        .map(|id| InventoryLevelInput::new(id, location_id, STOCK_PER_ITEM))
        .collect();

    if levels.is_empty() {
        tracing::info!(items = items.len(), "Every inventory item already stocked");
        return Ok(());
    }
    attempt(
        "create inventory levels",
        ctx.engine.run(
            CreateInventoryLevels,
            CreateInventoryLevelsInput {
                inventory_levels: levels,
            },
        ),
    )
    .await;
    Ok(())
}
