//! Integration tests for the named workflows against the in-memory store.
//!
//! Covers:
//! - region country ownership conflicts
//! - atomic shipping option batches
//! - products creating inventory items and links
//! - incremental sales channel links
//! - inventory level creation and update

use std::sync::Arc;

use assert_matches::assert_matches;
use storefront_core::{CoreError, EntityKind};
use storefront_db::document::{doc_id, str_field};
use storefront_db::{DocumentStore, GraphQuery, LinkSide, Linker, MemoryStore, Query};
use storefront_events::EventBus;
use storefront_workflows::api_key::{ApiKeyInput, CreateApiKeys, CreateApiKeysInput};
use storefront_workflows::common::Price;
use storefront_workflows::fulfillment::*;
use storefront_workflows::inventory::*;
use storefront_workflows::product::*;
use storefront_workflows::region::*;
use storefront_workflows::sales_channel::*;
use storefront_workflows::stock_location::*;
use storefront_workflows::{ExecutionStatus, WorkflowEngine, WorkflowError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn setup() -> (Arc<MemoryStore>, WorkflowEngine) {
    let store = Arc::new(MemoryStore::new());
    let engine = WorkflowEngine::new(store.clone(), Arc::new(EventBus::default()));
    (store, engine)
}

async fn create_channel(engine: &WorkflowEngine, name: &str) -> String {
    let created = engine
        .run(
            CreateSalesChannels,
            CreateSalesChannelsInput {
                sales_channels: vec![SalesChannelInput::new(name)],
            },
        )
        .await
        .unwrap();
    doc_id(&created[0]).unwrap().to_string()
}

async fn create_location(engine: &WorkflowEngine) -> String {
    let created = engine
        .run(
            CreateStockLocations,
            CreateStockLocationsInput {
                locations: vec![StockLocationInput {
                    name: "European Warehouse".into(),
                    address: None,
                }],
            },
        )
        .await
        .unwrap();
    doc_id(&created[0]).unwrap().to_string()
}

/// A default profile and a fulfillment set with one zone; returns
/// `(profile_id, zone_id)`.
async fn create_fulfillment(engine: &WorkflowEngine) -> (String, String) {
    let profiles = engine
        .run(
            CreateShippingProfiles,
            CreateShippingProfilesInput {
                data: vec![ShippingProfileInput {
                    name: "Default Shipping Profile".into(),
                    profile_type: "default".into(),
                }],
            },
        )
        .await
        .unwrap();
    let sets = engine
        .run(
            CreateFulfillmentSets,
            CreateFulfillmentSetsInput {
                fulfillment_sets: vec![FulfillmentSetInput {
                    name: "European Warehouse delivery".into(),
                    set_type: "shipping".into(),
                    service_zones: vec![ServiceZoneInput::countries("Europe", &["gb", "de"])],
                }],
            },
        )
        .await
        .unwrap();
    let zone_id = sets[0]["service_zones"][0]["id"].as_str().unwrap().to_string();
    (doc_id(&profiles[0]).unwrap().to_string(), zone_id)
}

fn option(name: &str, zone_id: &str, profile_id: &str) -> ShippingOptionInput {
    ShippingOptionInput {
        name: name.into(),
        price_type: PriceType::Flat,
        provider_id: "manual_manual".into(),
        service_zone_id: zone_id.into(),
        shipping_profile_id: profile_id.into(),
        option_type: ShippingOptionType {
            label: "Standard".into(),
            description: "Ship in 2-3 days.".into(),
            code: "standard".into(),
        },
        prices: vec![Price::new(1000, "pkr")],
        rules: ShippingOptionRule::store_defaults(),
    }
}

// ---------------------------------------------------------------------------
// Regions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn country_can_belong_to_one_region_only() {
    let (store, engine) = setup();
    engine
        .run(
            CreateRegions,
            CreateRegionsInput {
                regions: vec![RegionInput::new("Pakistan", "PKR", &["pk"])],
            },
        )
        .await
        .unwrap();

    let err = engine
        .run(
            CreateRegions,
            CreateRegionsInput {
                regions: vec![RegionInput::new("South Asia", "pkr", &["PK"])],
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, WorkflowError::Core(CoreError::Conflict(_)));

    let regions = store.list(EntityKind::Region).await.unwrap();
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0]["currency_code"], "pkr");
}

#[tokio::test]
async fn deleted_regions_free_their_countries() {
    let (_store, engine) = setup();
    let created = engine
        .run(
            CreateRegions,
            CreateRegionsInput {
                regions: vec![RegionInput::new("Europe", "eur", &["pk", "de"])],
            },
        )
        .await
        .unwrap();
    let id = doc_id(&created[0]).unwrap().to_string();

    let deleted = engine
        .run(DeleteRegions, DeleteRegionsInput { ids: vec![id, "reg_missing".into()] })
        .await
        .unwrap();
    assert_eq!(deleted.len(), 1);

    engine
        .run(
            CreateRegions,
            CreateRegionsInput {
                regions: vec![RegionInput::new("Pakistan", "pkr", &["pk"])],
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn update_regions_replaces_countries() {
    let (store, engine) = setup();
    engine
        .run(
            CreateRegions,
            CreateRegionsInput {
                regions: vec![RegionInput::new("Pakistan", "pkr", &["pk"])],
            },
        )
        .await
        .unwrap();
    engine
        .run(
            UpdateRegions,
            UpdateRegionsInput {
                selector: RegionSelector {
                    name: Some("Pakistan".into()),
                    ..Default::default()
                },
                update: RegionUpdate {
                    countries: Some(vec!["pk".into(), "ae".into()]),
                    ..Default::default()
                },
            },
        )
        .await
        .unwrap();

    let regions = store.list(EntityKind::Region).await.unwrap();
    assert_eq!(regions[0]["countries"].as_array().unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Shipping options
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shipping_option_batch_is_atomic() {
    let (store, engine) = setup();
    let (profile_id, zone_id) = create_fulfillment(&engine).await;

    let err = engine
        .run(
            CreateShippingOptions,
            CreateShippingOptionsInput {
                shipping_options: vec![
                    option("Standard Shipping", &zone_id, &profile_id),
                    option("Express Shipping", "serzo_missing", &profile_id),
                ],
            },
        )
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(store.list(EntityKind::ShippingOption).await.unwrap().is_empty());
    let last = engine.executions().pop().unwrap();
    assert_eq!(last.status, ExecutionStatus::Compensated);
}

#[tokio::test]
async fn repeated_shipping_options_are_already_exists() {
    let (store, engine) = setup();
    let (profile_id, zone_id) = create_fulfillment(&engine).await;
    let input = || CreateShippingOptionsInput {
        shipping_options: vec![
            option("Standard Shipping", &zone_id, &profile_id),
            option("Express Shipping", &zone_id, &profile_id),
        ],
    };

    engine.run(CreateShippingOptions, input()).await.unwrap();
    let err = engine.run(CreateShippingOptions, input()).await.unwrap_err();
    assert!(err.is_already_exists());
    assert_eq!(store.list(EntityKind::ShippingOption).await.unwrap().len(), 2);
}

#[tokio::test]
async fn service_zones_are_appended_to_a_set() {
    let (store, engine) = setup();
    create_fulfillment(&engine).await;
    let set_id = doc_id(&store.list(EntityKind::FulfillmentSet).await.unwrap()[0])
        .unwrap()
        .to_string();

    let zones = engine
        .run(
            CreateServiceZones,
            CreateServiceZonesInput {
                fulfillment_set_id: set_id,
                service_zones: vec![ServiceZoneInput::countries("Pakistan", &["pk"])],
            },
        )
        .await
        .unwrap();
    assert_eq!(zones[0]["geo_zones"][0]["country_code"], "pk");

    let sets = store.list(EntityKind::FulfillmentSet).await.unwrap();
    assert_eq!(sets[0]["service_zones"].as_array().unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Products & inventory
// ---------------------------------------------------------------------------

#[tokio::test]
async fn products_get_inventory_items_and_channel_links() {
    let (store, engine) = setup();
    let channel_id = create_channel(&engine, "Default Sales Channel").await;
    let categories = engine
        .run(
            CreateProductCategories,
            CreateProductCategoriesInput {
                product_categories: vec![ProductCategoryInput::active("Shirts")],
            },
        )
        .await
        .unwrap();
    assert_eq!(categories[0]["handle"], "shirts");

    let product = ProductInput {
        title: "Medusa T-Shirt".into(),
        handle: Some("t-shirt".into()),
        status: ProductStatus::Published,
        category_ids: vec![doc_id(&categories[0]).unwrap().to_string()],
        options: vec![ProductOptionInput::new("Size", &["S", "M"])],
        variants: vec![
            ProductVariantInput::new("S", "SHIRT-S", &[("Size", "S")], vec![Price::new(3000, "pkr")]),
            ProductVariantInput::new("M", "SHIRT-M", &[("Size", "M")], vec![Price::new(3000, "pkr")]),
        ],
        sales_channels: vec![IdRef { id: channel_id.clone() }],
        ..Default::default()
    };
    engine
        .run(CreateProducts, CreateProductsInput { products: vec![product] })
        .await
        .unwrap();

    assert_eq!(store.count(EntityKind::InventoryItem).await, 2);

    let query = Query::new(store.clone());
    let products = query
        .graph(
            &GraphQuery::new(EntityKind::Product)
                .fields(&["title", "variants.inventory.sku", "categories.name"])
                .filter("sales_channels.id", channel_id.as_str()),
        )
        .await
        .unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["categories"][0]["name"], "Shirts");
    assert_eq!(products[0]["variants"][1]["inventory"][0]["sku"], "SHIRT-M");
}

#[tokio::test]
async fn duplicate_sku_rolls_back_the_product() {
    let (store, engine) = setup();
    let product = |handle: &str| ProductInput {
        title: handle.into(),
        handle: Some(handle.into()),
        variants: vec![ProductVariantInput::new("One", "SKU-1", &[], vec![])],
        ..Default::default()
    };
    engine
        .run(CreateProducts, CreateProductsInput { products: vec![product("a")] })
        .await
        .unwrap();
    let err = engine
        .run(CreateProducts, CreateProductsInput { products: vec![product("b")] })
        .await
        .unwrap_err();

    assert!(err.is_already_exists());
    assert_eq!(store.count(EntityKind::Product).await, 1);
    assert_eq!(store.count(EntityKind::InventoryItem).await, 1);
}

#[tokio::test]
async fn inventory_levels_are_created_and_updated() {
    let (store, engine) = setup();
    let location_id = create_location(&engine).await;
    engine
        .run(
            CreateProducts,
            CreateProductsInput {
                products: vec![ProductInput {
                    title: "Shorts".into(),
                    variants: vec![ProductVariantInput::new("L", "SHORTS-L", &[], vec![])],
                    ..Default::default()
                }],
            },
        )
        .await
        .unwrap();
    let item_id = doc_id(&store.list(EntityKind::InventoryItem).await.unwrap()[0])
        .unwrap()
        .to_string();

    let err = engine
        .run(UpdateInventoryLevel, InventoryLevelInput::new(&item_id, &location_id, 5))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    engine
        .run(
            CreateInventoryLevels,
            CreateInventoryLevelsInput {
                inventory_levels: vec![InventoryLevelInput::new(&item_id, &location_id, 1000)],
            },
        )
        .await
        .unwrap();
    let updated = engine
        .run(UpdateInventoryLevel, InventoryLevelInput::new(&item_id, &location_id, 25))
        .await
        .unwrap();
    assert_eq!(updated["stocked_quantity"], 25);

    let err = engine
        .run(
            CreateInventoryLevels,
            CreateInventoryLevelsInput {
                inventory_levels: vec![InventoryLevelInput::new(&item_id, &location_id, 1)],
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_already_exists());
}

#[tokio::test]
async fn negative_stock_is_invalid() {
    let (_store, engine) = setup();
    let err = engine
        .run(UpdateInventoryLevel, InventoryLevelInput::new("iitem_1", "sloc_1", -1))
        .await
        .unwrap_err();
    assert_matches!(err, WorkflowError::InvalidInput { .. });
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sales_channel_links_are_incremental() {
    let (store, engine) = setup();
    let channel_id = create_channel(&engine, "Default Sales Channel").await;
    let keys = engine
        .run(
            CreateApiKeys,
            CreateApiKeysInput {
                api_keys: vec![ApiKeyInput::publishable("Webshop")],
            },
        )
        .await
        .unwrap();
    let key_id = doc_id(&keys[0]).unwrap().to_string();
    assert!(str_field(&keys[0], "token").unwrap().starts_with("pk_"));

    let first = engine
        .run(LinkSalesChannelsToApiKey, LinkSalesChannelsInput::add(&key_id, &[channel_id.as_str()]))
        .await
        .unwrap();
    assert_eq!(first.created.len(), 1);

    let second = engine
        .run(LinkSalesChannelsToApiKey, LinkSalesChannelsInput::add(&key_id, &[channel_id.as_str()]))
        .await
        .unwrap();
    assert!(second.created.is_empty());

    let linker = Linker::new(store.clone());
    assert_eq!(linker.list(Some(&LinkSide::api_key(&key_id))).await.unwrap().len(), 1);

    let removed = engine
        .run(
            LinkSalesChannelsToApiKey,
            LinkSalesChannelsInput {
                id: key_id.clone(),
                add: vec![],
                remove: vec![channel_id],
            },
        )
        .await
        .unwrap();
    assert_eq!(removed.dismissed.len(), 1);
    assert!(linker.list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn stock_location_link_requires_existing_channel() {
    let (store, engine) = setup();
    let location_id = create_location(&engine).await;
    let err = engine
        .run(
            LinkSalesChannelsToStockLocation,
            LinkSalesChannelsInput::add(&location_id, &["sc_missing"]),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(store.list_links().await.unwrap().is_empty());
}
