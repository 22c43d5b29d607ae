//! Entity kinds and module namespaces known to the provisioning tools.
//!
//! Kinds name the document collections of the commerce store. Modules name
//! the owning side of a link record (see `storefront_db::link`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// EntityKind
// ---------------------------------------------------------------------------

/// A document collection, or a record embedded inside one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Store,
    Region,
    TaxRegion,
    SalesChannel,
    ApiKey,
    StockLocation,
    FulfillmentSet,
    ServiceZone,
    ShippingProfile,
    ShippingOption,
    ProductCategory,
    Product,
    ProductVariant,
    InventoryItem,
    InventoryLevel,
}

impl EntityKind {
    /// Every top-level collection, in a stable order.
    pub const COLLECTIONS: [EntityKind; 13] = [
        EntityKind::Store,
        EntityKind::Region,
        EntityKind::TaxRegion,
        EntityKind::SalesChannel,
        EntityKind::ApiKey,
        EntityKind::StockLocation,
        EntityKind::FulfillmentSet,
        EntityKind::ShippingProfile,
        EntityKind::ShippingOption,
        EntityKind::ProductCategory,
        EntityKind::Product,
        EntityKind::InventoryItem,
        EntityKind::InventoryLevel,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Region => "region",
            Self::TaxRegion => "tax_region",
            Self::SalesChannel => "sales_channel",
            Self::ApiKey => "api_key",
            Self::StockLocation => "stock_location",
            Self::FulfillmentSet => "fulfillment_set",
            Self::ServiceZone => "service_zone",
            Self::ShippingProfile => "shipping_profile",
            Self::ShippingOption => "shipping_option",
            Self::ProductCategory => "product_category",
            Self::Product => "product",
            Self::ProductVariant => "product_variant",
            Self::InventoryItem => "inventory_item",
            Self::InventoryLevel => "inventory_level",
        }
    }

    /// Prefix used when generating identifiers for this kind.
    pub fn id_prefix(self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Region => "reg",
            Self::TaxRegion => "txreg",
            Self::SalesChannel => "sc",
            Self::ApiKey => "apk",
            Self::StockLocation => "sloc",
            Self::FulfillmentSet => "fuset",
            Self::ServiceZone => "serzo",
            Self::ShippingProfile => "sp",
            Self::ShippingOption => "so",
            Self::ProductCategory => "pcat",
            Self::Product => "prod",
            Self::ProductVariant => "variant",
            Self::InventoryItem => "iitem",
            Self::InventoryLevel => "ilev",
        }
    }

    /// Embedded kinds live inside another document and have no collection.
    pub fn is_embedded(self) -> bool {
        matches!(self, Self::ServiceZone | Self::ProductVariant)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "store" => Self::Store,
            "region" => Self::Region,
            "tax_region" => Self::TaxRegion,
            "sales_channel" => Self::SalesChannel,
            "api_key" => Self::ApiKey,
            "stock_location" => Self::StockLocation,
            "fulfillment_set" => Self::FulfillmentSet,
            "service_zone" => Self::ServiceZone,
            "shipping_profile" => Self::ShippingProfile,
            "shipping_option" => Self::ShippingOption,
            "product_category" => Self::ProductCategory,
            "product" => Self::Product,
            "product_variant" => Self::ProductVariant,
            "inventory_item" => Self::InventoryItem,
            "inventory_level" => Self::InventoryLevel,
            other => return Err(CoreError::Validation(format!("unknown entity kind '{other}'"))),
        };
        Ok(kind)
    }
}

// ---------------------------------------------------------------------------
// Module
// ---------------------------------------------------------------------------

/// Namespace owning one side of a link record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    ApiKey,
    Fulfillment,
    Inventory,
    Product,
    SalesChannel,
    StockLocation,
}

impl Module {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ApiKey => "api_key",
            Self::Fulfillment => "fulfillment",
            Self::Inventory => "inventory",
            Self::Product => "product",
            Self::SalesChannel => "sales_channel",
            Self::StockLocation => "stock_location",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let module = match s {
            "api_key" => Self::ApiKey,
            "fulfillment" => Self::Fulfillment,
            "inventory" => Self::Inventory,
            "product" => Self::Product,
            "sales_channel" => Self::SalesChannel,
            "stock_location" => Self::StockLocation,
            other => return Err(CoreError::Validation(format!("unknown module '{other}'"))),
        };
        Ok(module)
    }
}
