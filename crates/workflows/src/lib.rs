//! Named, validated, compensating workflows over the storefront entity
//! graph.
//!
//! Each workflow is a unit struct implementing [`Workflow`] with a typed,
//! `validator`-checked input. [`WorkflowEngine::run`] executes it against a
//! [`Transaction`]: either every write of the run is kept, or none is.

pub mod api_key;
pub mod common;
pub mod engine;
pub mod error;
pub mod fulfillment;
pub mod inventory;
pub mod product;
pub mod region;
pub mod sales_channel;
pub mod stock_location;
pub mod store;
pub mod transaction;

pub use engine::{ExecutionStatus, Workflow, WorkflowEngine, WorkflowExecution};
pub use error::{WorkflowError, WorkflowResult};
pub use transaction::Transaction;

use api_key::CreateApiKeys;
use fulfillment::{
    CreateFulfillmentSets, CreateServiceZones, CreateShippingOptions, CreateShippingProfiles,
};
use inventory::{CreateInventoryLevels, UpdateInventoryLevel};
use product::{CreateProductCategories, CreateProducts};
use region::{CreateRegions, CreateTaxRegions, DeleteRegions, UpdateRegions};
use sales_channel::{
    CreateSalesChannels, LinkSalesChannelsToApiKey, LinkSalesChannelsToStockLocation,
};
use stock_location::CreateStockLocations;
use store::{CreateStores, UpdateStoreCurrencies, UpdateStores};

/// Every workflow name, in the order a full provisioning run uses them.
pub const WORKFLOW_NAMES: [&str; 20] = [
    CreateStores::NAME,
    UpdateStores::NAME,
    UpdateStoreCurrencies::NAME,
    CreateRegions::NAME,
    UpdateRegions::NAME,
    DeleteRegions::NAME,
    CreateTaxRegions::NAME,
    CreateSalesChannels::NAME,
    CreateApiKeys::NAME,
    CreateStockLocations::NAME,
    CreateShippingProfiles::NAME,
    CreateFulfillmentSets::NAME,
    CreateServiceZones::NAME,
    CreateShippingOptions::NAME,
    CreateProductCategories::NAME,
    CreateProducts::NAME,
    CreateInventoryLevels::NAME,
    UpdateInventoryLevel::NAME,
    LinkSalesChannelsToApiKey::NAME,
    LinkSalesChannelsToStockLocation::NAME,
];
