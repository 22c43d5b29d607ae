//! `create-stock-locations`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use storefront_core::EntityKind;
use storefront_db::document::Document;
use validator::Validate;

use crate::common::{to_value, validate_country_code};
use crate::engine::Workflow;
use crate::error::WorkflowResult;
use crate::transaction::Transaction;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AddressInput {
    #[serde(default)]
    pub address_1: String,
    pub city: Option<String>,
    #[validate(custom(function = "validate_country_code"))]
    pub country_code: String,
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StockLocationInput {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(nested)]
    pub address: Option<AddressInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateStockLocationsInput {
    #[validate(length(min = 1), nested)]
    pub locations: Vec<StockLocationInput>,
}

/// Create stock locations. Names are not unique: running twice creates two
/// locations, so callers guard by name first.
pub struct CreateStockLocations;

#[async_trait]
impl Workflow for CreateStockLocations {
    const NAME: &'static str = "create-stock-locations";
    type Input = CreateStockLocationsInput;
    type Output = Vec<Document>;

    async fn run(
        &self,
        tx: &mut Transaction,
        input: CreateStockLocationsInput,
    ) -> WorkflowResult<Vec<Document>> {
        let mut created = Vec::with_capacity(input.locations.len());
        for location in input.locations {
            let doc = tx
                .insert(
                    EntityKind::StockLocation,
                    json!({
                        "name": location.name,
                        "address": to_value(&location.address)?,
                    }),
                )
                .await?;
            created.push(doc);
        }
        Ok(created)
    }
}
