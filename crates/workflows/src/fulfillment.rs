//! Fulfillment workflows: shipping profiles, fulfillment sets with their
//! embedded service zones, and shipping options.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use storefront_core::countries::normalize_iso2;
use storefront_core::types::generate_id;
use storefront_core::{CoreError, EntityKind};
use storefront_db::document::{doc_id, str_field, Document};
use validator::Validate;

use crate::common::{to_value, validate_country_code, Price};
use crate::engine::Workflow;
use crate::error::WorkflowResult;
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Shipping profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ShippingProfileInput {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1))]
    pub profile_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateShippingProfilesInput {
    #[validate(length(min = 1), nested)]
    pub data: Vec<ShippingProfileInput>,
}

pub struct CreateShippingProfiles;

#[async_trait]
impl Workflow for CreateShippingProfiles {
    const NAME: &'static str = "create-shipping-profiles";
    type Input = CreateShippingProfilesInput;
    type Output = Vec<Document>;

    async fn run(
        &self,
        tx: &mut Transaction,
        input: CreateShippingProfilesInput,
    ) -> WorkflowResult<Vec<Document>> {
        let mut created = Vec::with_capacity(input.data.len());
        for profile in input.data {
            let doc = tx
                .insert(
                    EntityKind::ShippingProfile,
                    json!({"name": profile.name, "type": profile.profile_type}),
                )
                .await?;
            created.push(doc);
        }
        Ok(created)
    }
}

// ---------------------------------------------------------------------------
// Fulfillment sets & service zones
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoZoneType {
    #[default]
    Country,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GeoZoneInput {
    #[validate(custom(function = "validate_country_code"))]
    pub country_code: String,
    #[serde(default, rename = "type")]
    pub zone_type: GeoZoneType,
}

impl GeoZoneInput {
    pub fn country(code: &str) -> Self {
        Self {
            country_code: code.to_string(),
            zone_type: GeoZoneType::Country,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServiceZoneInput {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    #[validate(nested)]
    pub geo_zones: Vec<GeoZoneInput>,
}

impl ServiceZoneInput {
    pub fn countries(name: &str, codes: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            geo_zones: codes.iter().map(|c| GeoZoneInput::country(c)).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FulfillmentSetInput {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(rename = "type")]
    pub set_type: String,
    #[serde(default)]
    #[validate(nested)]
    pub service_zones: Vec<ServiceZoneInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateFulfillmentSetsInput {
    #[validate(length(min = 1), nested)]
    pub fulfillment_sets: Vec<FulfillmentSetInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateServiceZonesInput {
    #[validate(length(min = 1))]
    pub fulfillment_set_id: String,
    #[validate(length(min = 1), nested)]
    pub service_zones: Vec<ServiceZoneInput>,
}

fn zone_record(fulfillment_set_id: &str, zone: &ServiceZoneInput) -> WorkflowResult<Value> {
    let zone_id = generate_id(EntityKind::ServiceZone.id_prefix());
    let geo_zones = zone
        .geo_zones
        .iter()
        .map(|gz| -> WorkflowResult<Value> {
            let code = normalize_iso2(&gz.country_code).ok_or_else(|| {
                CoreError::Validation(format!("invalid country code '{}'", gz.country_code))
            })?;
            Ok(json!({
                "id": generate_id("fgz"),
                "type": to_value(&gz.zone_type)?,
                "country_code": code,
                "service_zone_id": zone_id,
            }))
        })
        .collect::<WorkflowResult<Vec<Value>>>()?;
    Ok(json!({
        "id": zone_id,
        "name": zone.name,
        "fulfillment_set_id": fulfillment_set_id,
        "geo_zones": geo_zones,
    }))
}

fn zone_names(set: &Document) -> Vec<String> {
    set.get("service_zones")
        .and_then(Value::as_array)
        .map(|zones| {
            zones
                .iter()
                .filter_map(|z| z.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Build the embedded zone records for `set_id`, rejecting a zone name that
/// already exists in the set or repeats within the batch.
fn new_zones(
    set_id: &str,
    mut taken: Vec<String>,
    zones: &[ServiceZoneInput],
) -> WorkflowResult<Vec<Value>> {
    let mut records = Vec::with_capacity(zones.len());
    for zone in zones {
        if taken.contains(&zone.name) {
            return Err(CoreError::AlreadyExists {
                entity: EntityKind::ServiceZone.as_str(),
                key: zone.name.clone(),
            }
            .into());
        }
        taken.push(zone.name.clone());
        records.push(zone_record(set_id, zone)?);
    }
    Ok(records)
}

pub struct CreateFulfillmentSets;

#[async_trait]
impl Workflow for CreateFulfillmentSets {
    const NAME: &'static str = "create-fulfillment-sets";
    type Input = CreateFulfillmentSetsInput;
    type Output = Vec<Document>;

    async fn run(
        &self,
        tx: &mut Transaction,
        input: CreateFulfillmentSetsInput,
    ) -> WorkflowResult<Vec<Document>> {
        let mut created = Vec::with_capacity(input.fulfillment_sets.len());
        for set in input.fulfillment_sets {
            let id = generate_id(EntityKind::FulfillmentSet.id_prefix());
            let zones = new_zones(&id, Vec::new(), &set.service_zones)?;
            let doc = tx
                .insert(
                    EntityKind::FulfillmentSet,
                    json!({
                        "id": id,
                        "name": set.name,
                        "type": set.set_type,
                        "service_zones": zones,
                    }),
                )
                .await?;
            created.push(doc);
        }
        Ok(created)
    }
}

/// Append service zones to an existing fulfillment set. Returns the new
/// zones.
pub struct CreateServiceZones;

#[async_trait]
impl Workflow for CreateServiceZones {
    const NAME: &'static str = "create-service-zones";
    type Input = CreateServiceZonesInput;
    type Output = Vec<Value>;

    async fn run(&self, tx: &mut Transaction, input: CreateServiceZonesInput) -> WorkflowResult<Vec<Value>> {
        let mut set = tx
            .require(EntityKind::FulfillmentSet, &input.fulfillment_set_id)
            .await?;
        let zones = new_zones(&input.fulfillment_set_id, zone_names(&set), &input.service_zones)?;

        let mut all = set
            .get("service_zones")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        all.extend(zones.iter().cloned());
        set.insert("service_zones".into(), Value::Array(all));
        tx.replace(EntityKind::FulfillmentSet, set).await?;
        Ok(zones)
    }
}

// ---------------------------------------------------------------------------
// Shipping options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    #[default]
    Flat,
    Calculated,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ShippingOptionType {
    #[validate(length(min = 1))]
    pub label: String,
    pub description: String,
    #[validate(length(min = 1))]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ShippingOptionRule {
    #[validate(length(min = 1))]
    pub attribute: String,
    pub operator: String,
    pub value: String,
}

impl ShippingOptionRule {
    pub fn eq(attribute: &str, value: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            operator: "eq".to_string(),
            value: value.to_string(),
        }
    }

    /// `enabled_in_store = true` and `is_return = false`.
    pub fn store_defaults() -> Vec<Self> {
        vec![Self::eq("enabled_in_store", "true"), Self::eq("is_return", "false")]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ShippingOptionInput {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub price_type: PriceType,
    pub provider_id: String,
    #[validate(length(min = 1))]
    pub service_zone_id: String,
    #[validate(length(min = 1))]
    pub shipping_profile_id: String,
    #[serde(rename = "type")]
    #[validate(nested)]
    pub option_type: ShippingOptionType,
    #[validate(nested)]
    pub prices: Vec<Price>,
    #[serde(default)]
    #[validate(nested)]
    pub rules: Vec<ShippingOptionRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateShippingOptionsInput {
    #[validate(length(min = 1), nested)]
    pub shipping_options: Vec<ShippingOptionInput>,
}

/// Ids of every service zone embedded in any fulfillment set.
async fn service_zone_ids(tx: &Transaction) -> WorkflowResult<Vec<String>> {
    let mut ids = Vec::new();
    for set in tx.list(EntityKind::FulfillmentSet).await? {
        if let Some(zones) = set.get("service_zones").and_then(Value::as_array) {
            ids.extend(
                zones
                    .iter()
                    .filter_map(|z| z.get("id").and_then(Value::as_str))
                    .map(str::to_string),
            );
        }
    }
    Ok(ids)
}

/// Create shipping options as one atomic batch: if any option fails, the
/// ones created before it are reverted.
pub struct CreateShippingOptions;

#[async_trait]
impl Workflow for CreateShippingOptions {
    const NAME: &'static str = "create-shipping-options";
    type Input = CreateShippingOptionsInput;
    type Output = Vec<Document>;

    async fn run(
        &self,
        tx: &mut Transaction,
        input: CreateShippingOptionsInput,
    ) -> WorkflowResult<Vec<Document>> {
        let zones = service_zone_ids(tx).await?;
        let mut created = Vec::with_capacity(input.shipping_options.len());
        for option in input.shipping_options {
            if !zones.contains(&option.service_zone_id) {
                return Err(CoreError::not_found(
                    EntityKind::ServiceZone.as_str(),
                    option.service_zone_id,
                )
                .into());
            }
            let profile = tx
                .require(EntityKind::ShippingProfile, &option.shipping_profile_id)
                .await?;
            let prices: Vec<Value> = option.prices.iter().map(Price::to_record).collect();
            let doc = tx
                .insert(
                    EntityKind::ShippingOption,
                    json!({
                        "name": option.name,
                        "price_type": to_value(&option.price_type)?,
                        "provider_id": option.provider_id,
                        "service_zone_id": option.service_zone_id,
                        "shipping_profile_id": doc_id(&profile)?,
                        "type": to_value(&option.option_type)?,
                        "prices": prices,
                        "rules": to_value(&option.rules)?,
                    }),
                )
                .await?;
            tracing::debug!(
                option = str_field(&doc, "name").unwrap_or_default(),
                "Shipping option created"
            );
            created.push(doc);
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_records_embed_geo_zones() {
        let zone = ServiceZoneInput::countries("Europe", &["GB", "de"]);
        let record = zone_record("fuset_1", &zone).unwrap();
        assert_eq!(record["name"], "Europe");
        assert_eq!(record["fulfillment_set_id"], "fuset_1");
        let codes: Vec<&str> = record["geo_zones"]
            .as_array()
            .unwrap()
            .iter()
            .map(|g| g["country_code"].as_str().unwrap())
            .collect();
        assert_eq!(codes, ["gb", "de"]);
        assert_eq!(record["geo_zones"][0]["type"], "country");
    }

    #[test]
    fn duplicate_zone_names_are_rejected() {
        let zones = [
            ServiceZoneInput::countries("Pakistan", &["pk"]),
            ServiceZoneInput::countries("Pakistan", &["pk"]),
        ];
        let err = new_zones("fuset_1", Vec::new(), &zones).unwrap_err();
        assert!(err.is_already_exists());

        let err = new_zones("fuset_1", vec!["Europe".into()], &[ServiceZoneInput::countries("Europe", &["de"])])
            .unwrap_err();
        assert!(err.is_already_exists());
    }
}
