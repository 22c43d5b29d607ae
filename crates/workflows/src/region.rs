//! Region and tax region workflows.
//!
//! A country belongs to at most one region; assigning a country that is
//! already taken by another region is a conflict.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use storefront_core::countries::{display_name, normalize_iso2};
use storefront_core::{CoreError, EntityKind};
use storefront_db::document::{doc_id, str_field, Document};
use validator::Validate;

use crate::common::{validate_country_code, validate_country_codes, validate_currency_code};
use crate::engine::Workflow;
use crate::error::WorkflowResult;
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegionInput {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(custom(function = "validate_currency_code"))]
    pub currency_code: String,
    #[serde(default)]
    #[validate(custom(function = "validate_country_codes"))]
    pub countries: Vec<String>,
    #[serde(default)]
    pub payment_providers: Vec<String>,
    #[serde(default)]
    pub automatic_taxes: Option<bool>,
}

impl RegionInput {
    pub fn new(name: &str, currency_code: &str, countries: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            currency_code: currency_code.to_string(),
            countries: countries.iter().map(|c| c.to_string()).collect(),
            payment_providers: Vec::new(),
            automatic_taxes: None,
        }
    }

    pub fn with_payment_provider(mut self, provider_id: &str) -> Self {
        self.payment_providers.push(provider_id.to_string());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRegionsInput {
    #[validate(length(min = 1), nested)]
    pub regions: Vec<RegionInput>,
}

/// Regions to update; no criteria selects every region.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionSelector {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RegionUpdate {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(length(equal = 3))]
    pub currency_code: Option<String>,
    pub countries: Option<Vec<String>>,
    pub payment_providers: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateRegionsInput {
    pub selector: RegionSelector,
    #[validate(nested)]
    pub update: RegionUpdate,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeleteRegionsInput {
    #[validate(length(min = 1))]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TaxRegionInput {
    #[validate(custom(function = "validate_country_code"))]
    pub country_code: String,
    pub provider_id: Option<String>,
    pub parent_id: Option<String>,
}

impl TaxRegionInput {
    pub fn new(country_code: &str, provider_id: &str) -> Self {
        Self {
            country_code: country_code.to_string(),
            provider_id: Some(provider_id.to_string()),
            parent_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTaxRegionsInput {
    #[validate(length(min = 1), nested)]
    pub tax_regions: Vec<TaxRegionInput>,
}

// ---------------------------------------------------------------------------
// Country ownership
// ---------------------------------------------------------------------------

/// Country code to owning region name, over all stored regions.
async fn country_owners(tx: &Transaction) -> WorkflowResult<HashMap<String, (String, String)>> {
    let mut owners = HashMap::new();
    for region in tx.list(EntityKind::Region).await? {
        let id = doc_id(&region)?.to_string();
        let name = str_field(&region, "name").unwrap_or_default().to_string();
        let countries = region
            .get("countries")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for country in countries {
            if let Some(code) = country.get("iso_2").and_then(Value::as_str) {
                owners.insert(code.to_string(), (id.clone(), name.clone()));
            }
        }
    }
    Ok(owners)
}

/// Normalise `codes` and claim them for `region_id`, failing on any code
/// already owned by a different region.
fn claim_countries(
    owners: &mut HashMap<String, (String, String)>,
    region_id: &str,
    region_name: &str,
    codes: &[String],
) -> WorkflowResult<Vec<Value>> {
    let mut records = Vec::with_capacity(codes.len());
    for raw in codes {
        let code = normalize_iso2(raw)
            .ok_or_else(|| CoreError::Validation(format!("invalid country code '{raw}'")))?;
        if let Some((owner_id, owner_name)) = owners.get(&code) {
            if owner_id != region_id {
                return Err(CoreError::Conflict(format!(
                    "Country {code} is already assigned to region {owner_name}"
                ))
                .into());
            }
        }
        owners.insert(code.clone(), (region_id.to_string(), region_name.to_string()));
        let name = display_name(&code);
        records.push(json!({
            "iso_2": code,
            "name": name.to_uppercase(),
            "display_name": name,
            "region_id": region_id,
        }));
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

pub struct CreateRegions;

#[async_trait]
impl Workflow for CreateRegions {
    const NAME: &'static str = "create-regions";
    type Input = CreateRegionsInput;
    type Output = Vec<Document>;

    async fn run(&self, tx: &mut Transaction, input: CreateRegionsInput) -> WorkflowResult<Vec<Document>> {
        let mut owners = country_owners(tx).await?;
        let mut created = Vec::with_capacity(input.regions.len());
        for region in input.regions {
            let id = storefront_core::types::generate_id(EntityKind::Region.id_prefix());
            let countries = claim_countries(&mut owners, &id, &region.name, &region.countries)?;
            let doc = tx
                .insert(
                    EntityKind::Region,
                    json!({
                        "id": id,
                        "name": region.name,
                        "currency_code": region.currency_code.to_ascii_lowercase(),
                        "automatic_taxes": region.automatic_taxes.unwrap_or(true),
                        "payment_providers": region.payment_providers,
                        "countries": countries,
                    }),
                )
                .await?;
            created.push(doc);
        }
        Ok(created)
    }
}

pub struct UpdateRegions;

#[async_trait]
impl Workflow for UpdateRegions {
    const NAME: &'static str = "update-regions";
    type Input = UpdateRegionsInput;
    type Output = Vec<Document>;

    async fn run(&self, tx: &mut Transaction, input: UpdateRegionsInput) -> WorkflowResult<Vec<Document>> {
        let selector = &input.selector;
        let regions: Vec<Document> = tx
            .list(EntityKind::Region)
            .await?
            .into_iter()
            .filter(|r| {
                selector.id.as_deref().map_or(true, |id| doc_id(r).ok() == Some(id))
                    && selector
                        .name
                        .as_deref()
                        .map_or(true, |name| str_field(r, "name") == Some(name))
            })
            .collect();

        let mut owners = country_owners(tx).await?;
        let update = input.update;
        let mut updated = Vec::with_capacity(regions.len());
        for mut region in regions {
            let id = doc_id(&region)?.to_string();
            if let Some(name) = &update.name {
                region.insert("name".into(), json!(name));
            }
            if let Some(code) = &update.currency_code {
                region.insert("currency_code".into(), json!(code.to_ascii_lowercase()));
            }
            if let Some(providers) = &update.payment_providers {
                region.insert("payment_providers".into(), json!(providers));
            }
            if let Some(codes) = &update.countries {
                owners.retain(|_, (owner, _)| owner != &id);
                let name = str_field(&region, "name").unwrap_or_default().to_string();
                let countries = claim_countries(&mut owners, &id, &name, codes)?;
                region.insert("countries".into(), Value::Array(countries));
            }
            updated.push(tx.replace(EntityKind::Region, region).await?);
        }
        Ok(updated)
    }
}

/// Delete regions by id. Ids that do not exist are skipped; the output lists
/// the ids actually removed.
pub struct DeleteRegions;

#[async_trait]
impl Workflow for DeleteRegions {
    const NAME: &'static str = "delete-regions";
    type Input = DeleteRegionsInput;
    type Output = Vec<String>;

    async fn run(&self, tx: &mut Transaction, input: DeleteRegionsInput) -> WorkflowResult<Vec<String>> {
        let mut deleted = Vec::with_capacity(input.ids.len());
        for id in input.ids {
            if tx.delete(EntityKind::Region, &id).await? {
                deleted.push(id);
            }
        }
        Ok(deleted)
    }
}

pub struct CreateTaxRegions;

#[async_trait]
impl Workflow for CreateTaxRegions {
    const NAME: &'static str = "create-tax-regions";
    type Input = CreateTaxRegionsInput;
    type Output = Vec<Document>;

    async fn run(&self, tx: &mut Transaction, input: CreateTaxRegionsInput) -> WorkflowResult<Vec<Document>> {
        let mut created = Vec::with_capacity(input.tax_regions.len());
        for tax_region in input.tax_regions {
            if let Some(parent) = &tax_region.parent_id {
                tx.require(EntityKind::TaxRegion, parent).await?;
            }
            let doc = tx
                .insert(
                    EntityKind::TaxRegion,
                    json!({
                        "country_code": tax_region.country_code.to_ascii_lowercase(),
                        "provider_id": tax_region.provider_id,
                        "parent_id": tax_region.parent_id,
                    }),
                )
                .await?;
            created.push(doc);
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claiming_a_taken_country_conflicts() {
        let mut owners = HashMap::new();
        owners.insert("pk".to_string(), ("reg_1".to_string(), "Pakistan".to_string()));

        let err = claim_countries(&mut owners, "reg_2", "Asia", &["PK".to_string()]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Conflict: Country pk is already assigned to region Pakistan"
        );
    }

    #[test]
    fn reclaiming_own_country_is_allowed() {
        let mut owners = HashMap::new();
        owners.insert("pk".to_string(), ("reg_1".to_string(), "Pakistan".to_string()));

        let records = claim_countries(&mut owners, "reg_1", "Pakistan", &["pk".to_string()]).unwrap();
        assert_eq!(records[0]["iso_2"], "pk");
        assert_eq!(records[0]["display_name"], "Pakistan");
    }

    #[test]
    fn region_input_validates_codes() {
        assert!(RegionInput::new("Pakistan", "pkr", &["pk"]).validate().is_ok());
        assert!(RegionInput::new("Pakistan", "rupee", &["pk"]).validate().is_err());
        assert!(RegionInput::new("Pakistan", "pkr", &["pak"]).validate().is_err());
    }
}
