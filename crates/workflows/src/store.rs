//! Store singleton workflows: `create-stores`, `update-stores` and
//! `update-store-currencies`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use storefront_core::{CoreError, EntityKind};
use storefront_db::document::{doc_id, Document};
use validator::Validate;

use crate::common::{to_value, validate_currency_code};
use crate::engine::Workflow;
use crate::error::WorkflowResult;
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StoreCurrency {
    #[validate(custom(function = "validate_currency_code"))]
    pub currency_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

impl StoreCurrency {
    pub fn new(currency_code: &str, is_default: bool) -> Self {
        Self {
            currency_code: currency_code.to_string(),
            is_default: Some(is_default),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Locale {
    #[validate(length(min = 2))]
    pub locale_code: String,
}

impl Locale {
    pub fn new(code: &str) -> Self {
        Self {
            locale_code: code.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct StoreInput {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    #[validate(nested)]
    pub supported_currencies: Vec<StoreCurrency>,
    #[serde(default)]
    #[validate(nested)]
    pub supported_locales: Vec<Locale>,
    pub default_sales_channel_id: Option<String>,
    pub default_region_id: Option<String>,
    pub default_location_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateStoresInput {
    #[validate(length(min = 1), nested)]
    pub stores: Vec<StoreInput>,
}

/// Selects the stores to update; no id selects every store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSelector {
    pub id: Option<String>,
}

/// Fields to overwrite. Each provided field replaces the stored value
/// wholesale; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_locales: Option<Vec<Locale>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_currencies: Option<Vec<StoreCurrency>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_sales_channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_region_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_location_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateStoresInput {
    pub selector: StoreSelector,
    pub update: StoreUpdate,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateStoreCurrenciesInput {
    #[validate(length(min = 1))]
    pub store_id: String,
    #[validate(length(min = 1), nested)]
    pub supported_currencies: Vec<StoreCurrency>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Lower-case codes and default `is_default` to `false`. At most one
/// currency may be the default.
fn normalize_currencies(currencies: &[StoreCurrency]) -> WorkflowResult<Vec<StoreCurrency>> {
    let normalized: Vec<StoreCurrency> = currencies
        .iter()
        .map(|c| StoreCurrency {
            currency_code: c.currency_code.to_ascii_lowercase(),
            is_default: Some(c.is_default.unwrap_or(false)),
        })
        .collect();
    let defaults = normalized
        .iter()
        .filter(|c| c.is_default == Some(true))
        .count();
    if defaults > 1 {
        return Err(CoreError::Validation("only one default currency is allowed".into()).into());
    }
    Ok(normalized)
}

/// Ensure every referenced default entity exists.
async fn check_defaults(
    tx: &Transaction,
    sales_channel: Option<&str>,
    region: Option<&str>,
    location: Option<&str>,
) -> WorkflowResult<()> {
    let refs = [
        (EntityKind::SalesChannel, sales_channel),
        (EntityKind::Region, region),
        (EntityKind::StockLocation, location),
    ];
    for (kind, id) in refs {
        if let Some(id) = id {
            tx.require(kind, id).await?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

pub struct CreateStores;

#[async_trait]
impl Workflow for CreateStores {
    const NAME: &'static str = "create-stores";
    type Input = CreateStoresInput;
    type Output = Vec<Document>;

    async fn run(&self, tx: &mut Transaction, input: CreateStoresInput) -> WorkflowResult<Vec<Document>> {
        let mut created = Vec::with_capacity(input.stores.len());
        for store in input.stores {
            check_defaults(
                tx,
                store.default_sales_channel_id.as_deref(),
                store.default_region_id.as_deref(),
                store.default_location_id.as_deref(),
            )
            .await?;
            let currencies = normalize_currencies(&store.supported_currencies)?;
            let doc = tx
                .insert(
                    EntityKind::Store,
                    json!({
                        "name": store.name,
                        "supported_currencies": to_value(&currencies)?,
                        "supported_locales": to_value(&store.supported_locales)?,
                        "default_sales_channel_id": store.default_sales_channel_id,
                        "default_region_id": store.default_region_id,
                        "default_location_id": store.default_location_id,
                    }),
                )
                .await?;
            created.push(doc);
        }
        Ok(created)
    }
}

pub struct UpdateStores;

#[async_trait]
impl Workflow for UpdateStores {
    const NAME: &'static str = "update-stores";
    type Input = UpdateStoresInput;
    type Output = Vec<Document>;

    async fn run(&self, tx: &mut Transaction, input: UpdateStoresInput) -> WorkflowResult<Vec<Document>> {
        let update = &input.update;
        check_defaults(
            tx,
            update.default_sales_channel_id.as_deref(),
            update.default_region_id.as_deref(),
            update.default_location_id.as_deref(),
        )
        .await?;

        let mut patch = to_value(update)?;
        if let Some(currencies) = &update.supported_currencies {
            patch["supported_currencies"] = to_value(&normalize_currencies(currencies)?)?;
        }

        let stores = match &input.selector.id {
            Some(id) => vec![tx.require(EntityKind::Store, id).await?],
            None => tx.list(EntityKind::Store).await?,
        };

        let mut updated = Vec::with_capacity(stores.len());
        for mut store in stores {
            if let Value::Object(fields) = &patch {
                for (key, value) in fields {
                    store.insert(key.clone(), value.clone());
                }
            }
            let store_id = doc_id(&store)?.to_string();
            tracing::debug!(store_id = %store_id, "Updating store");
            updated.push(tx.replace(EntityKind::Store, store).await?);
        }
        Ok(updated)
    }
}

/// Replace a store's supported currencies. Currencies without an explicit
/// `is_default` are stored as non-default.
pub struct UpdateStoreCurrencies;

#[async_trait]
impl Workflow for UpdateStoreCurrencies {
    const NAME: &'static str = "update-store-currencies";
    type Input = UpdateStoreCurrenciesInput;
    type Output = Document;

    async fn run(
        &self,
        tx: &mut Transaction,
        input: UpdateStoreCurrenciesInput,
    ) -> WorkflowResult<Document> {
        let currencies = normalize_currencies(&input.supported_currencies)?;
        let mut store = tx.require(EntityKind::Store, &input.store_id).await?;
        store.insert("supported_currencies".into(), to_value(&currencies)?);
        tx.replace(EntityKind::Store, store).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_is_default_becomes_false() {
        let normalized = normalize_currencies(&[
            StoreCurrency {
                currency_code: "PKR".into(),
                is_default: Some(true),
            },
            StoreCurrency {
                currency_code: "usd".into(),
                is_default: None,
            },
        ])
        .unwrap();
        assert_eq!(normalized[0].currency_code, "pkr");
        assert_eq!(normalized[1].is_default, Some(false));
    }

    #[test]
    fn two_defaults_are_rejected() {
        let result = normalize_currencies(&[
            StoreCurrency::new("pkr", true),
            StoreCurrency::new("usd", true),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn update_patch_only_carries_provided_fields() {
        let update = StoreUpdate {
            default_sales_channel_id: Some("sc_1".into()),
            ..Default::default()
        };
        assert_eq!(to_value(&update).unwrap(), json!({"default_sales_channel_id": "sc_1"}));
    }
}
