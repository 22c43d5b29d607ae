//! Catalog workflows: `create-product-categories` and `create-products`.
//!
//! Creating a product also creates one inventory item per variant that
//! manages inventory, links the variant to it, and links the product to its
//! sales channels.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use storefront_core::types::generate_id;
use storefront_core::{CoreError, EntityKind};
use storefront_db::document::{doc_id, str_field, Document};
use storefront_db::{LinkRecord, LinkSide};
use validator::Validate;

use crate::common::{slugify, Price};
use crate::engine::Workflow;
use crate::error::WorkflowResult;
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProductCategoryInput {
    #[validate(length(min = 1))]
    pub name: String,
    pub handle: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    pub parent_category_id: Option<String>,
}

impl ProductCategoryInput {
    pub fn active(name: &str) -> Self {
        Self {
            name: name.to_string(),
            handle: None,
            is_active: true,
            parent_category_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProductCategoriesInput {
    #[validate(length(min = 1), nested)]
    pub product_categories: Vec<ProductCategoryInput>,
}

/// Create categories; the handle defaults to the slugified name.
pub struct CreateProductCategories;

#[async_trait]
impl Workflow for CreateProductCategories {
    const NAME: &'static str = "create-product-categories";
    type Input = CreateProductCategoriesInput;
    type Output = Vec<Document>;

    async fn run(
        &self,
        tx: &mut Transaction,
        input: CreateProductCategoriesInput,
    ) -> WorkflowResult<Vec<Document>> {
        let mut created = Vec::with_capacity(input.product_categories.len());
        for category in input.product_categories {
            if let Some(parent) = &category.parent_category_id {
                tx.require(EntityKind::ProductCategory, parent).await?;
            }
            let handle = category
                .handle
                .clone()
                .unwrap_or_else(|| slugify(&category.name));
            let doc = tx
                .insert(
                    EntityKind::ProductCategory,
                    json!({
                        "name": category.name,
                        "handle": handle,
                        "is_active": category.is_active,
                        "parent_category_id": category.parent_category_id,
                    }),
                )
                .await?;
            created.push(doc);
        }
        Ok(created)
    }
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Draft,
    Proposed,
    Published,
    Rejected,
}

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Proposed => "proposed",
            Self::Published => "published",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProductOptionInput {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub values: Vec<String>,
}

impl ProductOptionInput {
    pub fn new(title: &str, values: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProductVariantInput {
    #[validate(length(min = 1))]
    pub title: String,
    pub sku: Option<String>,
    /// Option title to chosen value.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    #[serde(default)]
    #[validate(nested)]
    pub prices: Vec<Price>,
    #[serde(default = "default_true")]
    pub manage_inventory: bool,
}

fn default_true() -> bool {
    true
}

impl ProductVariantInput {
    pub fn new(title: &str, sku: &str, options: &[(&str, &str)], prices: Vec<Price>) -> Self {
        Self {
            title: title.to_string(),
            sku: Some(sku.to_string()),
            options: options
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            prices,
            manage_inventory: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInput {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdRef {
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(length(min = 1))]
    pub title: String,
    pub handle: Option<String>,
    pub description: Option<String>,
    pub weight: Option<u32>,
    #[serde(default)]
    pub status: ProductStatus,
    pub shipping_profile_id: Option<String>,
    #[serde(default)]
    pub category_ids: Vec<String>,
    #[serde(default)]
    pub images: Vec<ImageInput>,
    #[serde(default)]
    #[validate(nested)]
    pub options: Vec<ProductOptionInput>,
    #[serde(default)]
    #[validate(nested)]
    pub variants: Vec<ProductVariantInput>,
    #[serde(default)]
    pub sales_channels: Vec<IdRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProductsInput {
    #[validate(length(min = 1), nested)]
    pub products: Vec<ProductInput>,
}

/// Every variant must pick exactly one known value for each option.
fn check_variant_options(product: &ProductInput) -> WorkflowResult<()> {
    let mut titles = HashSet::new();
    for option in &product.options {
        if !titles.insert(option.title.as_str()) {
            return Err(CoreError::Validation(format!(
                "duplicate option '{}' on product '{}'",
                option.title, product.title
            ))
            .into());
        }
    }
    for variant in &product.variants {
        for option in &product.options {
            let Some(value) = variant.options.get(&option.title) else {
                return Err(CoreError::Validation(format!(
                    "variant '{}' is missing a value for option '{}'",
                    variant.title, option.title
                ))
                .into());
            };
            if !option.values.contains(value) {
                return Err(CoreError::Validation(format!(
                    "variant '{}' uses unknown value '{value}' for option '{}'",
                    variant.title, option.title
                ))
                .into());
            }
        }
        if let Some(extra) = variant.options.keys().find(|k| !titles.contains(k.as_str())) {
            return Err(CoreError::Validation(format!(
                "variant '{}' references unknown option '{extra}'",
                variant.title
            ))
            .into());
        }
    }
    Ok(())
}

/// SKUs of every variant already stored.
async fn existing_skus(tx: &Transaction) -> WorkflowResult<HashSet<String>> {
    let mut skus = HashSet::new();
    for product in tx.list(EntityKind::Product).await? {
        let variants = product
            .get("variants")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        skus.extend(
            variants
                .iter()
                .filter_map(|v| v.get("sku").and_then(Value::as_str))
                .map(str::to_string),
        );
    }
    Ok(skus)
}

fn option_records(options: &[ProductOptionInput]) -> Vec<Value> {
    options
        .iter()
        .map(|o| {
            json!({
                "id": generate_id("opt"),
                "title": o.title,
                "values": o.values,
            })
        })
        .collect()
}

/// Create products with their variants, inventory items and links.
pub struct CreateProducts;

#[async_trait]
impl Workflow for CreateProducts {
    const NAME: &'static str = "create-products";
    type Input = CreateProductsInput;
    type Output = Vec<Document>;

    async fn run(&self, tx: &mut Transaction, input: CreateProductsInput) -> WorkflowResult<Vec<Document>> {
        let mut skus = existing_skus(tx).await?;
        let mut created = Vec::with_capacity(input.products.len());

        for product in input.products {
            check_variant_options(&product)?;
            for id in &product.category_ids {
                tx.require(EntityKind::ProductCategory, id).await?;
            }
            if let Some(id) = &product.shipping_profile_id {
                tx.require(EntityKind::ShippingProfile, id).await?;
            }
            for channel in &product.sales_channels {
                tx.require(EntityKind::SalesChannel, &channel.id).await?;
            }

            let product_id = generate_id(EntityKind::Product.id_prefix());
            let mut variants = Vec::with_capacity(product.variants.len());
            for variant in &product.variants {
                if let Some(sku) = &variant.sku {
                    if !skus.insert(sku.clone()) {
                        return Err(CoreError::AlreadyExists {
                            entity: EntityKind::ProductVariant.as_str(),
                            key: sku.clone(),
                        }
                        .into());
                    }
                }
                let prices: Vec<Value> = variant.prices.iter().map(Price::to_record).collect();
                variants.push(json!({
                    "id": generate_id(EntityKind::ProductVariant.id_prefix()),
                    "product_id": product_id,
                    "title": variant.title,
                    "sku": variant.sku,
                    "manage_inventory": variant.manage_inventory,
                    "options": variant.options,
                    "prices": prices,
                }));
            }

            let images: Vec<Value> = product
                .images
                .iter()
                .map(|i| json!({"id": generate_id("img"), "url": i.url}))
                .collect();
            let handle = product
                .handle
                .clone()
                .unwrap_or_else(|| slugify(&product.title));

            let doc = tx
                .insert(
                    EntityKind::Product,
                    json!({
                        "id": product_id,
                        "title": product.title,
                        "handle": handle,
                        "description": product.description,
                        "weight": product.weight,
                        "status": product.status.as_str(),
                        "shipping_profile_id": product.shipping_profile_id,
                        "category_ids": product.category_ids,
                        "images": images,
                        "options": option_records(&product.options),
                        "variants": variants,
                    }),
                )
                .await?;

            for (variant, input) in variants.iter().zip(&product.variants) {
                if !input.manage_inventory {
                    continue;
                }
                let variant_id = variant["id"].as_str().unwrap_or_default();
                let item = tx
                    .insert(
                        EntityKind::InventoryItem,
                        json!({
                            "sku": input.sku,
                            "title": input.title,
                            "requires_shipping": true,
                        }),
                    )
                    .await?;
                tx.link(LinkRecord::new(
                    LinkSide::variant(variant_id),
                    LinkSide::inventory_item(doc_id(&item)?),
                ))
                .await?;
            }

            for channel in &product.sales_channels {
                tx.link(LinkRecord::new(
                    LinkSide::product(&product_id),
                    LinkSide::sales_channel(&channel.id),
                ))
                .await?;
            }

            tracing::debug!(
                handle = str_field(&doc, "handle").unwrap_or_default(),
                variants = product.variants.len(),
                "Product created"
            );
            created.push(doc);
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shirt() -> ProductInput {
        ProductInput {
            title: "Medusa T-Shirt".into(),
            options: vec![
                ProductOptionInput::new("Size", &["S", "M"]),
                ProductOptionInput::new("Color", &["Black"]),
            ],
            variants: vec![ProductVariantInput::new(
                "S / Black",
                "SHIRT-S-BLACK",
                &[("Size", "S"), ("Color", "Black")],
                vec![Price::new(3000, "pkr")],
            )],
            ..Default::default()
        }
    }

    #[test]
    fn valid_variant_options_pass() {
        assert!(check_variant_options(&shirt()).is_ok());
    }

    #[test]
    fn unknown_option_value_is_rejected() {
        let mut product = shirt();
        product.variants[0].options.insert("Size".into(), "XXL".into());
        let err = check_variant_options(&product).unwrap_err();
        assert!(err.to_string().contains("unknown value 'XXL'"));
    }

    #[test]
    fn missing_option_value_is_rejected() {
        let mut product = shirt();
        product.variants[0].options.remove("Color");
        assert!(check_variant_options(&product).is_err());
    }

    #[test]
    fn extra_option_is_rejected() {
        let mut product = shirt();
        product.variants[0].options.insert("Fit".into(), "Slim".into());
        assert!(check_variant_options(&product).is_err());
    }

    #[test]
    fn variants_manage_inventory_by_default() {
        let variant: ProductVariantInput =
            serde_json::from_value(json!({"title": "S", "sku": "S-1"})).unwrap();
        assert!(variant.manage_inventory);
    }
}
