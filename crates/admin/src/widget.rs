//! Product stock widget: per-variant stock entry on the product details
//! page.
//!
//! Edits are buffered per variant in the order they were first made.
//! Saving writes every edit to the first stock location, one request per
//! variant, all in flight at once; each request reports its own toast.

use futures::future::join_all;
use serde::Serialize;
use storefront_core::{CoreError, EntityKind};

use crate::client::{AdminInventoryClient, InventoryLevelUpdate};
use crate::dashboard::{WidgetConfig, WidgetZone};
use crate::toast::Toast;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantView {
    pub id: String,
    pub title: String,
    pub inventory_item_id: Option<String>,
    pub inventory_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductView {
    pub id: String,
    pub title: String,
    pub variants: Vec<VariantView>,
}

/// One rendered row: the variant, its current stock and the pending edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockRow<'a> {
    pub variant_id: &'a str,
    pub title: &'a str,
    pub current: i64,
    pub pending: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ProductStockWidget {
    product: ProductView,
    edits: Vec<(String, i64)>,
}

impl ProductStockWidget {
    pub const NAME: &'static str = "product-stock";
    pub const CONFIG: WidgetConfig = WidgetConfig {
        zone: WidgetZone::ProductDetailsAfter,
    };

    pub fn new(product: ProductView) -> Self {
        Self {
            product,
            edits: Vec::new(),
        }
    }

    pub fn product(&self) -> &ProductView {
        &self.product
    }

    /// Record the value typed for `variant_id`. Input must parse as a whole
    /// number; a later edit of the same variant replaces the earlier one
    /// without changing its position.
    pub fn handle_stock_change(&mut self, variant_id: &str, raw: &str) -> Result<(), CoreError> {
        if !self.product.variants.iter().any(|v| v.id == variant_id) {
            return Err(CoreError::not_found(
                EntityKind::ProductVariant.as_str(),
                variant_id,
            ));
        }
        let quantity: i64 = raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("'{raw}' is not a whole number")))?;

        match self.edits.iter_mut().find(|(id, _)| id == variant_id) {
            Some((_, pending)) => *pending = quantity,
            None => self.edits.push((variant_id.to_string(), quantity)),
        }
        Ok(())
    }

    pub fn pending(&self, variant_id: &str) -> Option<i64> {
        self.edits
            .iter()
            .find(|(id, _)| id == variant_id)
            .map(|(_, q)| *q)
    }

    /// The save button is disabled while nothing has been edited.
    pub fn can_save(&self) -> bool {
        !self.edits.is_empty()
    }

    pub fn rows(&self) -> Vec<StockRow<'_>> {
        self.product
            .variants
            .iter()
            .map(|v| StockRow {
                variant_id: &v.id,
                title: &v.title,
                current: v.inventory_quantity,
                pending: self.pending(&v.id),
            })
            .collect()
    }

    /// Write every buffered edit to the first stock location.
    ///
    /// Variants without an inventory item are skipped. Returns one toast
    /// per request in edit order, or a single error toast when there is no
    /// stock location to write to.
    pub async fn save(&self, client: &dyn AdminInventoryClient) -> Vec<Toast> {
        let locations = match client.list_stock_locations().await {
            Ok(locations) => locations,
            Err(e) => return vec![Toast::error("Error loading stock locations", e.to_string())],
        };
        let Some(location) = locations.first() else {
            return vec![Toast::error(
                "No stock locations found",
                "Please create a stock location first.",
            )];
        };

        let requests = self.edits.iter().filter_map(|(variant_id, quantity)| {
            let variant = self.product.variants.iter().find(|v| &v.id == variant_id)?;
            let Some(item_id) = &variant.inventory_item_id else {
                tracing::debug!(variant_id = %variant.id, "Variant has no inventory item, skipping");
                return None;
            };
            let update = InventoryLevelUpdate {
                inventory_item_id: item_id.clone(),
                location_id: location.id.clone(),
                stocked_quantity: *quantity,
            };
            Some(async move {
                match client.update_inventory_level(update).await {
                    Ok(()) => Toast::success(
                        "Stock updated",
                        format!("Stock for variant {} updated to {quantity}.", variant.title),
                    ),
                    Err(e) => {
                        tracing::warn!(variant_id = %variant.id, error = %e, "Stock update failed");
                        Toast::error("Error updating stock", e.to_string())
                    }
                }
            })
        });
        join_all(requests).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> ProductStockWidget {
        ProductStockWidget::new(ProductView {
            id: "prod_1".into(),
            title: "Medusa Sweatshirt".into(),
            variants: vec![
                VariantView {
                    id: "variant_s".into(),
                    title: "S".into(),
                    inventory_item_id: Some("iitem_s".into()),
                    inventory_quantity: 10,
                },
                VariantView {
                    id: "variant_m".into(),
                    title: "M".into(),
                    inventory_item_id: Some("iitem_m".into()),
                    inventory_quantity: 0,
                },
            ],
        })
    }

    #[test]
    fn save_is_disabled_until_an_edit() {
        let mut widget = widget();
        assert!(!widget.can_save());
        widget.handle_stock_change("variant_m", "5").unwrap();
        assert!(widget.can_save());
    }

    #[test]
    fn non_numeric_input_is_rejected() {
        let mut widget = widget();
        let err = widget.handle_stock_change("variant_s", "lots").unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: 'lots' is not a whole number");
        assert!(!widget.can_save());
    }

    #[test]
    fn unknown_variant_is_not_found() {
        let mut widget = widget();
        assert!(matches!(
            widget.handle_stock_change("variant_xl", "1"),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn rows_show_current_and_pending() {
        let mut widget = widget();
        widget.handle_stock_change("variant_s", " 25 ").unwrap();
        widget.handle_stock_change("variant_s", "30").unwrap();

        let rows = widget.rows();
        assert_eq!(rows[0].current, 10);
        assert_eq!(rows[0].pending, Some(30));
        assert_eq!(rows[1].pending, None);
    }
}
