//! Widget zones and the dashboard registry.

use std::fmt;

use serde::Serialize;

use crate::widget::ProductStockWidget;

/// Injection point on an admin page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WidgetZone {
    #[serde(rename = "product.details.before")]
    ProductDetailsBefore,
    #[serde(rename = "product.details.after")]
    ProductDetailsAfter,
    #[serde(rename = "product.list.before")]
    ProductListBefore,
    #[serde(rename = "product.list.after")]
    ProductListAfter,
}

impl WidgetZone {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProductDetailsBefore => "product.details.before",
            Self::ProductDetailsAfter => "product.details.after",
            Self::ProductListBefore => "product.list.before",
            Self::ProductListAfter => "product.list.after",
        }
    }
}

impl fmt::Display for WidgetZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WidgetConfig {
    pub zone: WidgetZone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetRegistration {
    pub name: &'static str,
    pub config: WidgetConfig,
}

/// Widgets registered with the admin dashboard, in registration order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardConfig {
    widgets: Vec<WidgetRegistration>,
}

impl DashboardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: &'static str, config: WidgetConfig) -> Self {
        tracing::debug!(widget = name, zone = %config.zone, "Registering widget");
        self.widgets.push(WidgetRegistration { name, config });
        self
    }

    pub fn widgets(&self) -> &[WidgetRegistration] {
        &self.widgets
    }

    /// Names of the widgets injected into `zone`.
    pub fn widgets_in(&self, zone: WidgetZone) -> Vec<&'static str> {
        self.widgets
            .iter()
            .filter(|w| w.config.zone == zone)
            .map(|w| w.name)
            .collect()
    }
}

/// The dashboard shipped with the storefront.
pub fn dashboard() -> DashboardConfig {
    DashboardConfig::new().register(ProductStockWidget::NAME, ProductStockWidget::CONFIG)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_widget_sits_after_product_details() {
        let config = dashboard();
        assert_eq!(
            config.widgets_in(WidgetZone::ProductDetailsAfter),
            vec![ProductStockWidget::NAME]
        );
        assert!(config.widgets_in(WidgetZone::ProductListAfter).is_empty());
    }

    #[test]
    fn zone_serializes_to_its_path() {
        let json = serde_json::to_value(ProductStockWidget::CONFIG).unwrap();
        assert_eq!(json, serde_json::json!({"zone": "product.details.after"}));
    }
}
