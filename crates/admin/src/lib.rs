//! Admin dashboard extensions: the widget registry and the product stock
//! widget.
//!
//! The widget is modelled as state plus behaviour; rendering is left to
//! whatever front end hosts it.

pub mod client;
pub mod dashboard;
pub mod toast;
pub mod widget;

pub use client::{
    AdminInventoryClient, ClientError, EngineAdminClient, InventoryLevelUpdate, StockLocation,
};
pub use dashboard::{dashboard, DashboardConfig, WidgetConfig, WidgetZone};
pub use toast::{Toast, ToastVariant};
pub use widget::{ProductStockWidget, ProductView, StockRow, VariantView};
