//! JSON documents and their natural keys.
//!
//! Every entity is stored as a JSON object with a string `id`. The natural
//! key is the business-meaningful field (or field pair) that identifies
//! "the same" entity across runs; the store keeps at most one live document
//! per natural key.

use serde_json::{Map, Value};
use storefront_core::EntityKind;

use crate::error::{StoreError, StoreResult};

/// A stored entity: a JSON object with at least an `id` field.
pub type Document = Map<String, Value>;

/// Read a string field.
pub fn str_field<'a>(doc: &'a Document, key: &str) -> Option<&'a str> {
    doc.get(key).and_then(Value::as_str)
}

/// Read the `id` of a document, failing on documents without one.
pub fn doc_id(doc: &Document) -> StoreResult<&str> {
    str_field(doc, "id").ok_or_else(|| StoreError::Malformed("document has no string id".into()))
}

/// Compute the natural key of a document of the given kind.
///
/// Kinds without a natural key (the store singleton, stock locations) return
/// `None`, as do documents missing one of the key fields.
pub fn natural_key(kind: EntityKind, doc: &Document) -> Option<String> {
    let single = |key: &str| str_field(doc, key).map(str::to_string);
    let pair = |a: &str, b: &str| Some(format!("{}:{}", str_field(doc, a)?, str_field(doc, b)?));

    match kind {
        EntityKind::Region | EntityKind::SalesChannel | EntityKind::FulfillmentSet => {
            single("name")
        }
        EntityKind::TaxRegion => single("country_code"),
        EntityKind::ApiKey => pair("type", "title"),
        EntityKind::ShippingProfile => single("type"),
        EntityKind::ShippingOption => pair("service_zone_id", "name"),
        EntityKind::ProductCategory | EntityKind::Product => single("handle"),
        EntityKind::InventoryItem => single("sku"),
        EntityKind::InventoryLevel => pair("inventory_item_id", "location_id"),
        EntityKind::Store
        | EntityKind::StockLocation
        | EntityKind::ServiceZone
        | EntityKind::ProductVariant => None,
    }
}

/// Convert an arbitrary JSON value into a document.
pub fn into_document(value: Value) -> StoreResult<Document> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Malformed(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        into_document(value).unwrap()
    }

    #[test]
    fn region_key_is_name() {
        let region = doc(json!({"id": "reg_1", "name": "Pakistan", "currency_code": "pkr"}));
        assert_eq!(
            natural_key(EntityKind::Region, &region).as_deref(),
            Some("Pakistan")
        );
    }

    #[test]
    fn api_key_key_combines_type_and_title() {
        let key = doc(json!({"id": "apk_1", "title": "Webshop", "type": "publishable"}));
        assert_eq!(
            natural_key(EntityKind::ApiKey, &key).as_deref(),
            Some("publishable:Webshop")
        );
    }

    #[test]
    fn stock_locations_have_no_key() {
        let location = doc(json!({"id": "sloc_1", "name": "European Warehouse"}));
        assert!(natural_key(EntityKind::StockLocation, &location).is_none());
    }

    #[test]
    fn missing_key_field_yields_none() {
        let level = doc(json!({"id": "ilev_1", "inventory_item_id": "iitem_1"}));
        assert!(natural_key(EntityKind::InventoryLevel, &level).is_none());
    }

    #[test]
    fn non_objects_are_malformed() {
        assert!(into_document(json!([1, 2])).is_err());
        assert!(doc_id(&doc(json!({"name": "x"}))).is_err());
    }
}
