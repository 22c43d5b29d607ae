//! Link records connecting entities owned by different modules.
//!
//! A link is a pair of sides, each naming a module, the key field of that
//! module's entity and the id it holds, e.g.
//! `{stock_location: {stock_location_id}} <-> {fulfillment: {fulfillment_set_id}}`.
//! The pair is stored in canonical order so the composite key does not depend
//! on which side the caller named first.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use storefront_core::Module;

use crate::error::StoreResult;
use crate::store::DocumentStore;

// ---------------------------------------------------------------------------
// LinkSide
// ---------------------------------------------------------------------------

/// One side of a link: `module.key = id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkSide {
    pub module: Module,
    pub key: String,
    pub id: String,
}

impl LinkSide {
    pub fn new(module: Module, key: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            module,
            key: key.into(),
            id: id.into(),
        }
    }

    pub fn api_key(id: impl Into<String>) -> Self {
        Self::new(Module::ApiKey, "api_key_id", id)
    }

    pub fn sales_channel(id: impl Into<String>) -> Self {
        Self::new(Module::SalesChannel, "sales_channel_id", id)
    }

    pub fn stock_location(id: impl Into<String>) -> Self {
        Self::new(Module::StockLocation, "stock_location_id", id)
    }

    pub fn fulfillment_set(id: impl Into<String>) -> Self {
        Self::new(Module::Fulfillment, "fulfillment_set_id", id)
    }

    pub fn fulfillment_provider(id: impl Into<String>) -> Self {
        Self::new(Module::Fulfillment, "fulfillment_provider_id", id)
    }

    pub fn product(id: impl Into<String>) -> Self {
        Self::new(Module::Product, "product_id", id)
    }

    pub fn variant(id: impl Into<String>) -> Self {
        Self::new(Module::Product, "variant_id", id)
    }

    pub fn inventory_item(id: impl Into<String>) -> Self {
        Self::new(Module::Inventory, "inventory_item_id", id)
    }

    /// Whether this side addresses the same module field as `other`.
    pub fn same_field(&self, module: Module, key: &str) -> bool {
        self.module == module && self.key == key
    }
}

impl fmt::Display for LinkSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}={}", self.module, self.key, self.id)
    }
}

// ---------------------------------------------------------------------------
// LinkRecord
// ---------------------------------------------------------------------------

/// An association between two entities of different modules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkRecord {
    left: LinkSide,
    right: LinkSide,
}

impl LinkRecord {
    pub fn new(a: LinkSide, b: LinkSide) -> Self {
        if a <= b {
            Self { left: a, right: b }
        } else {
            Self { left: b, right: a }
        }
    }

    pub fn left(&self) -> &LinkSide {
        &self.left
    }

    pub fn right(&self) -> &LinkSide {
        &self.right
    }

    /// Whether either side equals `side`.
    pub fn touches(&self, side: &LinkSide) -> bool {
        &self.left == side || &self.right == side
    }

    /// Given one side, return the opposite side if it addresses
    /// `module.key`.
    pub fn opposite(&self, side: &LinkSide, module: Module, key: &str) -> Option<&LinkSide> {
        let other = if &self.left == side {
            &self.right
        } else if &self.right == side {
            &self.left
        } else {
            return None;
        };
        other.same_field(module, key).then_some(other)
    }

    /// Stable composite key used for uniqueness checks.
    pub fn composite_key(&self) -> String {
        format!("{} <-> {}", self.left, self.right)
    }

    /// Render as `{module: {key: id}, ...}`.
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        for side in [&self.left, &self.right] {
            let entry = out
                .entry(side.module.as_str())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(fields) = entry {
                fields.insert(side.key.clone(), json!(side.id));
            }
        }
        Value::Object(out)
    }
}

impl fmt::Display for LinkRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.composite_key())
    }
}

// ---------------------------------------------------------------------------
// Linker
// ---------------------------------------------------------------------------

/// Creates and lists link records. Removal goes through the link
/// workflows so it can be compensated.
///
/// Creating a link that already exists fails with
/// [`StoreError::DuplicateLink`](crate::error::StoreError::DuplicateLink);
/// callers decide whether that is benign.
#[derive(Clone)]
pub struct Linker {
    store: Arc<dyn DocumentStore>,
}

impl Linker {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, link: LinkRecord) -> StoreResult<LinkRecord> {
        self.store.insert_link(&link).await?;
        tracing::debug!(link = %link, "Link created");
        Ok(link)
    }

    /// List every link, or only those touching `side`.
    pub async fn list(&self, side: Option<&LinkSide>) -> StoreResult<Vec<LinkRecord>> {
        let links = self.store.list_links().await?;
        Ok(match side {
            Some(side) => links.into_iter().filter(|l| l.touches(side)).collect(),
            None => links,
        })
    }

    /// Ids on the `module.key` side of every link touching `from`.
    pub async fn linked_ids(
        &self,
        from: &LinkSide,
        module: Module,
        key: &str,
    ) -> StoreResult<Vec<String>> {
        let links = self.store.list_links().await?;
        Ok(links
            .iter()
            .filter_map(|l| l.opposite(from, module, key))
            .map(|side| side.id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sides_are_stored_in_canonical_order() {
        let a = LinkRecord::new(LinkSide::stock_location("sloc_1"), LinkSide::sales_channel("sc_1"));
        let b = LinkRecord::new(LinkSide::sales_channel("sc_1"), LinkSide::stock_location("sloc_1"));
        assert_eq!(a, b);
        assert_eq!(a.composite_key(), b.composite_key());
    }

    #[test]
    fn opposite_requires_matching_field() {
        let link = LinkRecord::new(LinkSide::api_key("apk_1"), LinkSide::sales_channel("sc_1"));
        let from = LinkSide::api_key("apk_1");
        let other = link
            .opposite(&from, Module::SalesChannel, "sales_channel_id")
            .unwrap();
        assert_eq!(other.id, "sc_1");
        assert!(link.opposite(&from, Module::Product, "product_id").is_none());
        assert!(link
            .opposite(&LinkSide::api_key("apk_2"), Module::SalesChannel, "sales_channel_id")
            .is_none());
    }

    #[test]
    fn json_groups_sides_by_module() {
        let link = LinkRecord::new(
            LinkSide::stock_location("sloc_1"),
            LinkSide::fulfillment_provider("manual_manual"),
        );
        assert_eq!(
            link.to_json(),
            json!({
                "fulfillment": {"fulfillment_provider_id": "manual_manual"},
                "stock_location": {"stock_location_id": "sloc_1"},
            })
        );
    }
}
