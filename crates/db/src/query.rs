//! Entity Reader: filtered, projected graph reads over the document store.
//!
//! A [`GraphQuery`] names an entity kind, dot-notation field paths and
//! equality filters:
//!
//! ```text
//! entity:  product
//! fields:  id, title, sales_channels.name, variants.prices.*
//! filters: sales_channels.id = sc_123
//! ```
//!
//! Field semantics:
//! - `*` selects the record's own attributes: scalars and arrays of scalars,
//!   never nested records;
//! - `id` is always selected at every level;
//! - `rel.field` traverses a relation. Embedded relations (`countries`,
//!   `variants`, `service_zones`, ...) are read from the document itself;
//!   linked relations (`sales_channels`, `inventory`, ...) are resolved
//!   through link records at read time.
//!
//! Filters match when the value at the path equals the expected value; an
//! array anywhere along the path matches if any element does. Queries that
//! match nothing return an empty vector.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use storefront_core::{EntityKind, Module};

use crate::document::{doc_id, Document};
use crate::error::{StoreError, StoreResult};
use crate::link::{LinkRecord, LinkSide};
use crate::store::DocumentStore;

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

/// How a relation field of an entity is materialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    /// Nested records stored inside the owning document. `kind` is set when
    /// the nested records have relations of their own.
    Embedded { kind: Option<EntityKind> },
    /// Records of `target` connected by link records.
    Linked {
        this: (Module, &'static str),
        other: (Module, &'static str),
        target: EntityKind,
    },
    /// Records of `target` whose ids are listed in the `ids` field.
    ByIds {
        ids: &'static str,
        target: EntityKind,
    },
}

const PRODUCT_SIDE: (Module, &str) = (Module::Product, "product_id");
const VARIANT_SIDE: (Module, &str) = (Module::Product, "variant_id");
const SALES_CHANNEL_SIDE: (Module, &str) = (Module::SalesChannel, "sales_channel_id");
const API_KEY_SIDE: (Module, &str) = (Module::ApiKey, "api_key_id");
const STOCK_LOCATION_SIDE: (Module, &str) = (Module::StockLocation, "stock_location_id");
const FULFILLMENT_SET_SIDE: (Module, &str) = (Module::Fulfillment, "fulfillment_set_id");
const INVENTORY_ITEM_SIDE: (Module, &str) = (Module::Inventory, "inventory_item_id");

fn relation(kind: EntityKind, field: &str) -> Option<Relation> {
    use EntityKind as K;

    let linked = |this, other, target| Some(Relation::Linked { this, other, target });

    match (kind, field) {
        (K::Region, "countries") => Some(Relation::Embedded { kind: None }),
        (K::FulfillmentSet, "service_zones") => Some(Relation::Embedded {
            kind: Some(K::ServiceZone),
        }),
        (K::ServiceZone, "geo_zones") => Some(Relation::Embedded { kind: None }),
        (K::Product, "variants") => Some(Relation::Embedded {
            kind: Some(K::ProductVariant),
        }),
        (K::Product, "options" | "images") => Some(Relation::Embedded { kind: None }),
        (K::ProductVariant, "prices") => Some(Relation::Embedded { kind: None }),
        (K::Product, "categories") => Some(Relation::ByIds {
            ids: "category_ids",
            target: K::ProductCategory,
        }),
        (K::Product, "sales_channels") => linked(PRODUCT_SIDE, SALES_CHANNEL_SIDE, K::SalesChannel),
        (K::SalesChannel, "products") => linked(SALES_CHANNEL_SIDE, PRODUCT_SIDE, K::Product),
        (K::ApiKey, "sales_channels") => linked(API_KEY_SIDE, SALES_CHANNEL_SIDE, K::SalesChannel),
        (K::SalesChannel, "api_keys") => linked(SALES_CHANNEL_SIDE, API_KEY_SIDE, K::ApiKey),
        (K::StockLocation, "sales_channels") => {
            linked(STOCK_LOCATION_SIDE, SALES_CHANNEL_SIDE, K::SalesChannel)
        }
        (K::SalesChannel, "stock_locations") => {
            linked(SALES_CHANNEL_SIDE, STOCK_LOCATION_SIDE, K::StockLocation)
        }
        (K::StockLocation, "fulfillment_sets") => {
            linked(STOCK_LOCATION_SIDE, FULFILLMENT_SET_SIDE, K::FulfillmentSet)
        }
        (K::ProductVariant, "inventory") => {
            linked(VARIANT_SIDE, INVENTORY_ITEM_SIDE, K::InventoryItem)
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// GraphQuery
// ---------------------------------------------------------------------------

/// Equality filter on a dot-notation path.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub path: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }
}

/// A read request against one entity kind.
#[derive(Debug, Clone)]
pub struct GraphQuery {
    pub entity: EntityKind,
    pub fields: Vec<String>,
    pub filters: Vec<Filter>,
}

impl GraphQuery {
    /// Query every attribute (`*`) of `entity`.
    pub fn new(entity: EntityKind) -> Self {
        Self {
            entity,
            fields: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn filter(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(path, value));
        self
    }
}

type Path<'a> = Vec<&'a str>;

fn split_paths<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<Path<'a>> {
    raw.filter(|p| !p.is_empty())
        .map(|p| p.split('.').collect())
        .collect()
}

/// Group paths by their first segment, preserving first-seen order.
fn group_by_head<'p, 'a>(paths: &'p [Path<'a>]) -> Vec<(&'a str, Vec<Path<'a>>)> {
    let mut groups: Vec<(&'a str, Vec<Path<'a>>)> = Vec::new();
    for path in paths {
        let Some((head, rest)) = path.split_first() else {
            continue;
        };
        let rest: Path<'a> = rest.to_vec();
        match groups.iter_mut().find(|(h, _)| h == head) {
            Some((_, tails)) => tails.push(rest),
            None => groups.push((*head, vec![rest])),
        }
    }
    groups
}

// ---------------------------------------------------------------------------
// Graph expansion
// ---------------------------------------------------------------------------

/// Collections and links preloaded for one query.
struct Graph {
    links: Vec<LinkRecord>,
    collections: HashMap<EntityKind, Vec<Document>>,
}

impl Graph {
    fn find(&self, kind: EntityKind, id: &str) -> Option<&Document> {
        self.collections
            .get(&kind)?
            .iter()
            .find(|doc| doc_id(doc).ok() == Some(id))
    }

    /// Materialise every relation named by `paths` on `doc`.
    fn expand(&self, kind: EntityKind, doc: &mut Document, paths: &[Path<'_>]) {
        for (head, tails) in group_by_head(paths) {
            let Some(rel) = relation(kind, head) else {
                continue;
            };
            let tails: Vec<Path<'_>> = tails.into_iter().filter(|t| !t.is_empty()).collect();
            match rel {
                Relation::Embedded { kind: nested } => {
                    let Some(nested) = nested else { continue };
                    if let Some(Value::Array(items)) = doc.get_mut(head) {
                        for item in items.iter_mut() {
                            if let Value::Object(child) = item {
                                self.expand(nested, child, &tails);
                            }
                        }
                    }
                }
                Relation::Linked {
                    this,
                    other,
                    target,
                } => {
                    let Ok(id) = doc_id(doc) else { continue };
                    let from = LinkSide::new(this.0, this.1, id);
                    let ids: Vec<String> = self
                        .links
                        .iter()
                        .filter_map(|l| l.opposite(&from, other.0, other.1))
                        .map(|side| side.id.clone())
                        .collect();
                    let related = self.related(target, &ids, &tails);
                    doc.insert(head.to_string(), Value::Array(related));
                }
                Relation::ByIds { ids, target } => {
                    let ids: Vec<String> = doc
                        .get(ids)
                        .and_then(Value::as_array)
                        .map(|arr| {
                            arr.iter()
                                .filter_map(Value::as_str)
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default();
                    let related = self.related(target, &ids, &tails);
                    doc.insert(head.to_string(), Value::Array(related));
                }
            }
        }
    }

    fn related(&self, target: EntityKind, ids: &[String], tails: &[Path<'_>]) -> Vec<Value> {
        ids.iter()
            .filter_map(|id| self.find(target, id))
            .map(|found| {
                let mut child = found.clone();
                self.expand(target, &mut child, tails);
                Value::Object(child)
            })
            .collect()
    }
}

/// Collect every collection a set of paths starting at `kind` may touch.
fn required_kinds(kind: EntityKind, paths: &[Path<'_>], out: &mut BTreeSet<EntityKind>) {
    for (head, tails) in group_by_head(paths) {
        match relation(kind, head) {
            Some(Relation::Embedded { kind: Some(nested) }) => {
                required_kinds(nested, &tails, out);
            }
            Some(Relation::Linked { target, .. }) | Some(Relation::ByIds { target, .. }) => {
                out.insert(target);
                required_kinds(target, &tails, out);
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Filtering & projection
// ---------------------------------------------------------------------------

fn value_matches(value: &Value, path: &[&str], expected: &Value) -> bool {
    match (path.split_first(), value) {
        (_, Value::Array(items)) if !expected.is_array() || !path.is_empty() => {
            items.iter().any(|item| value_matches(item, path, expected))
        }
        (None, v) => v == expected,
        (Some((head, rest)), Value::Object(map)) => map
            .get(*head)
            .is_some_and(|next| value_matches(next, rest, expected)),
        _ => false,
    }
}

/// Whether `doc` satisfies every filter.
pub fn matches_filters(doc: &Document, filters: &[Filter]) -> bool {
    filters.iter().all(|f| {
        let path: Path<'_> = f.path.split('.').collect();
        match path.split_first() {
            Some((head, rest)) => doc
                .get(*head)
                .is_some_and(|v| value_matches(v, rest, &f.value)),
            None => false,
        }
    })
}

fn is_attribute(value: &Value) -> bool {
    match value {
        Value::Object(_) => false,
        Value::Array(items) => items.iter().all(|v| !v.is_object() && !v.is_array()),
        _ => true,
    }
}

/// Project `doc` onto `paths`. `id` is always kept.
fn project(doc: &Document, paths: &[Path<'_>]) -> Document {
    let mut out = Map::new();
    if let Some(id) = doc.get("id") {
        out.insert("id".to_string(), id.clone());
    }
    for (head, tails) in group_by_head(paths) {
        if head == "*" {
            for (key, value) in doc {
                if is_attribute(value) {
                    out.insert(key.clone(), value.clone());
                }
            }
            continue;
        }
        let Some(value) = doc.get(head) else {
            continue;
        };
        let nested: Vec<Path<'_>> = tails.iter().filter(|t| !t.is_empty()).cloned().collect();
        let whole = nested.len() < tails.len();
        let projected = if whole || nested.is_empty() {
            value.clone()
        } else {
            project_value(value, &nested)
        };
        out.insert(head.to_string(), projected);
    }
    out
}

fn project_value(value: &Value, paths: &[Path<'_>]) -> Value {
    match value {
        Value::Object(map) => Value::Object(project(map, paths)),
        Value::Array(items) => Value::Array(items.iter().map(|v| project_value(v, paths)).collect()),
        other => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Query service
// ---------------------------------------------------------------------------

/// Read-only access to the entity graph.
#[derive(Clone)]
pub struct Query {
    store: Arc<dyn DocumentStore>,
}

impl Query {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Run a graph query and return the projected records in insertion
    /// order.
    pub async fn graph(&self, query: &GraphQuery) -> StoreResult<Vec<Document>> {
        let mut field_paths = split_paths(query.fields.iter().map(String::as_str));
        if field_paths.is_empty() {
            field_paths.push(vec!["*"]);
        }
        let filter_paths = split_paths(query.filters.iter().map(|f| f.path.as_str()));
        let expand_paths: Vec<Path<'_>> = field_paths
            .iter()
            .chain(filter_paths.iter())
            .cloned()
            .collect();

        let mut kinds = BTreeSet::new();
        required_kinds(query.entity, &expand_paths, &mut kinds);

        let roots = self.store.list(query.entity).await?;
        let mut graph = Graph {
            links: if kinds.is_empty() {
                Vec::new()
            } else {
                self.store.list_links().await?
            },
            collections: HashMap::new(),
        };
        for kind in kinds {
            let docs = if kind == query.entity {
                roots.clone()
            } else {
                self.store.list(kind).await?
            };
            graph.collections.insert(kind, docs);
        }

        let mut results = Vec::new();
        for mut doc in roots {
            graph.expand(query.entity, &mut doc, &expand_paths);
            if matches_filters(&doc, &query.filters) {
                results.push(project(&doc, &field_paths));
            }
        }
        tracing::debug!(
            entity = %query.entity,
            fields = ?query.fields,
            matched = results.len(),
            "Graph query"
        );
        Ok(results)
    }

    /// Run a graph query and decode every record into `T`.
    pub async fn graph_as<T: DeserializeOwned>(&self, query: &GraphQuery) -> StoreResult<Vec<T>> {
        self.graph(query)
            .await?
            .into_iter()
            .map(|doc| {
                serde_json::from_value(Value::Object(doc)).map_err(|e| {
                    StoreError::Malformed(format!("{} record: {e}", query.entity))
                })
            })
            .collect()
    }

    /// Whole documents of `kind` matching top-level equality filters.
    pub async fn list(&self, kind: EntityKind, filters: &[Filter]) -> StoreResult<Vec<Document>> {
        let docs = self.store.list(kind).await?;
        Ok(docs
            .into_iter()
            .filter(|doc| matches_filters(doc, filters))
            .collect())
    }

    /// A single whole document by id.
    pub async fn retrieve(&self, kind: EntityKind, id: &str) -> StoreResult<Document> {
        self.store
            .get(kind, id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                kind,
                id: id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::document::into_document;

    fn doc(value: Value) -> Document {
        into_document(value).unwrap()
    }

    fn paths(raw: &[&'static str]) -> Vec<Path<'static>> {
        split_paths(raw.iter().copied())
    }

    #[test]
    fn wildcard_selects_only_attributes() {
        let product = doc(json!({
            "id": "prod_1",
            "title": "Shirt",
            "tags": ["a", "b"],
            "variants": [{"id": "variant_1", "title": "S"}],
        }));
        let out = project(&product, &paths(&["*"]));
        assert_eq!(out["title"], "Shirt");
        assert_eq!(out["tags"], json!(["a", "b"]));
        assert!(out.get("variants").is_none());
    }

    #[test]
    fn nested_paths_project_each_element() {
        let product = doc(json!({
            "id": "prod_1",
            "title": "Shirt",
            "variants": [
                {"id": "variant_1", "title": "S", "sku": "S-1",
                 "prices": [{"id": "price_1", "amount": 3000, "currency_code": "pkr"}]},
            ],
        }));
        let out = project(&product, &paths(&["title", "variants.title", "variants.prices.*"]));
        assert_eq!(
            Value::Object(out),
            json!({
                "id": "prod_1",
                "title": "Shirt",
                "variants": [{
                    "id": "variant_1",
                    "title": "S",
                    "prices": [{"id": "price_1", "amount": 3000, "currency_code": "pkr"}],
                }],
            })
        );
    }

    #[test]
    fn filters_match_any_array_element() {
        let product = doc(json!({
            "id": "prod_1",
            "sales_channels": [{"id": "sc_1"}, {"id": "sc_2"}],
        }));
        assert!(matches_filters(&product, &[Filter::eq("sales_channels.id", "sc_2")]));
        assert!(!matches_filters(&product, &[Filter::eq("sales_channels.id", "sc_3")]));
        assert!(!matches_filters(&product, &[Filter::eq("handle", "shirt")]));
    }

    #[test]
    fn filters_match_scalar_array_membership() {
        let key = doc(json!({"id": "x", "tags": ["a", "b"]}));
        assert!(matches_filters(&key, &[Filter::eq("tags", "b")]));
    }

    #[test]
    fn required_kinds_follow_embedded_relations() {
        let mut kinds = BTreeSet::new();
        required_kinds(
            EntityKind::Product,
            &paths(&["variants.inventory.id", "sales_channels.name"]),
            &mut kinds,
        );
        assert!(kinds.contains(&EntityKind::InventoryItem));
        assert!(kinds.contains(&EntityKind::SalesChannel));
        assert_eq!(kinds.len(), 2);
    }
}
