//! Sales channel workflows, including the incremental link workflows that
//! attach channels to publishable API keys and stock locations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use storefront_core::{CoreError, EntityKind};
use storefront_db::document::{str_field, Document};
use storefront_db::{LinkRecord, LinkSide, StoreError};
use validator::Validate;

use crate::engine::Workflow;
use crate::error::{WorkflowError, WorkflowResult};
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SalesChannelInput {
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_disabled: bool,
}

impl SalesChannelInput {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            is_disabled: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSalesChannelsInput {
    #[validate(length(min = 1), nested)]
    pub sales_channels: Vec<SalesChannelInput>,
}

/// Sales channel ids to attach to or detach from the entity `id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LinkSalesChannelsInput {
    #[validate(length(min = 1))]
    pub id: String,
    #[serde(default)]
    pub add: Vec<String>,
    #[serde(default)]
    pub remove: Vec<String>,
}

impl LinkSalesChannelsInput {
    pub fn add(id: &str, sales_channel_ids: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            add: sales_channel_ids.iter().map(|s| s.to_string()).collect(),
            remove: Vec::new(),
        }
    }
}

/// Links created and dismissed by a link workflow.
#[derive(Debug, Clone, Default)]
pub struct LinkChanges {
    pub created: Vec<LinkRecord>,
    pub dismissed: Vec<LinkRecord>,
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

pub struct CreateSalesChannels;

#[async_trait]
impl Workflow for CreateSalesChannels {
    const NAME: &'static str = "create-sales-channels";
    type Input = CreateSalesChannelsInput;
    type Output = Vec<Document>;

    async fn run(
        &self,
        tx: &mut Transaction,
        input: CreateSalesChannelsInput,
    ) -> WorkflowResult<Vec<Document>> {
        let mut created = Vec::with_capacity(input.sales_channels.len());
        for channel in input.sales_channels {
            let doc = tx
                .insert(
                    EntityKind::SalesChannel,
                    json!({
                        "name": channel.name,
                        "description": channel.description,
                        "is_disabled": channel.is_disabled,
                    }),
                )
                .await?;
            created.push(doc);
        }
        Ok(created)
    }
}

/// Apply `add` / `remove` for one owner side. Adding a link that is already
/// present is skipped; removing an absent link is a no-op.
async fn apply_link_changes(
    tx: &mut Transaction,
    owner: LinkSide,
    input: &LinkSalesChannelsInput,
) -> WorkflowResult<LinkChanges> {
    let mut changes = LinkChanges::default();
    for channel_id in &input.add {
        tx.require(EntityKind::SalesChannel, channel_id).await?;
        let link = LinkRecord::new(owner.clone(), LinkSide::sales_channel(channel_id));
        match tx.link(link).await {
            Ok(link) => changes.created.push(link),
            Err(WorkflowError::Store(StoreError::DuplicateLink(key))) => {
                tracing::debug!(link = %key, "Link already present, skipping");
            }
            Err(e) => return Err(e),
        }
    }
    for channel_id in &input.remove {
        let link = LinkRecord::new(owner.clone(), LinkSide::sales_channel(channel_id));
        if tx.dismiss(link.clone()).await? {
            changes.dismissed.push(link);
        }
    }
    Ok(changes)
}

/// Attach sales channels to a publishable API key.
pub struct LinkSalesChannelsToApiKey;

#[async_trait]
impl Workflow for LinkSalesChannelsToApiKey {
    const NAME: &'static str = "link-sales-channels-to-api-key";
    type Input = LinkSalesChannelsInput;
    type Output = LinkChanges;

    async fn run(&self, tx: &mut Transaction, input: LinkSalesChannelsInput) -> WorkflowResult<LinkChanges> {
        let key = tx.require(EntityKind::ApiKey, &input.id).await?;
        if str_field(&key, "type") != Some("publishable") {
            return Err(CoreError::Validation(
                "Sales channels can only be associated with publishable API keys".into(),
            )
            .into());
        }
        apply_link_changes(tx, LinkSide::api_key(&input.id), &input).await
    }
}

pub struct LinkSalesChannelsToStockLocation;

#[async_trait]
impl Workflow for LinkSalesChannelsToStockLocation {
    const NAME: &'static str = "link-sales-channels-to-stock-location";
    type Input = LinkSalesChannelsInput;
    type Output = LinkChanges;

    async fn run(&self, tx: &mut Transaction, input: LinkSalesChannelsInput) -> WorkflowResult<LinkChanges> {
        tx.require(EntityKind::StockLocation, &input.id).await?;
        apply_link_changes(tx, LinkSide::stock_location(&input.id), &input).await
    }
}
