//! `create-api-keys`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use storefront_core::EntityKind;
use storefront_db::document::Document;
use uuid::Uuid;
use validator::Validate;

use crate::engine::Workflow;
use crate::error::WorkflowResult;
use crate::transaction::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyType {
    Publishable,
    Secret,
}

impl ApiKeyType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Publishable => "publishable",
            Self::Secret => "secret",
        }
    }

    fn token_prefix(self) -> &'static str {
        match self {
            Self::Publishable => "pk",
            Self::Secret => "sk",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ApiKeyInput {
    #[validate(length(min = 1))]
    pub title: String,
    #[serde(rename = "type")]
    pub key_type: ApiKeyType,
    #[serde(default)]
    pub created_by: String,
}

impl ApiKeyInput {
    pub fn publishable(title: &str) -> Self {
        Self {
            title: title.to_string(),
            key_type: ApiKeyType::Publishable,
            created_by: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateApiKeysInput {
    #[validate(length(min = 1), nested)]
    pub api_keys: Vec<ApiKeyInput>,
}

/// 64 hex characters of randomness behind a type prefix.
fn generate_token(key_type: ApiKeyType) -> String {
    format!(
        "{}_{}{}",
        key_type.token_prefix(),
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

/// Publishable tokens are shown as-is; secret tokens keep only their tail.
fn redact(token: &str, key_type: ApiKeyType) -> String {
    match key_type {
        ApiKeyType::Publishable => token.to_string(),
        ApiKeyType::Secret => {
            let tail = &token[token.len().saturating_sub(3)..];
            format!("{}_***{tail}", key_type.token_prefix())
        }
    }
}

pub struct CreateApiKeys;

#[async_trait]
impl Workflow for CreateApiKeys {
    const NAME: &'static str = "create-api-keys";
    type Input = CreateApiKeysInput;
    type Output = Vec<Document>;

    async fn run(&self, tx: &mut Transaction, input: CreateApiKeysInput) -> WorkflowResult<Vec<Document>> {
        let mut created = Vec::with_capacity(input.api_keys.len());
        for key in input.api_keys {
            let token = generate_token(key.key_type);
            let doc = tx
                .insert(
                    EntityKind::ApiKey,
                    json!({
                        "title": key.title,
                        "type": key.key_type.as_str(),
                        "redacted": redact(&token, key.key_type),
                        "token": token,
                        "created_by": key.created_by,
                        "revoked_at": null,
                    }),
                )
                .await?;
            created.push(doc);
        }
        Ok(created)
    }
}
