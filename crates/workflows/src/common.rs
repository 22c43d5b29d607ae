//! Input types and validators shared by several workflows.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use storefront_core::countries::normalize_iso2;
use storefront_core::types::generate_id;
use storefront_db::StoreError;
use validator::{Validate, ValidationError};

use crate::error::WorkflowResult;

/// Amount in the smallest display unit of `currency_code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Price {
    #[validate(range(min = 0))]
    pub amount: i64,
    #[validate(custom(function = "validate_currency_code"))]
    pub currency_code: String,
}

impl Price {
    pub fn new(amount: i64, currency_code: &str) -> Self {
        Self {
            amount,
            currency_code: currency_code.to_string(),
        }
    }

    /// Stored form with a generated `price_` id and a lower-cased currency.
    pub(crate) fn to_record(&self) -> Value {
        serde_json::json!({
            "id": generate_id("price"),
            "amount": self.amount,
            "currency_code": self.currency_code.to_ascii_lowercase(),
        })
    }
}

/// Three ASCII letters, any case.
pub fn validate_currency_code(code: &str) -> Result<(), ValidationError> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        Err(ValidationError::new("currency_code"))
    }
}

pub fn validate_country_code(code: &str) -> Result<(), ValidationError> {
    normalize_iso2(code)
        .map(|_| ())
        .ok_or_else(|| ValidationError::new("country_code"))
}

pub fn validate_country_codes(codes: &[String]) -> Result<(), ValidationError> {
    codes.iter().try_for_each(|c| validate_country_code(c))
}

/// URL-safe handle derived from a display name: `"Medusa T-Shirt"` becomes
/// `"medusa-t-shirt"`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Serialize a typed value for storage.
pub(crate) fn to_value<T: Serialize>(value: &T) -> WorkflowResult<Value> {
    Ok(serde_json::to_value(value).map_err(StoreError::from)?)
}
