//! The script registry.

pub mod add_shipping_options;
pub mod add_stock;
pub mod check_api;
pub mod check_api_v2;
pub mod check_products;
pub mod ensure_link;
pub mod fix_regions;
pub mod list_links;
pub mod seed;
pub mod verify_final;

use std::fmt;
use std::str::FromStr;

use crate::context::ScriptContext;
use crate::error::{ScriptError, ScriptResult};

/// A runnable script, addressed on the command line by its kebab-case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Seed,
    FixRegions,
    AddShippingOptions,
    AddStock,
    EnsureLink,
    CheckApi,
    CheckApiV2,
    CheckProducts,
    ListLinks,
    VerifyFinal,
}

impl Script {
    pub const ALL: [Script; 10] = [
        Script::Seed,
        Script::FixRegions,
        Script::AddShippingOptions,
        Script::AddStock,
        Script::EnsureLink,
        Script::CheckApi,
        Script::CheckApiV2,
        Script::CheckProducts,
        Script::ListLinks,
        Script::VerifyFinal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::FixRegions => "fix-regions",
            Self::AddShippingOptions => "add-shipping-options",
            Self::AddStock => "add-stock",
            Self::EnsureLink => "ensure-link",
            Self::CheckApi => "check-api",
            Self::CheckApiV2 => "check-api-v2",
            Self::CheckProducts => "check-products",
            Self::ListLinks => "list-links",
            Self::VerifyFinal => "verify-final",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Seed => "Seed the store, region, fulfillment, API key and demo catalog",
            Self::FixRegions => "Delete every region and recreate Pakistan (destructive)",
            Self::AddShippingOptions => "Add a Pakistan service zone and standard shipping option",
            Self::AddStock => "Stock every inventory item at the first stock location",
            Self::EnsureLink => "Link the first publishable API key to the default sales channel",
            Self::CheckApi => "Report API keys with their channels and channels with products",
            Self::CheckApiV2 => "Report publishable keys via link records and channel products",
            Self::CheckProducts => "Report regions, sales channels and product prices",
            Self::ListLinks => "Print every link record",
            Self::VerifyFinal => "Report regions with countries and products with prices",
        }
    }

    /// Whether the script only reads.
    pub fn is_diagnostic(self) -> bool {
        matches!(
            self,
            Self::CheckApi | Self::CheckApiV2 | Self::CheckProducts | Self::ListLinks | Self::VerifyFinal
        )
    }

    pub async fn run(self, ctx: &ScriptContext) -> ScriptResult<()> {
        tracing::info!(script = self.as_str(), "Running script");
        match self {
            Self::Seed => seed::run(ctx).await,
            Self::FixRegions => fix_regions::run(ctx).await,
            Self::AddShippingOptions => add_shipping_options::run(ctx).await,
            Self::AddStock => add_stock::run(ctx).await,
            Self::EnsureLink => ensure_link::run(ctx).await,
            Self::CheckApi => check_api::run(ctx).await,
            Self::CheckApiV2 => check_api_v2::run(ctx).await,
            Self::CheckProducts => check_products::run(ctx).await,
            Self::ListLinks => list_links::run(ctx).await,
            Self::VerifyFinal => verify_final::run(ctx).await,
        }
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Script {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|script| script.as_str() == s)
            .ok_or_else(|| ScriptError::UnknownScript(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn names_round_trip() {
        for script in Script::ALL {
            assert_eq!(script.as_str().parse::<Script>().unwrap(), script);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "seed-everything".parse::<Script>().unwrap_err();
        assert_matches!(&err, ScriptError::UnknownScript(name) if name == "seed-everything");
        assert_eq!(err.to_string(), "Unknown script 'seed-everything'");
    }
}
