//! One-shot provisioning, repair and diagnostic scripts for the storefront.
//!
//! Every script follows the same shape: read current state through the
//! entity reader, skip what already exists, invoke named workflows for the
//! rest, link the results, and log what happened. Running a provisioning
//! script twice converges on the same state.

pub mod context;
pub mod error;
pub mod provision;
pub mod report;
pub mod scripts;

pub use context::{ScriptContext, ScriptOptions};
pub use error::{ScriptError, ScriptResult};
pub use report::Report;
pub use scripts::Script;
