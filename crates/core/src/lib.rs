//! Shared domain vocabulary for the storefront provisioning workspace.

pub mod config;
pub mod countries;
pub mod entity;
pub mod error;
pub mod types;

pub use entity::{EntityKind, Module};
pub use error::CoreError;
