//! Storefront event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`CommerceEvent`]: the envelope published for every entity a workflow
//!   creates, updates or deletes.
//! - [`EventRecorder`]: background subscriber that logs and keeps every
//!   event it receives.

pub mod bus;
pub mod recorder;

pub use bus::{CommerceEvent, EventBus};
pub use recorder::EventRecorder;
