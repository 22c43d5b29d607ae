//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` between the workflow engine
//! and any subscriber.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_core::EntityKind;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// CommerceEvent
// ---------------------------------------------------------------------------

/// Something that happened to an entity, e.g. `"region.created"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommerceEvent {
    /// Dot-separated event name.
    pub event_type: String,

    pub entity: Option<EntityKind>,

    pub entity_id: Option<String>,

    /// Name of the workflow that emitted the event, if any.
    pub workflow: Option<String>,

    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl CommerceEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            entity: None,
            entity_id: None,
            workflow: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// `<entity>.<action>` event for one entity.
    pub fn entity(kind: EntityKind, action: &str, id: impl Into<String>) -> Self {
        let mut event = Self::new(format!("{kind}.{action}"));
        event.entity = Some(kind);
        event.entity_id = Some(id.into());
        event
    }

    pub fn with_workflow(mut self, name: impl Into<String>) -> Self {
        self.workflow = Some(name.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use storefront_events::bus::{CommerceEvent, EventBus};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(CommerceEvent::new("region.created"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<CommerceEvent>,
}

impl EventBus {
    /// Slow receivers observe `RecvError::Lagged` once `capacity` events
    /// are buffered.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped if there are none.
    pub fn publish(&self, event: CommerceEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CommerceEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
