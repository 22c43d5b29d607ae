//! Background subscriber that logs every event and keeps a copy.
//!
//! The CLI runs one per process so it can report how many entities a script
//! touched; tests use it to assert on emitted events.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::bus::{CommerceEvent, EventBus};

#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<CommerceEvent>>>,
}

impl EventRecorder {
    /// Subscribe to `bus` and record events until the bus is dropped.
    pub fn spawn(bus: &EventBus) -> (Self, JoinHandle<()>) {
        let recorder = Self::default();
        let receiver = bus.subscribe();
        let handle = tokio::spawn(recorder.clone().run(receiver));
        (recorder, handle)
    }

    async fn run(self, mut receiver: broadcast::Receiver<CommerceEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    tracing::debug!(
                        event_type = %event.event_type,
                        entity_id = event.entity_id.as_deref().unwrap_or("-"),
                        "Event"
                    );
                    self.push(event);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event recorder lagged, some events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("Event bus closed, recorder shutting down");
                    break;
                }
            }
        }
    }

    fn push(&self, event: CommerceEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<CommerceEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Number of recorded events whose type is `event_type`.
    pub fn count(&self, event_type: &str) -> usize {
        self.events().iter().filter(|e| e.event_type == event_type).count()
    }
}

#[cfg(test)]
mod tests {
    use storefront_core::EntityKind;

    use super::*;

    #[tokio::test]
    async fn records_until_bus_is_dropped() {
        let bus = EventBus::default();
        let (recorder, handle) = EventRecorder::spawn(&bus);

        bus.publish(CommerceEvent::entity(EntityKind::Product, "created", "prod_1"));
        bus.publish(CommerceEvent::entity(EntityKind::Product, "created", "prod_2"));
        bus.publish(CommerceEvent::entity(EntityKind::Region, "deleted", "reg_1"));
        drop(bus);
        handle.await.unwrap();

        assert_eq!(recorder.events().len(), 3);
        assert_eq!(recorder.count("product.created"), 2);
        assert_eq!(recorder.count("region.deleted"), 1);
    }
}
