//! Change events for realtime subscribers
//!
//! A thin wrapper over a tokio broadcast channel. Writers publish after a
//! successful store write; subscribers that fall behind lose the oldest
//! events and are told how many they missed.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Something that changed in the lead store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LeadEvent {
    LeadUpdated { lead_id: i64, status: String },
    LeadDeleted { lead_id: i64 },
    LeadsAssigned { lead_ids: Vec<i64>, assigned_to: Option<Uuid> },
    LeadsImported { category: String, count: usize },
    CategoryCreated { category_id: i64, name: String },
    CategoryDeleted { category_id: i64 },
}

impl LeadEvent {
    /// SSE event name
    pub fn kind(&self) -> &'static str {
        match self {
            LeadEvent::LeadUpdated { .. } => "lead-updated",
            LeadEvent::LeadDeleted { .. } => "lead-deleted",
            LeadEvent::LeadsAssigned { .. } => "leads-assigned",
            LeadEvent::LeadsImported { .. } => "leads-imported",
            LeadEvent::CategoryCreated { .. } => "category-created",
            LeadEvent::CategoryDeleted { .. } => "category-deleted",
        }
    }
}

/// Fan-out hub shared by the service
#[derive(Clone)]
pub struct EventHub {
    tx: broadcast::Sender<LeadEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event; returns how many subscribers received it
    pub fn publish(&self, event: LeadEvent) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                debug!(kind = event.kind(), "No subscribers for event");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LeadEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers_is_not_an_error() {
        let hub = EventHub::new(8);
        assert_eq!(hub.publish(LeadEvent::CategoryDeleted { category_id: 1 }), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events_in_order() {
        let hub = EventHub::new(8);
        let mut rx = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);

        hub.publish(LeadEvent::LeadsImported { category: "Acme".into(), count: 3 });
        hub.publish(LeadEvent::LeadUpdated { lead_id: 7, status: "Interested".into() });

        assert_eq!(
            rx.recv().await.unwrap(),
            LeadEvent::LeadsImported { category: "Acme".into(), count: 3 }
        );
        assert_eq!(rx.recv().await.unwrap().kind(), "lead-updated");
    }

    #[tokio::test]
    async fn test_lagging_subscriber_is_told_how_many_it_missed() {
        let hub = EventHub::new(2);
        let mut rx = hub.subscribe();
        for id in 0..5 {
            hub.publish(LeadEvent::CategoryDeleted { category_id: id });
        }
        match rx.recv().await {
            Err(broadcast::error::RecvError::Lagged(n)) => assert_eq!(n, 3),
            other => panic!("expected lag, got {:?}", other),
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(LeadEvent::CategoryCreated { category_id: 4, name: "Q".into() }).unwrap();
        assert_eq!(json["type"], "category_created");
        assert_eq!(json["name"], "Q");
    }
}
