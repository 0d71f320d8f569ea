//! Domain event system — decoupled observation of workflow activity.
//!
//! The workflow publishes an event for every transition attempt. A front end
//! or an audit sink can subscribe without the workflow knowing about it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// Records were aggregated and the workflow entered Prepared
    RecordsFetched {
        workflow_id: String,
        patient_id: String,
        nursing: usize,
        vitals: usize,
        labs: usize,
        timestamp: DateTime<Utc>,
    },

    /// A fetch ended without records or with a store failure
    FetchFailed {
        workflow_id: String,
        patient_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The operator replaced the composed instruction
    InstructionEdited {
        workflow_id: String,
        length: usize,
        timestamp: DateTime<Utc>,
    },

    /// The provider returned a summary and the workflow entered Finalized
    SummaryGenerated {
        workflow_id: String,
        patient_id: String,
        model: String,
        characters: usize,
        timestamp: DateTime<Utc>,
    },

    /// Generation failed; the workflow stays Prepared
    GenerationFailed {
        workflow_id: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// The workflow returned to Idle
    WorkflowReset {
        workflow_id: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::WorkflowReset {
            workflow_id: "wf-1".into(),
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        assert!(matches!(&*event, DomainEvent::WorkflowReset { workflow_id, .. } if workflow_id == "wf-1"));
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new(4);
        bus.publish(DomainEvent::InstructionEdited {
            workflow_id: "wf-2".into(),
            length: 10,
            timestamp: Utc::now(),
        });
    }
}
