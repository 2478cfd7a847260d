//! Notifications for listeners outside the core (analytics, admin refresh).

use bson::oid::ObjectId;
use invitely_db::models::Invitation;
use serde::Serialize;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InvitationEvent {
    InvitationAdded { user_id: ObjectId, count: i64 },
    InvitationSent { invitation: Invitation },
    InvitationAccepted { sender_id: ObjectId, new_user_id: ObjectId },
}

impl InvitationEvent {
    pub fn name(&self) -> &'static str {
        match self {
            InvitationEvent::InvitationAdded { .. } => "invitation_added",
            InvitationEvent::InvitationSent { .. } => "invitation_sent",
            InvitationEvent::InvitationAccepted { .. } => "invitation_accepted",
        }
    }
}

/// Fire-and-forget broadcast of [`InvitationEvent`]s within the process.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<InvitationEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            tx: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    pub fn publish(&self, event: InvitationEvent) {
        tracing::debug!(event = event.name(), "Publishing invitation event");
        // No receivers is fine
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InvitationEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
