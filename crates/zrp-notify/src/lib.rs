//! Notification hub (C7): a WebSocket/SSE broadcaster plus an email
//! dispatcher, mirroring the teacher's `mqk-daemon::state::AppState::bus`
//! shape — one `tokio::sync::broadcast::Sender<DomainEvent>` fans events to
//! every connected client. A lagging receiver silently drops its oldest
//! queued messages rather than blocking the publisher (§4.7: "a bounded
//! per-client queue... drops oldest on overflow" — `broadcast`'s own
//! backpressure policy already gives us this for free).

pub mod email;

use tokio::sync::broadcast;
use zrp_schemas::{DomainEvent, EmailEventType, Module};

/// Per-client queue depth (§4.7: "e.g., 256 messages").
pub const CHANNEL_CAPACITY: usize = 256;

/// Cloneable broadcast handle shared across every HTTP connection's
/// WebSocket loop, same role as the teacher's `AppState.bus`.
#[derive(Clone)]
pub struct Hub {
    tx: broadcast::Sender<DomainEvent>,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Fan out an event to every subscriber. Must be called strictly after
    /// the originating transaction commits (§5 "the C7 broadcast is
    /// dispatched after commit"). A send with zero subscribers is not an
    /// error — the event is simply dropped.
    pub fn publish(&self, event: DomainEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}

/// Resolves the `(module, event_type)` an email-eligible domain event maps
/// to, or `None` when the event has no email counterpart (§4.7's
/// subscribable set is a strict subset of the broadcast set — e.g.
/// `wo_complete` and `inventory_changed` are WebSocket-only).
pub fn email_event_for(event: &DomainEvent) -> Option<(Module, EmailEventType)> {
    match event {
        DomainEvent::EcoApproved { .. } => Some((Module::Ecos, EmailEventType::EcoApproved)),
        DomainEvent::EcoImplemented { .. } => Some((Module::Ecos, EmailEventType::EcoImplemented)),
        DomainEvent::PoReceived { .. } => Some((Module::Procurement, EmailEventType::PoReceived)),
        DomainEvent::NcrCreated { .. } => Some((Module::Ncrs, EmailEventType::NcrCreated)),
        DomainEvent::InventoryChanged { .. }
        | DomainEvent::WoComplete { .. }
        | DomainEvent::CampaignProgress { .. }
        | DomainEvent::Audit { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_all_subscribers() {
        let hub = Hub::new();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();
        hub.publish(DomainEvent::PoReceived { po_id: "PO-2026-0001".into() });

        assert!(matches!(a.recv().await.unwrap(), DomainEvent::PoReceived { .. }));
        assert!(matches!(b.recv().await.unwrap(), DomainEvent::PoReceived { .. }));
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_error() {
        let hub = Hub::new();
        hub.publish(DomainEvent::WoComplete {
            wo_id: "WO-2026-0001".into(),
            qty_good: 1,
            qty_scrap: 0,
        });
    }

    #[test]
    fn wo_complete_has_no_email_mapping() {
        let event = DomainEvent::WoComplete { wo_id: "WO-2026-0001".into(), qty_good: 1, qty_scrap: 0 };
        assert!(email_event_for(&event).is_none());
    }

    #[test]
    fn ncr_created_maps_to_ncrs_module() {
        let event = DomainEvent::NcrCreated { ncr_id: "NCR-2026-0001".into(), severity: zrp_schemas::NcrSeverity::Major };
        let (module, event_type) = email_event_for(&event).unwrap();
        assert_eq!(module, Module::Ncrs);
        assert_eq!(event_type, EmailEventType::NcrCreated);
    }
}
