//! Status-change events - immutable facts published after a committed transition

use serde::{Deserialize, Serialize};

use crate::models::{OrderId, OrderStatus};

/// Status-change event, the unit of information the event bus transports
///
/// Published only after the order store acknowledged the write, so a
/// subscriber never observes a status that was not durably recorded. An event
/// carrying `version = v` is only meaningful to a receiver whose last-seen
/// version for `order_id` is `< v`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusChanged {
    pub order_id: OrderId,
    /// Order version after the transition (authoritative ordering and
    /// deduplication key, strictly +1 per accepted transition)
    pub version: u64,
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
    pub table_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_roundtrip() {
        let event = StatusChanged {
            order_id: 7,
            version: 2,
            old_status: OrderStatus::Created,
            new_status: OrderStatus::InPreparation,
            table_id: 3,
        };

        let json = serde_json::to_string(&event).unwrap();
        let parsed: StatusChanged = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
        assert!(json.contains("\"IN_PREPARATION\""));
    }
}
