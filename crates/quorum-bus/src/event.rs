//! Bus event identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quorum_chain::{artifact_hash, timestamp_now};

use crate::BusError;

/// Hex prefix length of a bus event id.
const EVENT_ID_LEN: usize = 12;

/// A single event on the bus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BusEvent {
    pub topic: String,
    pub payload: serde_json::Value,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    /// 12-hex id derived from the canonical form of the other fields.
    pub event_id: String,
}

impl BusEvent {
    pub fn new(
        topic: impl Into<String>,
        payload: serde_json::Value,
        source: impl Into<String>,
    ) -> Result<Self, BusError> {
        let mut event = Self {
            topic: topic.into(),
            payload,
            source: source.into(),
            timestamp: timestamp_now(),
            event_id: String::new(),
        };
        event.event_id = artifact_hash(&event, &["event_id"], EVENT_ID_LEN)?;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_is_twelve_hex_chars() {
        let event = BusEvent::new("threshold.detected", serde_json::json!({"v": 1}), "detection")
            .unwrap();
        assert_eq!(event.event_id.len(), 12);
        assert!(event.event_id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn identical_fields_identical_id() {
        let a = BusEvent::new("t", serde_json::json!({"v": 1}), "s").unwrap();
        let recomputed = quorum_chain::artifact_hash(&a, &["event_id"], 12).unwrap();
        assert_eq!(a.event_id, recomputed);
    }
}
