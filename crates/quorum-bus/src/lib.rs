//! In-process pub/sub bus connecting the circuit stages.
//!
//! Topics form a dotted namespace (`threshold.detected`,
//! `simulation.complete`, ...). Delivery is synchronous: `publish` does
//! not return until every matching subscriber has been invoked once.
//! A failing subscriber is isolated: its error is logged and delivery
//! continues, and every published event lands in an in-memory log that
//! can be snapshotted or exported as newline-delimited JSON for audit.
//!
//! There is no cross-topic ordering guarantee, no backpressure, and no
//! delivery across process boundaries.

#![deny(unsafe_code)]

pub mod event;
pub mod topic;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, RwLock};

use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

pub use event::BusEvent;
pub use topic::TopicPattern;

/// Well-known circuit topics.
pub mod topics {
    pub const THRESHOLD_DETECTED: &str = "threshold.detected";
    pub const SIMULATION_COMPLETE: &str = "simulation.complete";
    pub const DELIBERATION_COMPLETE: &str = "deliberation.complete";
    pub const INTERVENTION_COMPLETE: &str = "intervention.complete";
    pub const CIRCUIT_COMPLETE: &str = "circuit.complete";
    pub const CIRCUIT_CANCELLED: &str = "circuit.cancelled";
}

/// Boxed subscriber error; the bus only logs these.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

type Handler = Arc<dyn Fn(&BusEvent) -> Result<(), HandlerError> + Send + Sync>;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("event log export failed: {0}")]
    Export(#[from] serde_json::Error),

    #[error("invalid topic pattern: {0}")]
    Pattern(String),

    #[error(transparent)]
    Chain(#[from] quorum_chain::ChainError),
}

/// Handle for removing a subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionId(Uuid);

struct Subscription {
    id: SubscriptionId,
    pattern: TopicPattern,
    handler: Handler,
}

/// Topic-addressed synchronous event bus.
///
/// The subscriber list is snapshotted before each dispatch, so a handler
/// that subscribes or unsubscribes does not affect in-flight delivery.
#[derive(Default)]
pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
    log: Mutex<Vec<BusEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a handler to a topic pattern: an exact topic, a prefix
    /// pattern ending in `*` (`threshold.*`), or the wildcard `*`.
    pub fn subscribe<F>(&self, pattern: &str, handler: F) -> Result<SubscriptionId, BusError>
    where
        F: Fn(&BusEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let pattern = TopicPattern::parse(pattern)
            .ok_or_else(|| BusError::Pattern(pattern.to_string()))?;
        let id = SubscriptionId(Uuid::new_v4());
        let sub = Subscription {
            id: id.clone(),
            pattern,
            handler: Arc::new(handler),
        };

        let mut subs = self
            .subscriptions
            .write()
            .unwrap_or_else(|poison| poison.into_inner());
        subs.push(sub);
        debug!(subscription_id = %id.0, "subscription registered");
        Ok(id)
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        let mut subs = self
            .subscriptions
            .write()
            .unwrap_or_else(|poison| poison.into_inner());
        let before = subs.len();
        subs.retain(|s| s.id != *id);
        before != subs.len()
    }

    /// Publish an event. Returns once every matching subscriber has run.
    ///
    /// A panicking or erroring subscriber is logged and skipped; the
    /// event stays in the log and remaining subscribers still run.
    pub fn publish(
        &self,
        topic: &str,
        payload: serde_json::Value,
        source: &str,
    ) -> Result<BusEvent, BusError> {
        let event = BusEvent::new(topic, payload, source)?;

        {
            let mut log = self.log.lock().unwrap_or_else(|poison| poison.into_inner());
            log.push(event.clone());
        }

        let handlers: Vec<Handler> = {
            let subs = self
                .subscriptions
                .read()
                .unwrap_or_else(|poison| poison.into_inner());
            subs.iter()
                .filter(|s| s.pattern.matches(topic))
                .map(|s| Arc::clone(&s.handler))
                .collect()
        };

        for handler in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(topic, error = %err, "subscriber returned an error");
                }
                Err(_) => {
                    warn!(topic, "subscriber panicked during delivery");
                }
            }
        }

        debug!(topic, source, event_id = %event.event_id, "event published");
        Ok(event)
    }

    /// Snapshot of every event published so far, in publication order.
    pub fn log_snapshot(&self) -> Vec<BusEvent> {
        self.log
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    /// Export the event log as newline-delimited JSON.
    pub fn export_ndjson(&self) -> Result<String, BusError> {
        let log = self.log.lock().unwrap_or_else(|poison| poison.into_inner());
        let mut out = String::new();
        for event in log.iter() {
            out.push_str(&serde_json::to_string(event)?);
            out.push('\n');
        }
        Ok(out)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(|poison| poison.into_inner())
            .len()
    }
}
