//! Approval channels.
//!
//! A channel is the abstract surface a human (or a pool of humans)
//! answers through. The intervenor never fabricates a response; it only
//! relays whatever the channel returns, bounded by the gate deadline.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::InterventionError;

/// What an approver is asked to decide on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// `audit_hash` of the deliberation under enforcement.
    pub decision_hash: String,
    pub decision: String,
    pub rationale: String,
    pub gate_name: String,
    pub target: String,
}

/// One approver's answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalResponse {
    pub approved: bool,
    pub approver: String,
    pub comment: Option<String>,
}

/// Abstract human-interaction surface.
#[async_trait]
pub trait ApprovalChannel: Send + Sync {
    async fn request_approval(
        &self,
        request: ApprovalRequest,
    ) -> Result<ApprovalResponse, InterventionError>;
}

/// Named channels available to gates. Immutable once configuration is
/// done; a circuit invocation only reads it.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    channels: BTreeMap<String, Arc<dyn ApprovalChannel>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, channel: Arc<dyn ApprovalChannel>) {
        self.channels.insert(name.into(), channel);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ApprovalChannel>> {
        self.channels.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }
}

/// Channel with a pre-scripted answer, optionally delayed. The answer
/// still travels the full channel path; this is a stand-in responder,
/// not a bypass.
pub struct ScriptedChannel {
    approver: String,
    approved: bool,
    delay: Option<Duration>,
}

impl ScriptedChannel {
    pub fn approving(approver: impl Into<String>) -> Self {
        Self {
            approver: approver.into(),
            approved: true,
            delay: None,
        }
    }

    pub fn rejecting(approver: impl Into<String>) -> Self {
        Self {
            approver: approver.into(),
            approved: false,
            delay: None,
        }
    }

    /// Never answers within any realistic deadline.
    pub fn silent(approver: impl Into<String>) -> Self {
        Self {
            approver: approver.into(),
            approved: true,
            delay: Some(Duration::from_secs(86_400)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl ApprovalChannel for ScriptedChannel {
    async fn request_approval(
        &self,
        _request: ApprovalRequest,
    ) -> Result<ApprovalResponse, InterventionError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(ApprovalResponse {
            approved: self.approved,
            approver: self.approver.clone(),
            comment: None,
        })
    }
}
