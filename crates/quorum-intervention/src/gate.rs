//! Gate variants.

use std::time::Duration;

use crate::resume::ResumeSignal;

/// A checkpoint in the enforcement sequence. Gates are processed
/// strictly in order; the first non-Approved result skips the rest.
#[derive(Clone)]
pub enum Gate {
    /// Ask a named channel for explicit human approval; blocks until a
    /// response arrives or the deadline passes.
    HumanApproval { channel: String, deadline: Duration },

    /// Rejects if enforcement is still pending once `duration` has
    /// elapsed since it started; bounds total enforcement latency.
    Timeout { duration: Duration },

    /// Requires `required` distinct approvals out of the named channels.
    /// Any rejection before the quorum, or an unreachable quorum,
    /// rejects; an expired deadline times out.
    MultiApprove {
        required: usize,
        channels: Vec<String>,
        deadline: Duration,
    },

    /// Approves iff every named predicate from the registry passes.
    ConditionCheck { conditions: Vec<String> },

    /// Halts the sequence until an external signal satisfies the
    /// condition; without a signal attached the gate is immediately
    /// Pending.
    Pause {
        condition: String,
        signal: Option<ResumeSignal>,
    },
}

impl Gate {
    pub fn name(&self) -> String {
        match self {
            Self::HumanApproval { channel, .. } => format!("HumanApproval({channel})"),
            Self::Timeout { duration } => format!("Timeout({}s)", duration.as_secs()),
            Self::MultiApprove {
                required, channels, ..
            } => format!("MultiApprove({required}/{})", channels.len()),
            Self::ConditionCheck { conditions } => format!("ConditionCheck({})", conditions.len()),
            Self::Pause { condition, .. } => format!("Pause({condition})"),
        }
    }

    /// Whether this gate requires a registered approval channel.
    pub fn required_channels(&self) -> Vec<&str> {
        match self {
            Self::HumanApproval { channel, .. } => vec![channel.as_str()],
            Self::MultiApprove { channels, .. } => {
                channels.iter().map(String::as_str).collect()
            }
            _ => vec![],
        }
    }
}
