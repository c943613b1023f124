//! Decision enforcement through ordered gates.
//!
//! Gates are checkpoints, not obstacles: each must return Approved for
//! enforcement to continue, every check lands in a hash-chained audit
//! trail, and there is no code path that grants human approval
//! programmatically: attempting to enforce a human gate without a
//! registered channel is a policy violation, not a default-allow.

#![deny(unsafe_code)]

pub mod channel;
pub mod error;
pub mod gate;
pub mod intervenor;
pub mod predicate;
pub mod resume;

pub use channel::{ApprovalChannel, ApprovalRequest, ApprovalResponse, ChannelRegistry, ScriptedChannel};
pub use error::InterventionError;
pub use gate::Gate;
pub use intervenor::{Intervenor, RollbackHandler};
pub use predicate::{EnforcementContext, PredicateRegistry};
pub use resume::{resume_pair, ResumeController, ResumeSignal};
