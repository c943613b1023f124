//! Structured deliberation: where detection becomes decision.
//!
//! A deliberation session collects one vote per registered stakeholder
//! (automated evaluators and any externally attached human sources),
//! aggregates them under fixed priority rules, and preserves every
//! minority position verbatim. Dissent is data, not failure.

#![deny(unsafe_code)]

pub mod deliberator;
pub mod error;
pub mod evaluators;
pub mod mocks;
pub mod provider;
pub mod template;

pub use deliberator::{Deliberator, DeliberatorConfig, StakeholderRegistry};
pub use error::DeliberationError;
pub use evaluators::{EthicalEvaluator, TechnicalEvaluator};
pub use provider::VoteProvider;
pub use template::{DeliberationTemplate, Dimension};
