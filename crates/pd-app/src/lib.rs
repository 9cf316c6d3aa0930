//! propdesk application orchestration layer
//!
//! This crate contains the registration use cases: the flow orchestrator that
//! drives the pure state machine from `pd-core` and owns its timers.

pub mod deps;
pub mod usecases;

pub use deps::RegistrationDeps;
pub use usecases::registration::{policy_from_config, RegistrationFlow, RegistrationFlowError};
