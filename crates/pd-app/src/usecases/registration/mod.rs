//! Registration use cases.
//!
//! This module exposes the registration flow orchestrator.

mod context;
pub mod flow;
mod policy;
mod timer_slot;

pub use flow::{RegistrationFlow, RegistrationFlowError};
pub use policy::policy_from_config;
