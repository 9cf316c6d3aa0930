//! # pd-core
//!
//! Core domain models and business logic for the propdesk client.
//!
//! This crate contains pure business logic without any infrastructure dependencies.

// Public module exports
pub mod config;
pub mod ids;
pub mod ports;
pub mod registration;
pub mod security;

// Re-export commonly used types at the crate root
pub use config::AppConfig;
pub use ids::AccountId;
pub use registration::{
    RegistrationAction, RegistrationEvent, RegistrationPhase, RegistrationPolicy,
    RegistrationSnapshot, RegistrationState, RegistrationStateMachine,
};
pub use security::SecretString;
