//! # propdesk
//!
//! Bootstrap and command-line driver for the registration flow: config
//! loading, tracing setup, adapter wiring, and the console observer.

pub mod bootstrap;
pub mod commands;
pub mod observer;

pub use bootstrap::{init_tracing_subscriber, load_app_config, wire_registration, Backend};
pub use observer::ConsoleObserver;
