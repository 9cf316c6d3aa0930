//! # pd-infra
//!
//! Adapters behind the `pd-core` ports: REST clients for the identity
//! provider and the profile document store, offline in-memory doubles, and
//! the system clock.

pub mod identity;
pub mod memory;
pub mod profile;
pub mod time;

pub use identity::{AccessTokenSource, IdentityToolkitClient};
pub use memory::{InMemoryIdentityProvider, InMemoryProfileStore};
pub use profile::FirestoreProfileStore;
pub use time::SystemClock;
