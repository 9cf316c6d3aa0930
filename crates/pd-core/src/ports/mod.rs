//! Port interfaces for the application layer
//!
//! Ports define the contract between the registration use cases and the
//! infrastructure that talks to the identity provider and the document store.
//! Use cases depend on these traits only, so the flow can be driven by real
//! REST adapters, in-memory adapters, or test doubles alike.

mod clock;
pub mod errors;
mod identity_provider;
mod profile_store;
mod registration_observer;

pub use clock::*;
pub use errors::{IdentityError, ProfileStoreError};
pub use identity_provider::IdentityProviderPort;
pub use profile_store::ProfileStorePort;
pub use registration_observer::{NoopRegistrationObserver, RegistrationObserverPort};
