//! Offline adapters used by `--offline` runs and integration tests.

mod identity;
mod profile;

pub use identity::InMemoryIdentityProvider;
pub use profile::InMemoryProfileStore;
