//! Profile store adapters.

mod firestore;

pub use firestore::{FirestoreProfileStore, DEFAULT_PROFILE_BASE_URL};
