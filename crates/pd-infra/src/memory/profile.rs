use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use pd_core::ids::AccountId;
use pd_core::ports::{ProfileStoreError, ProfileStorePort};
use pd_core::registration::{ProfilePatch, ProfileRecord};

#[derive(Default)]
struct StoreState {
    /// Documents as stored; a merge into a missing id leaves a partial one.
    documents: HashMap<AccountId, ProfilePatch>,
    writes: u32,
    failing_writes: u32,
}

/// Profile store kept in process memory.
///
/// Mirrors document-store semantics: a full write replaces the document, a
/// merge write overlays the given fields and creates the document if needed.
#[derive(Default)]
pub struct InMemoryProfileStore {
    state: Mutex<StoreState>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Complete record for `id`, if every field has been written.
    pub fn get(&self, id: &AccountId) -> Option<ProfileRecord> {
        self.state()
            .documents
            .get(id)
            .and_then(|document| document.to_record(id.clone()))
    }

    /// Stored fields for `id`, complete or not.
    pub fn document(&self, id: &AccountId) -> Option<ProfilePatch> {
        self.state().documents.get(id).cloned()
    }

    /// Write attempts, failed ones included.
    pub fn write_calls(&self) -> u32 {
        self.state().writes
    }

    /// Make the next `count` writes fail with a network error.
    pub fn fail_next_writes(&self, count: u32) {
        self.state().failing_writes = count;
    }
}

#[async_trait]
impl ProfileStorePort for InMemoryProfileStore {
    async fn upsert(
        &self,
        id: &AccountId,
        patch: ProfilePatch,
        merge: bool,
    ) -> Result<(), ProfileStoreError> {
        let mut state = self.state();
        state.writes += 1;
        if state.failing_writes > 0 {
            state.failing_writes -= 1;
            return Err(ProfileStoreError::Network("simulated write failure".to_string()));
        }

        if merge {
            state.documents.entry(id.clone()).or_default().merge(patch);
            debug!(account_id = %id, "profile merged");
        } else {
            state.documents.insert(id.clone(), patch);
            debug!(account_id = %id, "profile written");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pd_core::registration::ProfileDraft;

    fn pending(id: &AccountId) -> ProfilePatch {
        ProfilePatch::from(
            ProfileDraft {
                first_name: "Ann".into(),
                last_name: "Lee".into(),
                email: "a@b.com".into(),
            }
            .into_record(id.clone(), Utc::now()),
        )
    }

    #[tokio::test]
    async fn merge_keeps_existing_fields() {
        let store = InMemoryProfileStore::new();
        let id = AccountId::from("uid-1");
        store.upsert(&id, pending(&id), false).await.unwrap();
        store.upsert(&id, ProfilePatch::verified(), true).await.unwrap();

        let record = store.get(&id).unwrap();
        assert!(record.verified);
        assert_eq!(record.first_name, "Ann");
        assert_eq!(store.write_calls(), 2);
    }

    #[tokio::test]
    async fn merge_without_existing_document_creates_partial_document() {
        let store = InMemoryProfileStore::new();
        let id = AccountId::from("uid-1");

        store.upsert(&id, ProfilePatch::verified(), true).await.unwrap();
        store.upsert(&id, ProfilePatch::verified(), true).await.unwrap();

        assert_eq!(store.document(&id), Some(ProfilePatch::verified()));
        assert!(store.get(&id).is_none());
    }

    #[tokio::test]
    async fn full_write_replaces_document() {
        let store = InMemoryProfileStore::new();
        let id = AccountId::from("uid-1");
        store.upsert(&id, ProfilePatch::verified(), true).await.unwrap();
        store.upsert(&id, pending(&id), false).await.unwrap();

        let record = store.get(&id).unwrap();
        assert!(!record.verified);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let store = InMemoryProfileStore::new();
        let id = AccountId::from("uid-1");
        store.fail_next_writes(1);

        assert!(store.upsert(&id, pending(&id), false).await.is_err());
        assert!(store.upsert(&id, pending(&id), false).await.is_ok());
        assert_eq!(store.write_calls(), 2);
    }
}
