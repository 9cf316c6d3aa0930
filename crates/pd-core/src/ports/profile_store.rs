use crate::ids::AccountId;
use crate::ports::ProfileStoreError;
use crate::registration::ProfilePatch;

/// Document store holding profile records keyed by account id.
#[async_trait::async_trait]
pub trait ProfileStorePort: Send + Sync {
    /// Write `patch` under `id`.
    ///
    /// `merge = false` replaces the whole document; `merge = true` only
    /// touches the fields present in the patch. Both must be safe to retry.
    async fn upsert(
        &self,
        id: &AccountId,
        patch: ProfilePatch,
        merge: bool,
    ) -> Result<(), ProfileStoreError>;
}
