use crate::ids::AccountId;
use crate::registration::RegistrationSnapshot;

/// Receives registration progress for rendering and routing.
#[async_trait::async_trait]
pub trait RegistrationObserverPort: Send + Sync {
    async fn state_changed(&self, snapshot: RegistrationSnapshot);

    /// Called exactly once per flow, after which the flow is inert.
    async fn verified(&self, account_id: &AccountId);
}

/// Observer that drops everything.
pub struct NoopRegistrationObserver;

#[async_trait::async_trait]
impl RegistrationObserverPort for NoopRegistrationObserver {
    async fn state_changed(&self, _snapshot: RegistrationSnapshot) {}

    async fn verified(&self, _account_id: &AccountId) {}
}
