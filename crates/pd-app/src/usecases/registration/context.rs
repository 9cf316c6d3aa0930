use tokio::sync::{Mutex, MutexGuard};

use pd_core::registration::RegistrationState;

/// Shared registration context containing state and dispatch lock.
///
/// ## Lock Ordering
/// When acquiring both locks, acquire `dispatch_lock` first, then `state`.
/// - `dispatch_lock`: held for a whole dispatch (transition, actions, follow-ups).
/// - `state`: short reads and writes.
pub(crate) struct RegistrationContext {
    state: Mutex<RegistrationState>,
    /// Serializes user intents and timer ticks.
    dispatch_lock: Mutex<()>,
}

impl RegistrationContext {
    pub(crate) fn new(initial_state: RegistrationState) -> Self {
        Self {
            state: Mutex::new(initial_state),
            dispatch_lock: Mutex::new(()),
        }
    }

    /// Does NOT acquire `dispatch_lock`.
    pub(crate) async fn get_state(&self) -> RegistrationState {
        self.state.lock().await.clone()
    }

    pub(crate) async fn acquire_dispatch_lock(&self) -> MutexGuard<'_, ()> {
        self.dispatch_lock.lock().await
    }

    /// Only call while holding `dispatch_lock`.
    pub(crate) async fn set_state(&self, state: RegistrationState) {
        let mut guard = self.state.lock().await;
        *guard = state;
    }
}

impl Default for RegistrationContext {
    fn default() -> Self {
        Self::new(RegistrationState::default())
    }
}
