use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::info;

use pd_core::ids::AccountId;
use pd_core::ports::{IdentityError, IdentityProviderPort};
use pd_core::registration::AccountSession;
use pd_core::security::SecretString;

const MIN_PROVIDER_PASSWORD_LEN: usize = 6;

struct StoredAccount {
    session: AccountSession,
    reloads: u32,
}

#[derive(Default)]
struct ProviderState {
    accounts: HashMap<AccountId, StoredAccount>,
    next_id: u32,
    create_calls: u32,
    send_calls: u32,
    reload_calls: u32,
    sign_out_calls: u32,
    failing_sends: u32,
}

/// Identity provider kept in process memory.
///
/// Accounts are verified by calling [`mark_verified`](Self::mark_verified), or
/// automatically after a configured number of reloads.
#[derive(Default)]
pub struct InMemoryIdentityProvider {
    state: Mutex<ProviderState>,
    auto_verify_after_reloads: Option<u32>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report the email as verified on the `reloads`-th reload of an account.
    pub fn with_auto_verify_after(reloads: u32) -> Self {
        Self {
            auto_verify_after_reloads: Some(reloads),
            ..Self::default()
        }
    }

    fn state(&self) -> MutexGuard<'_, ProviderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mark_verified(&self, id: &AccountId) -> bool {
        match self.state().accounts.get_mut(id) {
            Some(account) => {
                account.session.email_verified = true;
                true
            }
            None => false,
        }
    }

    /// Make the next `count` verification sends fail with a network error.
    pub fn fail_next_sends(&self, count: u32) {
        self.state().failing_sends = count;
    }

    pub fn account(&self, id: &AccountId) -> Option<AccountSession> {
        self.state()
            .accounts
            .get(id)
            .map(|account| account.session.clone())
    }

    pub fn create_calls(&self) -> u32 {
        self.state().create_calls
    }

    pub fn send_calls(&self) -> u32 {
        self.state().send_calls
    }

    pub fn reload_calls(&self) -> u32 {
        self.state().reload_calls
    }

    pub fn sign_out_calls(&self) -> u32 {
        self.state().sign_out_calls
    }
}

#[async_trait]
impl IdentityProviderPort for InMemoryIdentityProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AccountSession, IdentityError> {
        let mut state = self.state();
        state.create_calls += 1;

        let (local, domain) = email.split_once('@').unwrap_or((email, ""));
        if local.is_empty() || !domain.contains('.') {
            return Err(IdentityError::InvalidEmail);
        }
        if password.char_len() < MIN_PROVIDER_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword);
        }
        if state
            .accounts
            .values()
            .any(|account| account.session.email.eq_ignore_ascii_case(email))
        {
            return Err(IdentityError::EmailInUse);
        }

        state.next_id += 1;
        let session = AccountSession::new(format!("local-{:04}", state.next_id), email);
        state.accounts.insert(
            session.id.clone(),
            StoredAccount {
                session: session.clone(),
                reloads: 0,
            },
        );
        Ok(session)
    }

    async fn set_display_name(
        &self,
        session: &AccountSession,
        display_name: &str,
    ) -> Result<(), IdentityError> {
        let mut state = self.state();
        let account = state
            .accounts
            .get_mut(&session.id)
            .ok_or_else(|| IdentityError::Unknown("account not found".to_string()))?;
        account.session.display_name = Some(display_name.to_string());
        Ok(())
    }

    async fn send_verification_email(&self, session: &AccountSession) -> Result<(), IdentityError> {
        let mut state = self.state();
        state.send_calls += 1;
        if state.failing_sends > 0 {
            state.failing_sends -= 1;
            return Err(IdentityError::Network("simulated send failure".to_string()));
        }
        if !state.accounts.contains_key(&session.id) {
            return Err(IdentityError::Unknown("account not found".to_string()));
        }
        info!(account_id = %session.id, "verification email queued (in-memory)");
        Ok(())
    }

    async fn reload(&self, session: &AccountSession) -> Result<AccountSession, IdentityError> {
        let mut state = self.state();
        state.reload_calls += 1;
        let auto_verify = self.auto_verify_after_reloads;
        let account = state
            .accounts
            .get_mut(&session.id)
            .ok_or_else(|| IdentityError::Unknown("account not found".to_string()))?;
        account.reloads += 1;
        if auto_verify.is_some_and(|after| account.reloads >= after) {
            account.session.email_verified = true;
        }
        Ok(account.session.clone())
    }

    async fn sign_out(&self) {
        let mut state = self.state();
        state.sign_out_calls += 1;
    }
}
