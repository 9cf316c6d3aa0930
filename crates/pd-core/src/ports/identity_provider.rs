use crate::ports::IdentityError;
use crate::registration::AccountSession;
use crate::security::SecretString;

/// Identity provider: owns credentials, password hashing, and verification
/// email delivery.
#[async_trait::async_trait]
pub trait IdentityProviderPort: Send + Sync {
    async fn create_account(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AccountSession, IdentityError>;

    async fn set_display_name(
        &self,
        session: &AccountSession,
        display_name: &str,
    ) -> Result<(), IdentityError>;

    async fn send_verification_email(&self, session: &AccountSession)
        -> Result<(), IdentityError>;

    /// Fetch a fresh copy of the session, including `email_verified`.
    async fn reload(&self, session: &AccountSession) -> Result<AccountSession, IdentityError>;

    /// Drop whatever session state the provider holds. Best effort.
    async fn sign_out(&self);
}
