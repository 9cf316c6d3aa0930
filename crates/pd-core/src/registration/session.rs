use serde::{Deserialize, Serialize};

use crate::ids::AccountId;

/// Account handle returned by the identity provider.
///
/// Credentials stay inside the provider adapter; this is plain data.
/// `email_verified` only changes through `IdentityProviderPort::reload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSession {
    pub id: AccountId,
    pub email: String,
    pub email_verified: bool,
    pub display_name: Option<String>,
}

impl AccountSession {
    pub fn new(id: impl Into<AccountId>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            email_verified: false,
            display_name: None,
        }
    }
}
