use thiserror::Error;

use crate::registration::{AccountCreationError, VerificationSendError};

/// Failure reported by an identity provider adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("email already in use")]
    EmailInUse,

    #[error("invalid email")]
    InvalidEmail,

    #[error("weak password")]
    WeakPassword,

    #[error("network error: {0}")]
    Network(String),

    #[error("identity provider error: {0}")]
    Unknown(String),
}

impl IdentityError {
    pub fn is_network(&self) -> bool {
        matches!(self, IdentityError::Network(_))
    }
}

impl From<&IdentityError> for AccountCreationError {
    fn from(err: &IdentityError) -> Self {
        match err {
            IdentityError::EmailInUse => AccountCreationError::EmailInUse,
            IdentityError::InvalidEmail => AccountCreationError::InvalidEmail,
            IdentityError::WeakPassword => AccountCreationError::WeakPassword,
            IdentityError::Network(_) => AccountCreationError::Network,
            IdentityError::Unknown(_) => AccountCreationError::Unknown,
        }
    }
}

impl From<&IdentityError> for VerificationSendError {
    fn from(err: &IdentityError) -> Self {
        if err.is_network() {
            VerificationSendError::Network
        } else {
            VerificationSendError::Unknown
        }
    }
}

/// Failure reported by a profile store adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileStoreError {
    #[error("network error: {0}")]
    Network(String),

    #[error("profile store error: {0}")]
    Unknown(String),
}
