//! Registration error taxonomy.
//!
//! Provider-level failures are translated into these kinds at the flow
//! boundary. Only `user_message()` text ever reaches the UI.

use crate::registration::FormField;

/// Local form validation failure. No network call is made when one occurs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field:?} is required")]
    NameRequired { field: FormField },
    #[error("password shorter than {min_len} characters")]
    PasswordTooShort { min_len: usize },
    #[error("password confirmation does not match")]
    PasswordMismatch,
}

impl ValidationError {
    /// Field the error is rendered next to.
    pub fn field(&self) -> FormField {
        match self {
            ValidationError::NameRequired { field } => *field,
            ValidationError::PasswordTooShort { .. } => FormField::Password,
            ValidationError::PasswordMismatch => FormField::ConfirmPassword,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ValidationError::NameRequired {
                field: FormField::LastName,
            } => "Last name is required.".to_string(),
            ValidationError::NameRequired { .. } => "First name is required.".to_string(),
            ValidationError::PasswordTooShort { min_len } => {
                format!("Password must be at least {min_len} characters.")
            }
            ValidationError::PasswordMismatch => "Passwords do not match.".to_string(),
        }
    }
}

/// Account creation failure, classified from the identity provider's error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccountCreationError {
    #[error("email already in use")]
    EmailInUse,
    #[error("invalid email")]
    InvalidEmail,
    #[error("weak password")]
    WeakPassword,
    #[error("network error")]
    Network,
    #[error("unknown error")]
    Unknown,
}

impl AccountCreationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AccountCreationError::EmailInUse => "An account with this email already exists.",
            AccountCreationError::InvalidEmail => "Enter a valid email address.",
            AccountCreationError::WeakPassword => {
                "Password is too weak. Choose a stronger password."
            }
            AccountCreationError::Network => {
                "Network error. Check your connection and try again."
            }
            AccountCreationError::Unknown => "Registration failed. Please try again.",
        }
    }
}

/// Verification email could not be sent. The account still exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerificationSendError {
    #[error("network error")]
    Network,
    #[error("unknown error")]
    Unknown,
}

impl VerificationSendError {
    pub fn user_message(&self) -> &'static str {
        match self {
            VerificationSendError::Network => {
                "Could not send the verification email. Check your connection and try again."
            }
            VerificationSendError::Unknown => {
                "Could not send the verification email. Please try again."
            }
        }
    }
}

/// Form-level error rendered above the form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("account creation failed: {0}")]
    AccountCreation(AccountCreationError),
    #[error("verification email failed: {0}")]
    VerificationSend(VerificationSendError),
    #[error("verification check failed {failures} times in a row")]
    VerificationCheck { failures: u32 },
    #[error("profile write failed")]
    ProfileWrite,
}

impl RegistrationError {
    pub fn user_message(&self) -> String {
        match self {
            RegistrationError::AccountCreation(err) => err.user_message().to_string(),
            RegistrationError::VerificationSend(err) => err.user_message().to_string(),
            RegistrationError::VerificationCheck { .. } => {
                "We're having trouble checking your verification status. We'll keep trying."
                    .to_string()
            }
            RegistrationError::ProfileWrite => {
                "Your profile could not be saved right now. It will be updated later."
                    .to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_never_leak_provider_codes() {
        let errors = [
            RegistrationError::AccountCreation(AccountCreationError::EmailInUse),
            RegistrationError::AccountCreation(AccountCreationError::Unknown),
            RegistrationError::VerificationSend(VerificationSendError::Network),
            RegistrationError::VerificationCheck { failures: 5 },
            RegistrationError::ProfileWrite,
        ];
        for err in errors {
            let message = err.user_message();
            assert!(!message.contains("EMAIL_EXISTS"));
            assert!(message.ends_with('.'), "{message}");
        }
    }

    #[test]
    fn password_too_short_message_names_the_minimum() {
        let err = ValidationError::PasswordTooShort { min_len: 8 };
        assert_eq!(err.user_message(), "Password must be at least 8 characters.");
        assert_eq!(err.field(), FormField::Password);
    }
}
