use serde::Serialize;

use crate::registration::ValidationError;
use crate::security::SecretString;

/// Form fields that can carry a field-scoped error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    FirstName,
    LastName,
    Email,
    Password,
    ConfirmPassword,
}

/// Raw registration form contents as typed by the user.
#[derive(Debug, PartialEq)]
pub struct RegistrationInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
}

impl RegistrationInput {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<SecretString>,
        confirm_password: impl Into<SecretString>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm_password.into(),
        }
    }

    /// Run the local checks in contract order and return the first failure.
    ///
    /// Order: names present, then password length, then confirmation match.
    /// Email syntax is left to the identity provider.
    pub fn validate(&self, min_password_len: usize) -> Result<(), ValidationError> {
        if self.first_name.trim().is_empty() {
            return Err(ValidationError::NameRequired {
                field: FormField::FirstName,
            });
        }
        if self.last_name.trim().is_empty() {
            return Err(ValidationError::NameRequired {
                field: FormField::LastName,
            });
        }
        if self.password.char_len() < min_password_len {
            return Err(ValidationError::PasswordTooShort {
                min_len: min_password_len,
            });
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(())
    }

    /// "First Last", trimmed.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(first: &str, last: &str, pass: &str, confirm: &str) -> RegistrationInput {
        RegistrationInput::new(first, last, "a@b.com", pass, confirm)
    }

    #[test]
    fn validate_accepts_complete_input() {
        assert_eq!(input("Ann", "Lee", "12345678", "12345678").validate(8), Ok(()));
    }

    #[test]
    fn validate_reports_missing_first_name_before_anything_else() {
        let err = input("", "", "short", "other").validate(8).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NameRequired {
                field: FormField::FirstName
            }
        );
    }

    #[test]
    fn validate_treats_whitespace_only_name_as_missing() {
        let err = input("Ann", "   ", "12345678", "12345678")
            .validate(8)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::NameRequired {
                field: FormField::LastName
            }
        );
    }

    #[test]
    fn validate_reports_length_before_mismatch() {
        let err = input("Ann", "Lee", "1234567", "7654321").validate(8).unwrap_err();
        assert_eq!(err, ValidationError::PasswordTooShort { min_len: 8 });
    }

    #[test]
    fn validate_reports_mismatch_for_long_passwords() {
        let err = input("Ann", "Lee", "12345678", "12345679")
            .validate(8)
            .unwrap_err();
        assert_eq!(err, ValidationError::PasswordMismatch);
        assert_eq!(err.field(), FormField::ConfirmPassword);
    }

    #[test]
    fn display_name_joins_trimmed_names() {
        assert_eq!(
            input(" Ann ", "Lee", "12345678", "12345678").display_name(),
            "Ann Lee"
        );
    }
}
