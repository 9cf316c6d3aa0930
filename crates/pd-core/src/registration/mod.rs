//! Registration domain module.
//!
//! Input validation, error taxonomy, and the pure registration /
//! email-verification state machine. Side effects live in `pd-app`.

mod error;
mod input;
mod policy;
mod profile;
mod session;
mod snapshot;
pub mod state_machine;

pub use error::{
    AccountCreationError, RegistrationError, ValidationError, VerificationSendError,
};
pub use input::{FormField, RegistrationInput};
pub use policy::RegistrationPolicy;
pub use profile::{ProfileDraft, ProfilePatch, ProfileRecord};
pub use session::AccountSession;
pub use snapshot::RegistrationSnapshot;
pub use state_machine::{
    RegistrationAction, RegistrationEvent, RegistrationPhase, RegistrationState,
    RegistrationStateMachine, VERIFICATION_SENT_MESSAGE, VERIFIED_MESSAGE,
};
