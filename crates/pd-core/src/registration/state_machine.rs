//! Registration state machine.
//!
//! Pure transition function for the registration / email-verification flow.
//! It never performs I/O: every side effect is returned as a
//! [`RegistrationAction`] and every outcome comes back as a
//! [`RegistrationEvent`].

use serde::Serialize;

use crate::ids::AccountId;
use crate::registration::{
    AccountCreationError, AccountSession, ProfileDraft, RegistrationError, RegistrationInput,
    RegistrationPolicy, ValidationError, VerificationSendError,
};
use crate::security::SecretString;

pub const VERIFICATION_SENT_MESSAGE: &str =
    "Verification email sent. Check your inbox and confirm your address to continue.";
pub const VERIFIED_MESSAGE: &str = "Email verified.";

/// Phase of the registration flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RegistrationPhase {
    #[default]
    Idle,
    Validating,
    Submitting,
    /// Account exists, verification email requested, poller not yet confirmed.
    AwaitingVerification,
    /// Verification poller running.
    Polling,
    /// Email verified. Terminal.
    Completed,
}

impl RegistrationPhase {
    /// Account exists and the flow waits for the user to verify the email.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            RegistrationPhase::AwaitingVerification | RegistrationPhase::Polling
        )
    }
}

/// Bookkeeping owned by one registration flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationState {
    pub phase: RegistrationPhase,
    /// First failing validation rule, if any.
    pub field_error: Option<ValidationError>,
    pub form_error: Option<RegistrationError>,
    pub info_message: Option<String>,
    pub resend_cooldown_secs: u32,
    pub session: Option<AccountSession>,
    pub profile_draft: Option<ProfileDraft>,
    /// The initial verification email has been attempted.
    pub verification_sent: bool,
    /// Consecutive failed polls.
    pub poll_failures: u32,
}

/// Inputs that drive the flow: user intents, timer ticks, and action outcomes.
#[derive(Debug, PartialEq)]
pub enum RegistrationEvent {
    /// User submits the form.
    Submit { input: RegistrationInput },
    InputRejected { error: ValidationError },
    InputAccepted { input: RegistrationInput },
    AccountCreated { session: AccountSession },
    AccountCreationFailed { error: AccountCreationError },
    ProfileWriteFailed,
    VerificationSent,
    VerificationSendFailed { error: VerificationSendError },
    PollingStarted,
    /// Poll timer fired.
    PollTick,
    VerificationPending,
    VerificationObserved { session: AccountSession },
    PollFailed,
    /// Cooldown timer fired.
    CooldownTick,
    /// User asks for another verification email.
    ResendRequested,
}

/// Side effects produced by state transitions.
#[derive(Debug, PartialEq)]
pub enum RegistrationAction {
    ValidateInput {
        input: RegistrationInput,
    },
    CreateAccount {
        email: String,
        password: SecretString,
        display_name: String,
    },
    /// Best-effort sign-out after a failed creation.
    DiscardAccount,
    /// Full write of the profile with `verified = false`.
    WritePendingProfile {
        account_id: AccountId,
        draft: ProfileDraft,
    },
    SendVerification {
        session: AccountSession,
    },
    StartPolling,
    StopPolling,
    StartCooldown,
    StopCooldown,
    ReloadSession {
        session: AccountSession,
    },
    /// Merge write of `verified = true`.
    MarkProfileVerified {
        account_id: AccountId,
    },
    NotifyVerified {
        account_id: AccountId,
    },
}

impl RegistrationEvent {
    /// Variant name without payload, safe to log.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistrationEvent::Submit { .. } => "Submit",
            RegistrationEvent::InputRejected { .. } => "InputRejected",
            RegistrationEvent::InputAccepted { .. } => "InputAccepted",
            RegistrationEvent::AccountCreated { .. } => "AccountCreated",
            RegistrationEvent::AccountCreationFailed { .. } => "AccountCreationFailed",
            RegistrationEvent::ProfileWriteFailed => "ProfileWriteFailed",
            RegistrationEvent::VerificationSent => "VerificationSent",
            RegistrationEvent::VerificationSendFailed { .. } => "VerificationSendFailed",
            RegistrationEvent::PollingStarted => "PollingStarted",
            RegistrationEvent::PollTick => "PollTick",
            RegistrationEvent::VerificationPending => "VerificationPending",
            RegistrationEvent::VerificationObserved { .. } => "VerificationObserved",
            RegistrationEvent::PollFailed => "PollFailed",
            RegistrationEvent::CooldownTick => "CooldownTick",
            RegistrationEvent::ResendRequested => "ResendRequested",
        }
    }
}

impl RegistrationAction {
    /// Variant name without payload, safe to log.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistrationAction::ValidateInput { .. } => "ValidateInput",
            RegistrationAction::CreateAccount { .. } => "CreateAccount",
            RegistrationAction::DiscardAccount => "DiscardAccount",
            RegistrationAction::WritePendingProfile { .. } => "WritePendingProfile",
            RegistrationAction::SendVerification { .. } => "SendVerification",
            RegistrationAction::StartPolling => "StartPolling",
            RegistrationAction::StopPolling => "StopPolling",
            RegistrationAction::StartCooldown => "StartCooldown",
            RegistrationAction::StopCooldown => "StopCooldown",
            RegistrationAction::ReloadSession { .. } => "ReloadSession",
            RegistrationAction::MarkProfileVerified { .. } => "MarkProfileVerified",
            RegistrationAction::NotifyVerified { .. } => "NotifyVerified",
        }
    }
}

/// Pure registration state machine.
pub struct RegistrationStateMachine;

impl RegistrationStateMachine {
    pub fn transition(
        state: RegistrationState,
        event: RegistrationEvent,
        policy: &RegistrationPolicy,
    ) -> (RegistrationState, Vec<RegistrationAction>) {
        use RegistrationEvent as E;
        use RegistrationPhase as P;

        let mut next = state;
        match (next.phase, event) {
            (P::Idle, E::Submit { input }) => {
                next.phase = P::Validating;
                next.field_error = None;
                next.form_error = None;
                next.info_message = None;
                (next, vec![RegistrationAction::ValidateInput { input }])
            }
            (P::Validating, E::InputRejected { error }) => {
                next.phase = P::Idle;
                next.field_error = Some(error);
                (next, Vec::new())
            }
            (P::Validating, E::InputAccepted { input }) => {
                let display_name = input.display_name();
                let RegistrationInput {
                    first_name,
                    last_name,
                    email,
                    password,
                    ..
                } = input;
                next.phase = P::Submitting;
                next.profile_draft = Some(ProfileDraft {
                    first_name: first_name.trim().to_string(),
                    last_name: last_name.trim().to_string(),
                    email: email.clone(),
                });
                (
                    next,
                    vec![RegistrationAction::CreateAccount {
                        email,
                        password,
                        display_name,
                    }],
                )
            }
            (P::Submitting, E::AccountCreated { session }) => {
                next.phase = P::AwaitingVerification;
                let mut actions = Vec::with_capacity(3);
                if let Some(draft) = next.profile_draft.clone() {
                    actions.push(RegistrationAction::WritePendingProfile {
                        account_id: session.id.clone(),
                        draft,
                    });
                }
                actions.push(RegistrationAction::SendVerification {
                    session: session.clone(),
                });
                actions.push(RegistrationAction::StartPolling);
                next.session = Some(session);
                (next, actions)
            }
            (P::Submitting, E::AccountCreationFailed { error }) => {
                next.phase = P::Idle;
                next.form_error = Some(RegistrationError::AccountCreation(error));
                next.session = None;
                next.profile_draft = None;
                (next, vec![RegistrationAction::DiscardAccount])
            }
            (phase, E::VerificationSent) if phase.is_pending() => {
                next.verification_sent = true;
                // A failed profile write stays visible until verification completes.
                if next.form_error != Some(RegistrationError::ProfileWrite) {
                    next.form_error = None;
                }
                next.info_message = Some(VERIFICATION_SENT_MESSAGE.to_string());
                next.resend_cooldown_secs = policy.resend_cooldown_secs;
                let actions = if next.resend_cooldown_secs > 0 {
                    vec![RegistrationAction::StartCooldown]
                } else {
                    Vec::new()
                };
                (next, actions)
            }
            (phase, E::VerificationSendFailed { error }) if phase.is_pending() => {
                next.verification_sent = true;
                next.form_error = Some(RegistrationError::VerificationSend(error));
                (next, Vec::new())
            }
            (P::AwaitingVerification, E::PollingStarted) => {
                next.phase = P::Polling;
                (next, Vec::new())
            }
            (phase, E::PollTick) if phase.is_pending() => match next.session.clone() {
                Some(session) => (next, vec![RegistrationAction::ReloadSession { session }]),
                None => (next, Vec::new()),
            },
            (phase, E::VerificationPending) if phase.is_pending() => {
                next.poll_failures = 0;
                if matches!(next.form_error, Some(RegistrationError::VerificationCheck { .. })) {
                    next.form_error = None;
                }
                (next, Vec::new())
            }
            (phase, E::PollFailed) if phase.is_pending() => {
                next.poll_failures = next.poll_failures.saturating_add(1);
                if next.poll_failures >= policy.max_poll_failures {
                    next.form_error = Some(RegistrationError::VerificationCheck {
                        failures: next.poll_failures,
                    });
                }
                (next, Vec::new())
            }
            (phase, E::VerificationObserved { session }) if phase.is_pending() => {
                let account_id = session.id.clone();
                next.phase = P::Completed;
                next.session = Some(session);
                next.form_error = None;
                next.info_message = Some(VERIFIED_MESSAGE.to_string());
                next.resend_cooldown_secs = 0;
                (
                    next,
                    vec![
                        RegistrationAction::StopPolling,
                        RegistrationAction::StopCooldown,
                        RegistrationAction::MarkProfileVerified {
                            account_id: account_id.clone(),
                        },
                        RegistrationAction::NotifyVerified { account_id },
                    ],
                )
            }
            (phase, E::CooldownTick) if phase.is_pending() => {
                next.resend_cooldown_secs = next.resend_cooldown_secs.saturating_sub(1);
                if next.resend_cooldown_secs == 0 {
                    (next, vec![RegistrationAction::StopCooldown])
                } else {
                    (next, Vec::new())
                }
            }
            (phase, E::ResendRequested)
                if phase.is_pending()
                    && next.verification_sent
                    && next.resend_cooldown_secs == 0 =>
            {
                match next.session.clone() {
                    Some(session) => {
                        (next, vec![RegistrationAction::SendVerification { session }])
                    }
                    None => (next, Vec::new()),
                }
            }
            (phase, E::ProfileWriteFailed) if phase != P::Idle => {
                next.form_error = Some(RegistrationError::ProfileWrite);
                (next, Vec::new())
            }
            (_phase, _event) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(phase = ?_phase, event = _event.kind(), "registration event ignored");
                (next, Vec::new())
            }
        }
    }
}
