//! Registration flow orchestrator.
//!
//! Drives [`RegistrationStateMachine`] and executes its side effects against
//! the identity provider and profile store ports. The flow owns two timer
//! slots: the verification poller and the resend cooldown ticker. State
//! machine exits stop them softly; teardown (explicit or on drop) aborts them.

use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, error, info, info_span, warn, Instrument};

use pd_core::{
    ids::AccountId,
    ports::{
        ClockPort, IdentityProviderPort, ProfileStoreError, ProfileStorePort,
        RegistrationObserverPort,
    },
    registration::{
        AccountSession, ProfilePatch, RegistrationAction, RegistrationEvent, RegistrationInput,
        RegistrationPolicy, RegistrationSnapshot, RegistrationState, RegistrationStateMachine,
    },
    security::SecretString,
};

use crate::deps::RegistrationDeps;
use crate::usecases::registration::context::RegistrationContext;
use crate::usecases::registration::timer_slot::{TickFuture, TimerSlot};

/// Errors produced by the registration flow.
///
/// Provider failures never show up here: they are folded into the flow state.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationFlowError {
    #[error("registration flow has been torn down")]
    TornDown,
}

struct FlowTimers {
    poller: TimerSlot,
    cooldown: TimerSlot,
}

struct FlowInner {
    context: RegistrationContext,
    policy: RegistrationPolicy,
    identity: Arc<dyn IdentityProviderPort>,
    profiles: Arc<dyn ProfileStorePort>,
    clock: Arc<dyn ClockPort>,
    observer: Arc<dyn RegistrationObserverPort>,
    timers: Mutex<FlowTimers>,
    torn_down: AtomicBool,
}

/// One registration session, from form submit to verified email.
///
/// Create it when the registration screen mounts; drop it (or call
/// [`RegistrationFlow::teardown`]) when the screen goes away.
pub struct RegistrationFlow {
    inner: Arc<FlowInner>,
}

impl RegistrationFlow {
    pub fn new(deps: RegistrationDeps, policy: RegistrationPolicy) -> Self {
        let RegistrationDeps {
            identity,
            profiles,
            clock,
            observer,
        } = deps;
        Self {
            inner: Arc::new(FlowInner {
                context: RegistrationContext::default(),
                policy,
                identity,
                profiles,
                clock,
                observer,
                timers: Mutex::new(FlowTimers {
                    poller: TimerSlot::new("verification_poller"),
                    cooldown: TimerSlot::new("resend_cooldown"),
                }),
                torn_down: AtomicBool::new(false),
            }),
        }
    }

    pub async fn submit(
        &self,
        input: RegistrationInput,
    ) -> Result<RegistrationSnapshot, RegistrationFlowError> {
        self.inner
            .dispatch(RegistrationEvent::Submit { input })
            .await
    }

    /// Ask for another verification email. Ignored while the cooldown runs.
    pub async fn resend_verification(&self) -> Result<RegistrationSnapshot, RegistrationFlowError> {
        self.inner.dispatch(RegistrationEvent::ResendRequested).await
    }

    pub async fn snapshot(&self) -> RegistrationSnapshot {
        RegistrationSnapshot::from(&self.inner.context.get_state().await)
    }

    pub async fn state(&self) -> RegistrationState {
        self.inner.context.get_state().await
    }

    pub fn is_polling(&self) -> bool {
        self.inner.timers().poller.is_active()
    }

    pub fn cooldown_active(&self) -> bool {
        self.inner.timers().cooldown.is_active()
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.is_torn_down()
    }

    /// Release every timer and make the flow inert. Idempotent.
    pub fn teardown(&self) {
        self.inner.teardown();
    }
}

impl Drop for RegistrationFlow {
    fn drop(&mut self) {
        self.inner.teardown();
    }
}

impl FlowInner {
    fn timers(&self) -> MutexGuard<'_, FlowTimers> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Sets the flag under the timers lock so no slot can start afterwards.
    fn teardown(&self) {
        let mut timers = self.timers();
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        Self::release_timers(&mut timers);
        drop(timers);
        info!("registration flow torn down");
    }

    fn release_timers(timers: &mut FlowTimers) {
        timers.poller.abort();
        timers.cooldown.abort();
    }

    async fn dispatch(
        self: &Arc<Self>,
        event: RegistrationEvent,
    ) -> Result<RegistrationSnapshot, RegistrationFlowError> {
        if self.is_torn_down() {
            return Err(RegistrationFlowError::TornDown);
        }
        let _dispatch_guard = self.context.acquire_dispatch_lock().await;
        if self.is_torn_down() {
            return Err(RegistrationFlowError::TornDown);
        }

        let span = info_span!("usecase.registration.dispatch", event = event.kind());
        async {
            let mut current = self.context.get_state().await;
            let mut pending_events = VecDeque::from([event]);

            while let Some(event) = pending_events.pop_front() {
                let from = current.phase;
                let event_name = event.kind();
                let (next, actions) =
                    RegistrationStateMachine::transition(current, event, &self.policy);
                if from != next.phase {
                    info!(from = ?from, to = ?next.phase, event = event_name, "registration state transition");
                }
                self.set_state_and_emit(next.clone()).await;
                current = next;

                let follow_up_events = self.execute_actions(actions).await;
                pending_events.extend(follow_up_events);

                if self.is_torn_down() {
                    debug!("registration flow torn down mid-dispatch");
                    break;
                }
            }

            Ok(RegistrationSnapshot::from(&current))
        }
        .instrument(span)
        .await
    }

    async fn set_state_and_emit(&self, state: RegistrationState) {
        let snapshot = RegistrationSnapshot::from(&state);
        self.context.set_state(state).await;
        self.observer.state_changed(snapshot).await;
    }

    async fn execute_actions(
        self: &Arc<Self>,
        actions: Vec<RegistrationAction>,
    ) -> Vec<RegistrationEvent> {
        let mut follow_up_events = Vec::new();
        for action in actions {
            if self.is_torn_down() {
                debug!(action = action.kind(), "registration flow torn down, action skipped");
                break;
            }
            debug!(action = action.kind(), "registration executing action");
            match action {
                RegistrationAction::ValidateInput { input } => {
                    match input.validate(self.policy.min_password_len) {
                        Ok(()) => follow_up_events.push(RegistrationEvent::InputAccepted { input }),
                        Err(error) => {
                            debug!(field = ?error.field(), %error, "registration input rejected");
                            follow_up_events.push(RegistrationEvent::InputRejected { error });
                        }
                    }
                }
                RegistrationAction::CreateAccount {
                    email,
                    password,
                    display_name,
                } => {
                    follow_up_events
                        .push(self.create_account(&email, &password, &display_name).await);
                }
                RegistrationAction::DiscardAccount => {
                    self.identity.sign_out().await;
                }
                RegistrationAction::WritePendingProfile { account_id, draft } => {
                    let record = draft.into_record(account_id.clone(), self.clock.now_utc());
                    if self
                        .write_profile(&account_id, ProfilePatch::from(record), false)
                        .await
                        .is_err()
                    {
                        follow_up_events.push(RegistrationEvent::ProfileWriteFailed);
                    }
                }
                RegistrationAction::SendVerification { session } => {
                    follow_up_events.push(self.send_verification(&session).await);
                }
                RegistrationAction::StartPolling => {
                    self.start_poller();
                    follow_up_events.push(RegistrationEvent::PollingStarted);
                }
                RegistrationAction::StopPolling => {
                    self.timers().poller.stop();
                }
                RegistrationAction::StartCooldown => {
                    self.start_cooldown();
                }
                RegistrationAction::StopCooldown => {
                    self.timers().cooldown.stop();
                }
                RegistrationAction::ReloadSession { session } => {
                    follow_up_events.push(self.check_verification(&session).await);
                }
                RegistrationAction::MarkProfileVerified { account_id } => {
                    if self
                        .write_profile(&account_id, ProfilePatch::verified(), true)
                        .await
                        .is_err()
                    {
                        follow_up_events.push(RegistrationEvent::ProfileWriteFailed);
                    }
                }
                RegistrationAction::NotifyVerified { account_id } => {
                    info!(account_id = %account_id, "registration verified");
                    self.observer.verified(&account_id).await;
                }
            }
        }

        follow_up_events
    }

    async fn create_account(
        &self,
        email: &str,
        password: &SecretString,
        display_name: &str,
    ) -> RegistrationEvent {
        match self.identity.create_account(email, password).await {
            Ok(mut session) => {
                match self.identity.set_display_name(&session, display_name).await {
                    Ok(()) => session.display_name = Some(display_name.to_string()),
                    Err(err) => {
                        warn!(account_id = %session.id, error = %err, "failed to set display name");
                    }
                }
                info!(account_id = %session.id, "account created");
                RegistrationEvent::AccountCreated { session }
            }
            Err(err) => {
                warn!(error = %err, "account creation failed");
                RegistrationEvent::AccountCreationFailed {
                    error: (&err).into(),
                }
            }
        }
    }

    async fn send_verification(&self, session: &AccountSession) -> RegistrationEvent {
        match self.identity.send_verification_email(session).await {
            Ok(()) => {
                info!(account_id = %session.id, "verification email sent");
                RegistrationEvent::VerificationSent
            }
            Err(err) => {
                warn!(account_id = %session.id, error = %err, "verification email failed");
                RegistrationEvent::VerificationSendFailed {
                    error: (&err).into(),
                }
            }
        }
    }

    async fn check_verification(&self, session: &AccountSession) -> RegistrationEvent {
        match self.identity.reload(session).await {
            Ok(refreshed) if refreshed.email_verified => {
                RegistrationEvent::VerificationObserved { session: refreshed }
            }
            Ok(_) => RegistrationEvent::VerificationPending,
            Err(err) => {
                debug!(account_id = %session.id, error = %err, "verification poll failed");
                RegistrationEvent::PollFailed
            }
        }
    }

    async fn write_profile(
        &self,
        account_id: &AccountId,
        patch: ProfilePatch,
        merge: bool,
    ) -> Result<(), ProfileStoreError> {
        let attempts = self.policy.profile_write_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.profiles.upsert(account_id, patch.clone(), merge).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt < attempts => {
                    warn!(account_id = %account_id, attempt, merge, error = %err, "profile write failed, retrying");
                }
                Err(err) => {
                    error!(account_id = %account_id, attempt, merge, error = %err, "profile write failed");
                    return Err(err);
                }
            }
        }
    }

    fn start_poller(self: &Arc<Self>) -> bool {
        let period = self.policy.poll_interval;
        let on_tick = Self::tick_handler(Arc::downgrade(self), || RegistrationEvent::PollTick);
        let mut timers = self.timers();
        if self.is_torn_down() {
            return false;
        }
        timers.poller.start(period, on_tick)
    }

    fn start_cooldown(self: &Arc<Self>) -> bool {
        let period = self.policy.cooldown_tick;
        let on_tick = Self::tick_handler(Arc::downgrade(self), || RegistrationEvent::CooldownTick);
        let mut timers = self.timers();
        if self.is_torn_down() {
            return false;
        }
        timers.cooldown.start(period, on_tick)
    }

    /// Timer callback that dispatches `make_event()` while the flow is alive.
    fn tick_handler(
        weak: Weak<Self>,
        make_event: fn() -> RegistrationEvent,
    ) -> impl FnMut() -> TickFuture + Send + 'static {
        move || {
            let weak = weak.clone();
            Box::pin(async move {
                let Some(inner) = weak.upgrade() else {
                    return ControlFlow::Break(());
                };
                match inner.dispatch(make_event()).await {
                    Ok(_) => ControlFlow::Continue(()),
                    Err(RegistrationFlowError::TornDown) => ControlFlow::Break(()),
                }
            })
        }
    }
}
