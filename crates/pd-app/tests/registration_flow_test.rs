//! End-to-end registration flow tests against the in-memory adapters.
//!
//! Time is paused, so timer ticks fire deterministically as the test sleeps.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use pd_app::{RegistrationDeps, RegistrationFlow, RegistrationFlowError};
use pd_core::ids::AccountId;
use pd_core::ports::{
    IdentityProviderPort, ProfileStoreError, ProfileStorePort, RegistrationObserverPort,
};
use pd_core::registration::{
    ProfilePatch, RegistrationError, RegistrationInput, RegistrationPhase, RegistrationPolicy,
    RegistrationSnapshot, VERIFICATION_SENT_MESSAGE, VERIFIED_MESSAGE,
};
use pd_core::security::SecretString;
use pd_infra::{InMemoryIdentityProvider, InMemoryProfileStore, SystemClock};

#[derive(Default)]
struct RecordingObserver {
    snapshots: Mutex<Vec<RegistrationSnapshot>>,
    verified: Mutex<Vec<AccountId>>,
    verified_calls: AtomicUsize,
}

impl RecordingObserver {
    fn verified_calls(&self) -> usize {
        self.verified_calls.load(Ordering::SeqCst)
    }

    fn phases(&self) -> Vec<RegistrationPhase> {
        let mut phases: Vec<RegistrationPhase> = Vec::new();
        for snapshot in self.snapshots.lock().unwrap().iter() {
            if phases.last() != Some(&snapshot.phase) {
                phases.push(snapshot.phase);
            }
        }
        phases
    }
}

#[async_trait]
impl RegistrationObserverPort for RecordingObserver {
    async fn state_changed(&self, snapshot: RegistrationSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot);
    }

    async fn verified(&self, account_id: &AccountId) {
        self.verified_calls.fetch_add(1, Ordering::SeqCst);
        self.verified.lock().unwrap().push(account_id.clone());
    }
}

/// Profile store whose writes take `delay` before succeeding.
struct SlowProfileStore {
    delay: Duration,
    writes: AtomicUsize,
}

#[async_trait]
impl ProfileStorePort for SlowProfileStore {
    async fn upsert(
        &self,
        _id: &AccountId,
        _patch: ProfilePatch,
        _merge: bool,
    ) -> Result<(), ProfileStoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        sleep(self.delay).await;
        Ok(())
    }
}

struct Harness {
    flow: RegistrationFlow,
    identity: Arc<InMemoryIdentityProvider>,
    profiles: Arc<InMemoryProfileStore>,
    observer: Arc<RecordingObserver>,
}

fn harness(identity: InMemoryIdentityProvider) -> Harness {
    let identity = Arc::new(identity);
    let profiles = Arc::new(InMemoryProfileStore::new());
    let observer = Arc::new(RecordingObserver::default());
    let flow = RegistrationFlow::new(
        RegistrationDeps {
            identity: identity.clone(),
            profiles: profiles.clone(),
            clock: Arc::new(SystemClock),
            observer: observer.clone(),
        },
        RegistrationPolicy::default(),
    );
    Harness {
        flow,
        identity,
        profiles,
        observer,
    }
}

fn ann_lee() -> RegistrationInput {
    RegistrationInput::new("Ann", "Lee", "a@b.com", "12345678", "12345678")
}

#[tokio::test(start_paused = true)]
async fn ann_lee_registers_and_is_notified_once_after_verification() {
    let h = harness(InMemoryIdentityProvider::with_auto_verify_after(2));

    let snapshot = h.flow.submit(ann_lee()).await.unwrap();
    assert_eq!(snapshot.phase, RegistrationPhase::Polling);
    assert_eq!(snapshot.info_message.as_deref(), Some(VERIFICATION_SENT_MESSAGE));
    assert_eq!(snapshot.resend_cooldown_seconds, 60);
    assert_eq!(h.identity.send_calls(), 1);
    assert!(h.flow.is_polling());

    let state = h.flow.state().await;
    let account_id = state.session.expect("session after creation").id;
    let pending = h.profiles.get(&account_id).expect("pending profile");
    assert!(!pending.verified);
    assert_eq!(pending.first_name, "Ann");
    assert_eq!(
        h.identity.account(&account_id).unwrap().display_name.as_deref(),
        Some("Ann Lee")
    );

    sleep(Duration::from_millis(4_100)).await;
    assert_eq!(h.identity.reload_calls(), 1);
    assert_eq!(h.flow.snapshot().await.phase, RegistrationPhase::Polling);

    sleep(Duration::from_secs(4)).await;
    let snapshot = h.flow.snapshot().await;
    assert_eq!(snapshot.phase, RegistrationPhase::Completed);
    assert_eq!(snapshot.info_message.as_deref(), Some(VERIFIED_MESSAGE));
    assert_eq!(snapshot.resend_cooldown_seconds, 0);
    assert!(h.profiles.get(&account_id).unwrap().verified);
    assert_eq!(h.observer.verified_calls(), 1);
    assert_eq!(*h.observer.verified.lock().unwrap(), vec![account_id]);

    sleep(Duration::from_secs(20)).await;
    assert_eq!(h.identity.reload_calls(), 2);
    assert_eq!(h.observer.verified_calls(), 1);
    assert!(!h.flow.is_polling());
    assert!(!h.flow.cooldown_active());
    assert_eq!(
        h.observer.phases(),
        vec![
            RegistrationPhase::Validating,
            RegistrationPhase::Submitting,
            RegistrationPhase::AwaitingVerification,
            RegistrationPhase::Polling,
            RegistrationPhase::Completed,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn cooldown_counts_down_once_per_second_and_gates_resend() {
    let h = harness(InMemoryIdentityProvider::new());
    h.flow.submit(ann_lee()).await.unwrap();

    sleep(Duration::from_millis(10_100)).await;
    assert_eq!(h.flow.snapshot().await.resend_cooldown_seconds, 50);

    let snapshot = h.flow.resend_verification().await.unwrap();
    assert_eq!(snapshot.resend_cooldown_seconds, 50);
    assert_eq!(h.identity.send_calls(), 1);

    sleep(Duration::from_secs(55)).await;
    assert_eq!(h.flow.snapshot().await.resend_cooldown_seconds, 0);
    assert!(!h.flow.cooldown_active());

    let cooldowns: Vec<u32> = h
        .observer
        .snapshots
        .lock()
        .unwrap()
        .iter()
        .map(|s| s.resend_cooldown_seconds)
        .collect();
    assert!(cooldowns.windows(2).all(|w| w[1] <= w[0] || w[0] == 0));

    let snapshot = h.flow.resend_verification().await.unwrap();
    assert_eq!(h.identity.send_calls(), 2);
    assert_eq!(snapshot.resend_cooldown_seconds, 60);
    assert!(h.flow.cooldown_active());
    assert!(h.flow.is_polling());
}

#[tokio::test(start_paused = true)]
async fn teardown_while_awaiting_verification_stops_all_provider_calls() {
    let h = harness(InMemoryIdentityProvider::new());
    h.flow.submit(ann_lee()).await.unwrap();

    sleep(Duration::from_millis(8_100)).await;
    assert_eq!(h.identity.reload_calls(), 2);

    h.flow.teardown();
    assert!(!h.flow.is_polling());
    assert!(!h.flow.cooldown_active());

    let before = h.flow.snapshot().await;
    sleep(Duration::from_secs(120)).await;
    assert_eq!(h.identity.reload_calls(), 2);
    assert_eq!(h.identity.send_calls(), 1);
    assert_eq!(h.flow.snapshot().await, before);
    assert!(matches!(
        h.flow.resend_verification().await,
        Err(RegistrationFlowError::TornDown)
    ));
    assert_eq!(h.observer.verified_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_flow_releases_its_timers() {
    let h = harness(InMemoryIdentityProvider::new());
    h.flow.submit(ann_lee()).await.unwrap();

    let Harness {
        flow,
        identity,
        observer,
        ..
    } = h;
    drop(flow);

    let snapshots = observer.snapshots.lock().unwrap().len();
    sleep(Duration::from_secs(30)).await;
    assert_eq!(identity.reload_calls(), 0);
    assert_eq!(observer.snapshots.lock().unwrap().len(), snapshots);
}

#[tokio::test(start_paused = true)]
async fn verified_profile_write_failure_still_completes() {
    let h = harness(InMemoryIdentityProvider::with_auto_verify_after(1));
    h.flow.submit(ann_lee()).await.unwrap();
    h.profiles.fail_next_writes(2);

    sleep(Duration::from_millis(4_100)).await;

    let snapshot = h.flow.snapshot().await;
    assert_eq!(snapshot.phase, RegistrationPhase::Completed);
    assert!(snapshot.form_error.is_some());
    assert_eq!(h.observer.verified_calls(), 1);
    assert_eq!(h.profiles.write_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn failed_initial_send_keeps_polling_and_allows_resend() {
    let identity = InMemoryIdentityProvider::with_auto_verify_after(3);
    identity.fail_next_sends(1);
    let h = harness(identity);

    let snapshot = h.flow.submit(ann_lee()).await.unwrap();
    assert_eq!(snapshot.phase, RegistrationPhase::Polling);
    assert!(snapshot.form_error.is_some());
    assert_eq!(snapshot.resend_cooldown_seconds, 0);

    let snapshot = h.flow.resend_verification().await.unwrap();
    assert_eq!(snapshot.form_error, None);
    assert_eq!(h.identity.send_calls(), 2);

    sleep(Duration::from_millis(12_100)).await;
    assert_eq!(h.flow.snapshot().await.phase, RegistrationPhase::Completed);
}

#[tokio::test]
async fn duplicate_email_returns_to_idle_with_message() {
    let identity = InMemoryIdentityProvider::new();
    identity
        .create_account("a@b.com", &SecretString::from("existing-pass"))
        .await
        .unwrap();
    let h = harness(identity);

    let snapshot = h.flow.submit(ann_lee()).await.unwrap();
    assert_eq!(snapshot.phase, RegistrationPhase::Idle);
    assert_eq!(
        snapshot.form_error.as_deref(),
        Some("An account with this email already exists.")
    );
    assert_eq!(h.identity.sign_out_calls(), 1);
    assert_eq!(h.identity.send_calls(), 0);
    assert!(!h.flow.is_polling());
}

#[tokio::test(start_paused = true)]
async fn teardown_during_in_flight_profile_write_skips_remaining_actions() {
    let identity = Arc::new(InMemoryIdentityProvider::with_auto_verify_after(1));
    let profiles = Arc::new(SlowProfileStore {
        delay: Duration::from_secs(2),
        writes: AtomicUsize::new(0),
    });
    let flow = Arc::new(RegistrationFlow::new(
        RegistrationDeps {
            identity: identity.clone(),
            profiles: profiles.clone(),
            clock: Arc::new(SystemClock),
            observer: Arc::new(RecordingObserver::default()),
        },
        RegistrationPolicy::default(),
    ));

    let submit = tokio::spawn({
        let flow = flow.clone();
        async move { flow.submit(ann_lee()).await }
    });

    sleep(Duration::from_millis(500)).await;
    assert_eq!(profiles.writes.load(Ordering::SeqCst), 1);
    flow.teardown();

    submit.await.unwrap().unwrap();
    assert_eq!(identity.send_calls(), 0);
    assert!(!flow.is_polling());
    assert!(!flow.cooldown_active());

    sleep(Duration::from_secs(30)).await;
    assert_eq!(identity.reload_calls(), 0);
    assert_eq!(identity.send_calls(), 0);
    assert_eq!(profiles.writes.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn verified_merge_lands_even_when_pending_write_never_did() {
    let h = harness(InMemoryIdentityProvider::with_auto_verify_after(1));
    h.profiles.fail_next_writes(2);

    let snapshot = h.flow.submit(ann_lee()).await.unwrap();
    let profile_write = RegistrationError::ProfileWrite.user_message();
    assert_eq!(snapshot.phase, RegistrationPhase::Polling);
    assert_eq!(snapshot.form_error.as_deref(), Some(profile_write.as_str()));
    assert_eq!(snapshot.info_message.as_deref(), Some(VERIFICATION_SENT_MESSAGE));

    sleep(Duration::from_millis(4_100)).await;

    let snapshot = h.flow.snapshot().await;
    assert_eq!(snapshot.phase, RegistrationPhase::Completed);
    assert_eq!(snapshot.form_error, None);
    assert_eq!(h.observer.verified_calls(), 1);
    assert_eq!(h.profiles.write_calls(), 3);

    let account_id = h.flow.state().await.session.expect("session").id;
    assert_eq!(
        h.profiles.document(&account_id),
        Some(ProfilePatch::verified())
    );
}
