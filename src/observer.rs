//! Console observer for command-line registration runs.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use pd_core::ids::AccountId;
use pd_core::ports::RegistrationObserverPort;
use pd_core::registration::RegistrationSnapshot;
use tokio::sync::watch;
use tracing::{debug, info};

/// Prints snapshots as JSON lines and publishes the verified account id.
///
/// Countdown-only changes are logged at debug level instead of printed.
pub struct ConsoleObserver {
    verified_tx: watch::Sender<Option<AccountId>>,
    last_printed: Mutex<Option<RegistrationSnapshot>>,
    print: bool,
}

impl ConsoleObserver {
    pub fn new(print: bool) -> (Self, watch::Receiver<Option<AccountId>>) {
        let (verified_tx, verified_rx) = watch::channel(None);
        (
            Self {
                verified_tx,
                last_printed: Mutex::new(None),
                print,
            },
            verified_rx,
        )
    }

    /// Returns true when `snapshot` differs from the last printed one in more
    /// than the cooldown countdown.
    fn should_print(&self, snapshot: &RegistrationSnapshot) -> bool {
        let mut last = self
            .last_printed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let changed = match last.as_ref() {
            Some(previous) => {
                previous.phase != snapshot.phase
                    || previous.field_errors != snapshot.field_errors
                    || previous.form_error != snapshot.form_error
                    || previous.info_message != snapshot.info_message
            }
            None => true,
        };
        if changed {
            *last = Some(snapshot.clone());
        }
        changed
    }
}

#[async_trait]
impl RegistrationObserverPort for ConsoleObserver {
    async fn state_changed(&self, snapshot: RegistrationSnapshot) {
        if !self.should_print(&snapshot) {
            debug!(
                cooldown = snapshot.resend_cooldown_seconds,
                "resend cooldown"
            );
            return;
        }

        info!(
            phase = ?snapshot.phase,
            form_error = snapshot.form_error.as_deref().unwrap_or(""),
            "registration snapshot"
        );
        if self.print {
            match serde_json::to_string(&snapshot) {
                Ok(line) => println!("{line}"),
                Err(err) => debug!(error = %err, "failed to render snapshot"),
            }
        }
    }

    async fn verified(&self, account_id: &AccountId) {
        self.verified_tx.send_replace(Some(account_id.clone()));
    }
}
