//! Command handlers for the `propdesk` binary.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use pd_app::RegistrationFlow;
use pd_core::config::AppConfig;
use pd_core::ids::AccountId;
use pd_core::registration::{RegistrationInput, RegistrationPhase};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, info_span, warn, Instrument};

use crate::bootstrap::{wire_registration, Backend};
use crate::observer::ConsoleObserver;

/// Exit code for input the flow rejected (validation or account creation).
pub const EXIT_REJECTED: u8 = 2;
/// Exit code after Ctrl-C.
pub const EXIT_INTERRUPTED: u8 = 130;

pub struct RegisterRequest {
    pub input: RegistrationInput,
    pub backend: Backend,
    /// Print snapshots as JSON lines on stdout.
    pub print_snapshots: bool,
}

/// Run one registration flow until the email is verified.
///
/// While waiting, a line containing `r` on stdin requests another
/// verification email. Ctrl-C tears the flow down.
pub async fn run_register(config: &AppConfig, request: RegisterRequest) -> anyhow::Result<ExitCode> {
    let RegisterRequest {
        input,
        backend,
        print_snapshots,
    } = request;

    let (observer, mut verified_rx) = ConsoleObserver::new(print_snapshots);
    let flow = wire_registration(config, backend, Arc::new(observer))
        .context("Failed to wire registration flow")?;

    let span = info_span!("command.register", offline = matches!(backend, Backend::InMemory { .. }));
    drive_registration(&flow, input, &mut verified_rx)
        .instrument(span)
        .await
}

async fn drive_registration(
    flow: &RegistrationFlow,
    input: RegistrationInput,
    verified_rx: &mut watch::Receiver<Option<AccountId>>,
) -> anyhow::Result<ExitCode> {
    let snapshot = flow.submit(input).await?;
    if !snapshot.phase.is_pending() && snapshot.phase != RegistrationPhase::Completed {
        for message in snapshot.field_errors.values() {
            eprintln!("{message}");
        }
        if let Some(message) = &snapshot.form_error {
            eprintln!("{message}");
        }
        return Ok(ExitCode::from(EXIT_REJECTED));
    }

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    while verified_rx.borrow().is_none() {
        tokio::select! {
            changed = verified_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().eq_ignore_ascii_case("r") => {
                    let cooldown = flow.snapshot().await.resend_cooldown_seconds;
                    if cooldown > 0 {
                        info!(cooldown, "resend available when the cooldown ends");
                    } else {
                        flow.resend_verification().await?;
                    }
                }
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => stdin_open = false,
            },
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted, tearing down registration flow");
                flow.teardown();
                return Ok(ExitCode::from(EXIT_INTERRUPTED));
            }
        }
    }

    let account_id = verified_rx.borrow().clone();
    flow.teardown();
    match account_id {
        Some(account_id) => {
            info!(account_id = %account_id, "registration complete");
            Ok(ExitCode::SUCCESS)
        }
        None => Ok(ExitCode::FAILURE),
    }
}
