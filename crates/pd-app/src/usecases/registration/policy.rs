use std::time::Duration;

use pd_core::{AppConfig, RegistrationPolicy};

/// Resolve the registration policy from configuration facts.
///
/// Zero means "not configured" and falls back to the default. Profile writes
/// always get at least one retry, and the password minimum can only be raised.
pub fn policy_from_config(config: &AppConfig) -> RegistrationPolicy {
    let defaults = RegistrationPolicy::default();
    RegistrationPolicy {
        poll_interval: match config.poll_interval_secs {
            0 => defaults.poll_interval,
            secs => Duration::from_secs(secs),
        },
        cooldown_tick: defaults.cooldown_tick,
        resend_cooldown_secs: match config.resend_cooldown_secs {
            0 => defaults.resend_cooldown_secs,
            secs => secs,
        },
        max_poll_failures: match config.max_poll_failures {
            0 => defaults.max_poll_failures,
            n => n,
        },
        profile_write_attempts: config
            .profile_write_attempts
            .max(defaults.profile_write_attempts),
        min_password_len: config.min_password_len.max(defaults.min_password_len),
    }
}
