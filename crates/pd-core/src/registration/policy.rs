use std::time::Duration;

/// Timing and limit knobs for one registration flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationPolicy {
    /// Delay between verification polls.
    pub poll_interval: Duration,
    /// Period of the resend cooldown ticker. One tick removes one second.
    pub cooldown_tick: Duration,
    pub resend_cooldown_secs: u32,
    /// Consecutive poll failures before a recoverable error is surfaced.
    pub max_poll_failures: u32,
    /// Attempts per profile write, including the first one.
    pub profile_write_attempts: u32,
    pub min_password_len: usize,
}

impl RegistrationPolicy {
    pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 4;
    pub const DEFAULT_RESEND_COOLDOWN_SECS: u32 = 60;
    pub const DEFAULT_MAX_POLL_FAILURES: u32 = 5;
    pub const DEFAULT_PROFILE_WRITE_ATTEMPTS: u32 = 2;
    pub const DEFAULT_MIN_PASSWORD_LEN: usize = 8;
}

impl Default for RegistrationPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(Self::DEFAULT_POLL_INTERVAL_SECS),
            cooldown_tick: Duration::from_secs(1),
            resend_cooldown_secs: Self::DEFAULT_RESEND_COOLDOWN_SECS,
            max_poll_failures: Self::DEFAULT_MAX_POLL_FAILURES,
            profile_write_attempts: Self::DEFAULT_PROFILE_WRITE_ATTEMPTS,
            min_password_len: Self::DEFAULT_MIN_PASSWORD_LEN,
        }
    }
}
