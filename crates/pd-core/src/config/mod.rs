//! # Configuration DTO
//!
//! Pure data: TOML → [`AppConfig`] mapping only.
//!
//! No validation and no default values live here. A missing key maps to an
//! empty string or zero, and that is a fact, not an error. Resolving zero
//! values into working defaults is the job of the policy layer in `pd-app`.

use std::path::PathBuf;

/// Application configuration DTO (pure data, no logic)
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Identity provider web API key.
    pub identity_api_key: String,

    /// Identity provider base URL (empty means "use the public endpoint").
    pub identity_base_url: String,

    /// Secure token (ID token refresh) base URL (empty means "use the public endpoint").
    pub identity_token_base_url: String,

    /// Document store project id.
    pub profile_project_id: String,

    /// Document store base URL (empty means "use the public endpoint").
    pub profile_base_url: String,

    /// Collection holding profile records.
    pub profile_collection: String,

    /// Seconds between verification polls.
    pub poll_interval_secs: u64,

    /// Seconds a user must wait between verification email resends.
    pub resend_cooldown_secs: u32,

    /// Consecutive poll failures tolerated before the user is told.
    pub max_poll_failures: u32,

    /// Attempts per profile write, including the first one.
    pub profile_write_attempts: u32,

    /// Minimum password length in characters.
    pub min_password_len: usize,

    /// Directory for the rolling log file (may be empty).
    pub log_dir: PathBuf,
}

impl AppConfig {
    /// Create AppConfig from a TOML value.
    ///
    /// Must NOT contain validation or default value logic.
    pub fn from_toml(toml_value: &toml::Value) -> anyhow::Result<Self> {
        let str_at = |section: &str, key: &str| -> String {
            toml_value
                .get(section)
                .and_then(|s| s.get(key))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };
        let int_at = |section: &str, key: &str| -> i64 {
            toml_value
                .get(section)
                .and_then(|s| s.get(key))
                .and_then(|v| v.as_integer())
                .unwrap_or(0)
                .max(0)
        };
        // Out-of-range values saturate rather than wrap.
        let u32_at = |section: &str, key: &str| -> u32 {
            u32::try_from(int_at(section, key)).unwrap_or(u32::MAX)
        };

        Ok(Self {
            identity_api_key: str_at("identity", "api_key"),
            identity_base_url: str_at("identity", "base_url"),
            identity_token_base_url: str_at("identity", "token_base_url"),
            profile_project_id: str_at("profile_store", "project_id"),
            profile_base_url: str_at("profile_store", "base_url"),
            profile_collection: str_at("profile_store", "collection"),
            poll_interval_secs: u64::try_from(int_at("registration", "poll_interval_secs"))
                .unwrap_or(u64::MAX),
            resend_cooldown_secs: u32_at("registration", "resend_cooldown_secs"),
            max_poll_failures: u32_at("registration", "max_poll_failures"),
            profile_write_attempts: u32_at("registration", "profile_write_attempts"),
            min_password_len: usize::try_from(int_at("registration", "min_password_len"))
                .unwrap_or(usize::MAX),
            log_dir: PathBuf::from(str_at("logging", "dir")),
        })
    }

    /// Create empty AppConfig (all empty/zero values).
    pub fn empty() -> Self {
        Self {
            identity_api_key: String::new(),
            identity_base_url: String::new(),
            identity_token_base_url: String::new(),
            profile_project_id: String::new(),
            profile_base_url: String::new(),
            profile_collection: String::new(),
            poll_interval_secs: 0,
            resend_cooldown_secs: 0,
            max_poll_failures: 0,
            profile_write_attempts: 0,
            min_password_len: 0,
            log_dir: PathBuf::new(),
        }
    }

    /// Create AppConfig with system-default paths.
    ///
    /// `data_dir` is computed by the caller (e.g. with the `dirs` crate).
    pub fn with_system_defaults(data_dir: PathBuf) -> Self {
        Self {
            log_dir: data_dir.join("logs"),
            ..Self::empty()
        }
    }
}
