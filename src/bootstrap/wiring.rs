//! # Dependency wiring
//!
//! The only place that depends on `pd-infra` and `pd-app` together. It
//! assembles adapters behind the `pd-core` ports and hands them to the
//! registration flow. Assembly only: no business decisions.

use std::sync::Arc;

use pd_app::{policy_from_config, RegistrationDeps, RegistrationFlow};
use pd_core::config::AppConfig;
use pd_core::ports::{ClockPort, IdentityProviderPort, ProfileStorePort, RegistrationObserverPort};
use pd_infra::identity::{DEFAULT_IDENTITY_BASE_URL, DEFAULT_TOKEN_BASE_URL};
use pd_infra::profile::DEFAULT_PROFILE_BASE_URL;
use pd_infra::{
    FirestoreProfileStore, IdentityToolkitClient, InMemoryIdentityProvider, InMemoryProfileStore,
    SystemClock,
};
use tracing::info;

const DEFAULT_PROFILE_COLLECTION: &str = "users";

/// Result type for wiring operations
pub type WiringResult<T> = Result<T, WiringError>;

/// Errors during dependency wiring
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error("identity provider API key is not configured ([identity] api_key)")]
    MissingIdentityApiKey,

    #[error("profile store project is not configured ([profile_store] project_id)")]
    MissingProfileProject,

    #[error("Identity provider client initialization failed: {0}")]
    IdentityInit(String),

    #[error("Profile store client initialization failed: {0}")]
    ProfileStoreInit(String),
}

/// Which adapters back the ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Identity Toolkit and Firestore REST APIs.
    Remote,
    /// Process-local adapters; nothing leaves the machine.
    InMemory {
        /// Report the email as verified on this reload.
        auto_verify_after: Option<u32>,
    },
}

pub struct WiredAdapters {
    pub identity: Arc<dyn IdentityProviderPort>,
    pub profiles: Arc<dyn ProfileStorePort>,
    pub clock: Arc<dyn ClockPort>,
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

pub fn wire_adapters(config: &AppConfig, backend: Backend) -> WiringResult<WiredAdapters> {
    let identity: Arc<dyn IdentityProviderPort>;
    let profiles: Arc<dyn ProfileStorePort>;
    match backend {
        Backend::Remote => {
            if config.identity_api_key.is_empty() {
                return Err(WiringError::MissingIdentityApiKey);
            }
            if config.profile_project_id.is_empty() {
                return Err(WiringError::MissingProfileProject);
            }

            let client = Arc::new(
                IdentityToolkitClient::new(
                    config.identity_api_key.as_str(),
                    or_default(&config.identity_base_url, DEFAULT_IDENTITY_BASE_URL),
                )
                .map_err(|e| WiringError::IdentityInit(format!("{e:#}")))?
                .with_token_base_url(or_default(
                    &config.identity_token_base_url,
                    DEFAULT_TOKEN_BASE_URL,
                )),
            );
            let store = FirestoreProfileStore::new(
                or_default(&config.profile_base_url, DEFAULT_PROFILE_BASE_URL),
                config.profile_project_id.as_str(),
                or_default(&config.profile_collection, DEFAULT_PROFILE_COLLECTION),
            )
            .map_err(|e| WiringError::ProfileStoreInit(format!("{e:#}")))?
            .with_token_source(client.clone());

            info!(project = %config.profile_project_id, "wired remote identity and profile adapters");
            identity = client;
            profiles = Arc::new(store);
        }
        Backend::InMemory { auto_verify_after } => {
            let provider = match auto_verify_after {
                Some(reloads) => InMemoryIdentityProvider::with_auto_verify_after(reloads),
                None => InMemoryIdentityProvider::new(),
            };
            info!(?auto_verify_after, "wired in-memory identity and profile adapters");
            identity = Arc::new(provider);
            profiles = Arc::new(InMemoryProfileStore::new());
        }
    }

    Ok(WiredAdapters {
        identity,
        profiles,
        clock: Arc::new(SystemClock),
    })
}

/// Build a registration flow for one screen session.
pub fn wire_registration(
    config: &AppConfig,
    backend: Backend,
    observer: Arc<dyn RegistrationObserverPort>,
) -> WiringResult<RegistrationFlow> {
    let adapters = wire_adapters(config, backend)?;
    let deps = RegistrationDeps {
        identity: adapters.identity,
        profiles: adapters.profiles,
        clock: adapters.clock,
        observer,
    };
    Ok(RegistrationFlow::new(deps, policy_from_config(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_backend_requires_api_key_and_project() {
        let mut config = AppConfig::empty();
        assert!(matches!(
            wire_adapters(&config, Backend::Remote),
            Err(WiringError::MissingIdentityApiKey)
        ));

        config.identity_api_key = "key-123".into();
        assert!(matches!(
            wire_adapters(&config, Backend::Remote),
            Err(WiringError::MissingProfileProject)
        ));

        config.profile_project_id = "propdesk-dev".into();
        assert!(wire_adapters(&config, Backend::Remote).is_ok());
    }

    #[test]
    fn in_memory_backend_needs_no_configuration() {
        let wired = wire_adapters(
            &AppConfig::empty(),
            Backend::InMemory {
                auto_verify_after: Some(1),
            },
        );
        assert!(wired.is_ok());
    }

    #[test]
    fn blank_values_fall_back_to_public_endpoints() {
        assert_eq!(or_default("  ", DEFAULT_IDENTITY_BASE_URL), DEFAULT_IDENTITY_BASE_URL);
        assert_eq!(or_default("http://localhost:9099", "x"), "http://localhost:9099");
    }
}
