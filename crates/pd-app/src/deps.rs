//! # Registration dependencies
//!
//! Parameter grouping for [`crate::RegistrationFlow`] construction.
//! Not a builder: no build steps, no defaults, every port is required.

use std::sync::Arc;

use pd_core::ports::{ClockPort, IdentityProviderPort, ProfileStorePort, RegistrationObserverPort};

pub struct RegistrationDeps {
    pub identity: Arc<dyn IdentityProviderPort>,
    pub profiles: Arc<dyn ProfileStorePort>,
    pub clock: Arc<dyn ClockPort>,
    pub observer: Arc<dyn RegistrationObserverPort>,
}
