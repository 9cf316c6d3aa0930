use std::collections::BTreeMap;

use serde::Serialize;

use crate::registration::{FormField, RegistrationPhase, RegistrationState};

/// Render-ready view of a registration flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSnapshot {
    pub phase: RegistrationPhase,
    pub field_errors: BTreeMap<FormField, String>,
    pub form_error: Option<String>,
    pub info_message: Option<String>,
    pub resend_cooldown_seconds: u32,
}

impl From<&RegistrationState> for RegistrationSnapshot {
    fn from(state: &RegistrationState) -> Self {
        let field_errors = state
            .field_error
            .iter()
            .map(|err| (err.field(), err.user_message()))
            .collect();
        Self {
            phase: state.phase,
            field_errors,
            form_error: state.form_error.as_ref().map(|err| err.user_message()),
            info_message: state.info_message.clone(),
            resend_cooldown_seconds: state.resend_cooldown_secs,
        }
    }
}
