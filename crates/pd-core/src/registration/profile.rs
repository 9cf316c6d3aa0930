use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::AccountId;

/// Profile fields captured from the form before the account id is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl ProfileDraft {
    pub fn into_record(self, id: AccountId, created_at: DateTime<Utc>) -> ProfileRecord {
        ProfileRecord {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            verified: false,
            created_at,
        }
    }
}

/// Profile document keyed by account id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub id: AccountId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Partial profile record. `None` fields are left untouched by a merge write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ProfilePatch {
    /// Patch that only flips the verified flag.
    pub fn verified() -> Self {
        Self {
            verified: Some(true),
            ..Self::default()
        }
    }

    /// Stored field names present in this patch, in document order.
    pub fn field_paths(&self) -> Vec<&'static str> {
        let mut paths = Vec::new();
        if self.first_name.is_some() {
            paths.push("firstName");
        }
        if self.last_name.is_some() {
            paths.push("lastName");
        }
        if self.email.is_some() {
            paths.push("email");
        }
        if self.verified.is_some() {
            paths.push("verified");
        }
        if self.created_at.is_some() {
            paths.push("createdAt");
        }
        paths
    }

    /// Overlay `patch` on this document; fields absent from `patch` are kept.
    pub fn merge(&mut self, patch: ProfilePatch) {
        if patch.first_name.is_some() {
            self.first_name = patch.first_name;
        }
        if patch.last_name.is_some() {
            self.last_name = patch.last_name;
        }
        if patch.email.is_some() {
            self.email = patch.email;
        }
        if patch.verified.is_some() {
            self.verified = patch.verified;
        }
        if patch.created_at.is_some() {
            self.created_at = patch.created_at;
        }
    }

    /// Full record from this patch, if every field is present.
    pub fn to_record(&self, id: AccountId) -> Option<ProfileRecord> {
        Some(ProfileRecord {
            id,
            first_name: self.first_name.clone()?,
            last_name: self.last_name.clone()?,
            email: self.email.clone()?,
            verified: self.verified?,
            created_at: self.created_at?,
        })
    }
}

impl From<ProfileRecord> for ProfilePatch {
    fn from(record: ProfileRecord) -> Self {
        Self {
            first_name: Some(record.first_name),
            last_name: Some(record.last_name),
            email: Some(record.email),
            verified: Some(record.verified),
            created_at: Some(record.created_at),
        }
    }
}
