//! Firestore REST profile store.
//!
//! Profiles live at `projects/{project}/databases/(default)/documents/{collection}/{account_id}`.
//! A full write replaces the document; a merge write sends an
//! `updateMask.fieldPaths` entry per field so untouched fields survive.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use pd_core::ids::AccountId;
use pd_core::ports::{ProfileStoreError, ProfileStorePort};
use pd_core::registration::ProfilePatch;

use crate::identity::AccessTokenSource;

pub const DEFAULT_PROFILE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct FirestoreProfileStore {
    client: Client,
    base_url: String,
    project_id: String,
    collection: String,
    tokens: Option<Arc<dyn AccessTokenSource>>,
}

impl FirestoreProfileStore {
    pub fn new(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        collection: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build profile store HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            collection: collection.into(),
            tokens: None,
        })
    }

    /// Authenticate writes with the signed-in account's ID token.
    pub fn with_token_source(mut self, tokens: Arc<dyn AccessTokenSource>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    fn document_url(&self, id: &AccountId) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}/{}",
            self.base_url,
            self.project_id,
            self.collection,
            id.as_str()
        )
    }
}

#[async_trait]
impl ProfileStorePort for FirestoreProfileStore {
    async fn upsert(
        &self,
        id: &AccountId,
        patch: ProfilePatch,
        merge: bool,
    ) -> Result<(), ProfileStoreError> {
        let mut request = self
            .client
            .patch(self.document_url(id))
            .json(&json!({ "fields": document_fields(&patch) }));

        if merge {
            let mask: Vec<(&str, &str)> = patch
                .field_paths()
                .into_iter()
                .map(|path| ("updateMask.fieldPaths", path))
                .collect();
            request = request.query(&mask);
        }

        let token = self
            .tokens
            .as_ref()
            .and_then(|tokens| tokens.access_token(id));
        if let Some(token) = &token {
            request = request.bearer_auth(token.expose());
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() {
            debug!(account_id = %id, merge, "profile document written");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_status(status, &body))
    }
}

/// Firestore typed values for every field present in `patch`.
fn document_fields(patch: &ProfilePatch) -> Map<String, Value> {
    let mut fields = Map::new();
    if let Some(first_name) = &patch.first_name {
        fields.insert("firstName".into(), json!({ "stringValue": first_name }));
    }
    if let Some(last_name) = &patch.last_name {
        fields.insert("lastName".into(), json!({ "stringValue": last_name }));
    }
    if let Some(email) = &patch.email {
        fields.insert("email".into(), json!({ "stringValue": email }));
    }
    if let Some(verified) = patch.verified {
        fields.insert("verified".into(), json!({ "booleanValue": verified }));
    }
    if let Some(created_at) = patch.created_at {
        fields.insert(
            "createdAt".into(),
            json!({ "timestampValue": created_at.to_rfc3339() }),
        );
    }
    fields
}

fn map_transport_error(err: reqwest::Error) -> ProfileStoreError {
    let err = err.without_url();
    if err.is_timeout() || err.is_connect() || err.is_request() {
        ProfileStoreError::Network(err.to_string())
    } else {
        warn!(error = %err, "unexpected profile store transport error");
        ProfileStoreError::Unknown(err.to_string())
    }
}

fn map_status(status: StatusCode, body: &str) -> ProfileStoreError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value["error"]["status"].as_str().map(str::to_string))
        .unwrap_or_else(|| status.to_string());

    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        ProfileStoreError::Network(message)
    } else {
        ProfileStoreError::Unknown(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mockito::{Matcher, Server};
    use pd_core::registration::ProfileDraft;
    use pd_core::security::SecretString;

    const DOC_PATH: &str = "/projects/demo/databases/(default)/documents/users/uid-1";

    struct FixedToken;

    impl AccessTokenSource for FixedToken {
        fn access_token(&self, _account_id: &AccountId) -> Option<SecretString> {
            Some(SecretString::from("tok-1"))
        }
    }

    fn store_for(server: &Server) -> FirestoreProfileStore {
        FirestoreProfileStore::new(server.url(), "demo", "users").unwrap()
    }

    fn pending_patch() -> ProfilePatch {
        ProfilePatch::from(
            ProfileDraft {
                first_name: "Ann".into(),
                last_name: "Lee".into(),
                email: "a@b.com".into(),
            }
            .into_record(
                AccountId::from("uid-1"),
                Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            ),
        )
    }

    #[tokio::test]
    async fn full_write_sends_typed_fields_with_bearer_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", DOC_PATH)
            .match_header("authorization", "Bearer tok-1")
            .match_body(Matcher::Json(json!({
                "fields": {
                    "firstName": { "stringValue": "Ann" },
                    "lastName": { "stringValue": "Lee" },
                    "email": { "stringValue": "a@b.com" },
                    "verified": { "booleanValue": false },
                    "createdAt": { "timestampValue": "2023-11-14T22:13:20+00:00" }
                }
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        store_for(&server)
            .with_token_source(Arc::new(FixedToken))
            .upsert(&AccountId::from("uid-1"), pending_patch(), false)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn merge_write_masks_only_patched_fields() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", DOC_PATH)
            .match_query(Matcher::UrlEncoded(
                "updateMask.fieldPaths".into(),
                "verified".into(),
            ))
            .match_body(Matcher::Json(json!({
                "fields": { "verified": { "booleanValue": true } }
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        store_for(&server)
            .upsert(&AccountId::from("uid-1"), ProfilePatch::verified(), true)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_statuses_are_classified() {
        let mut server = Server::new_async().await;
        let _denied = server
            .mock("PATCH", DOC_PATH)
            .with_status(403)
            .with_body(
                json!({ "error": { "code": 403, "status": "PERMISSION_DENIED" } }).to_string(),
            )
            .create_async()
            .await;

        let err = store_for(&server)
            .upsert(&AccountId::from("uid-1"), ProfilePatch::verified(), true)
            .await
            .unwrap_err();
        assert_eq!(err, ProfileStoreError::Unknown("PERMISSION_DENIED".into()));

        let mut server = Server::new_async().await;
        let _unavailable = server
            .mock("PATCH", DOC_PATH)
            .with_status(503)
            .create_async()
            .await;
        let err = store_for(&server)
            .upsert(&AccountId::from("uid-1"), ProfilePatch::verified(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileStoreError::Network(_)));
    }
}
