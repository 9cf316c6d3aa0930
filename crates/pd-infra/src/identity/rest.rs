//! Identity Toolkit REST adapter.
//!
//! Talks to the `accounts:*` endpoints with an API key. ID and refresh tokens
//! returned by sign-up are cached per account and never leave this adapter
//! except through [`AccessTokenSource`]. An expired ID token is exchanged once
//! through the secure token endpoint and the call is retried.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use pd_core::ids::AccountId;
use pd_core::ports::{IdentityError, IdentityProviderPort};
use pd_core::registration::AccountSession;
use pd_core::security::SecretString;

pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_TOKEN_BASE_URL: &str = "https://securetoken.googleapis.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const VERIFY_EMAIL: &str = "VERIFY_EMAIL";

/// Bearer credentials for adapters acting on behalf of a signed-in account.
pub trait AccessTokenSource: Send + Sync {
    fn access_token(&self, account_id: &AccountId) -> Option<SecretString>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
    id_token: String,
    refresh_token: Option<String>,
    email: Option<String>,
}

/// Secure token endpoint response; its fields are snake_case.
#[derive(Deserialize)]
struct RefreshTokenResponse {
    id_token: String,
    refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendOobCodeRequest<'a> {
    request_type: &'static str,
    id_token: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

struct Credentials {
    id_token: SecretString,
    refresh_token: Option<SecretString>,
}

pub struct IdentityToolkitClient {
    client: Client,
    base_url: String,
    token_base_url: String,
    api_key: SecretString,
    credentials: Mutex<HashMap<AccountId, Credentials>>,
}

impl IdentityToolkitClient {
    pub fn new(api_key: impl Into<SecretString>, base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build identity provider HTTP client")?;
        Ok(Self::with_client(client, api_key, base_url))
    }

    pub fn with_client(
        client: Client,
        api_key: impl Into<SecretString>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token_base_url: DEFAULT_TOKEN_BASE_URL.to_string(),
            api_key: api_key.into(),
            credentials: Mutex::new(HashMap::new()),
        }
    }

    /// Override the secure token endpoint (emulators, tests).
    pub fn with_token_base_url(mut self, token_base_url: impl Into<String>) -> Self {
        self.token_base_url = token_base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn credentials(&self) -> MutexGuard<'_, HashMap<AccountId, Credentials>> {
        self.credentials.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn id_token(&self, account_id: &AccountId) -> Result<SecretString, IdentityError> {
        self.credentials()
            .get(account_id)
            .map(|credentials| SecretString::from(credentials.id_token.expose()))
            .ok_or_else(|| IdentityError::Unknown("no credential for account".to_string()))
    }

    /// Run `op` with the account's ID token, refreshing it once if the
    /// provider reports it expired.
    async fn with_id_token<T, F, Fut>(&self, account_id: &AccountId, op: F) -> Result<T, IdentityError>
    where
        F: Fn(SecretString) -> Fut,
        Fut: Future<Output = Result<T, IdentityError>>,
    {
        match op(self.id_token(account_id)?).await {
            Err(err) if is_expired_credential(&err) => {
                debug!(account_id = %account_id, "id token expired, refreshing");
                let id_token = self.refresh_id_token(account_id).await?;
                op(id_token).await
            }
            result => result,
        }
    }

    async fn refresh_id_token(&self, account_id: &AccountId) -> Result<SecretString, IdentityError> {
        let refresh_token = self
            .credentials()
            .get(account_id)
            .and_then(|credentials| credentials.refresh_token.as_ref())
            .map(|token| SecretString::from(token.expose()))
            .ok_or_else(|| IdentityError::Unknown("no refresh token for account".to_string()))?;

        let request = self
            .client
            .post(format!("{}/token", self.token_base_url))
            .query(&[("key", self.api_key.expose())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.expose()),
            ]);
        let response: RefreshTokenResponse = self.execute("token", request).await?;

        let id_token = SecretString::from(response.id_token.as_str());
        self.credentials().insert(
            account_id.clone(),
            Credentials {
                id_token: SecretString::new(response.id_token),
                refresh_token: Some(SecretString::new(response.refresh_token)),
            },
        );
        Ok(id_token)
    }

    async fn call<Req, Resp>(&self, method: &str, body: &Req) -> Result<Resp, IdentityError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let request = self
            .client
            .post(format!("{}/accounts:{}", self.base_url, method))
            .query(&[("key", self.api_key.expose())])
            .json(body);
        self.execute(method, request).await
    }

    async fn execute<Resp>(&self, method: &str, request: RequestBuilder) -> Result<Resp, IdentityError>
    where
        Resp: DeserializeOwned,
    {
        let response = request.send().await.map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<Resp>()
                .await
                .map_err(|e| {
                    IdentityError::Unknown(format!("invalid {method} response: {}", e.without_url()))
                });
        }

        let body = response.text().await.unwrap_or_default();
        let err = map_error_response(status, &body);
        debug!(method, status = status.as_u16(), error = %err, "identity provider request rejected");
        Err(err)
    }
}

#[async_trait]
impl IdentityProviderPort for IdentityToolkitClient {
    async fn create_account(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AccountSession, IdentityError> {
        let request = SignUpRequest {
            email,
            password: password.expose(),
            return_secure_token: true,
        };
        let response: SignUpResponse = self.call("signUp", &request).await?;

        let session = AccountSession::new(
            response.local_id,
            response.email.unwrap_or_else(|| email.to_string()),
        );
        self.credentials().insert(
            session.id.clone(),
            Credentials {
                id_token: SecretString::new(response.id_token),
                refresh_token: response.refresh_token.map(SecretString::new),
            },
        );
        Ok(session)
    }

    async fn set_display_name(
        &self,
        session: &AccountSession,
        display_name: &str,
    ) -> Result<(), IdentityError> {
        let _: IgnoredAny = self
            .with_id_token(&session.id, |id_token| async move {
                let request = UpdateProfileRequest {
                    id_token: id_token.expose(),
                    display_name,
                    return_secure_token: false,
                };
                self.call("update", &request).await
            })
            .await?;
        Ok(())
    }

    async fn send_verification_email(&self, session: &AccountSession) -> Result<(), IdentityError> {
        let _: IgnoredAny = self
            .with_id_token(&session.id, |id_token| async move {
                let request = SendOobCodeRequest {
                    request_type: VERIFY_EMAIL,
                    id_token: id_token.expose(),
                };
                self.call("sendOobCode", &request).await
            })
            .await?;
        Ok(())
    }

    async fn reload(&self, session: &AccountSession) -> Result<AccountSession, IdentityError> {
        let response: LookupResponse = self
            .with_id_token(&session.id, |id_token| async move {
                let request = LookupRequest {
                    id_token: id_token.expose(),
                };
                self.call("lookup", &request).await
            })
            .await?;

        let user = response
            .users
            .into_iter()
            .find(|user| user.local_id == session.id.as_str())
            .ok_or_else(|| IdentityError::Unknown("account not found".to_string()))?;

        Ok(AccountSession {
            id: session.id.clone(),
            email: user.email.unwrap_or_else(|| session.email.clone()),
            email_verified: user.email_verified,
            display_name: user.display_name.or_else(|| session.display_name.clone()),
        })
    }

    async fn sign_out(&self) {
        let dropped = {
            let mut credentials = self.credentials();
            let count = credentials.len();
            credentials.clear();
            count
        };
        debug!(dropped, "identity credentials cleared");
    }
}

impl AccessTokenSource for IdentityToolkitClient {
    fn access_token(&self, account_id: &AccountId) -> Option<SecretString> {
        self.id_token(account_id).ok()
    }
}

fn map_transport_error(err: reqwest::Error) -> IdentityError {
    let err = err.without_url();
    if err.is_timeout() || err.is_connect() || err.is_request() {
        IdentityError::Network(err.to_string())
    } else {
        warn!(error = %err, "unexpected identity provider transport error");
        IdentityError::Unknown(err.to_string())
    }
}

fn map_error_response(status: StatusCode, body: &str) -> IdentityError {
    let code = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message);

    if let Some(err) = code.as_deref().and_then(map_error_code) {
        return err;
    }
    if is_transient(status) {
        return IdentityError::Network(format!("identity provider returned {status}"));
    }
    IdentityError::Unknown(code.unwrap_or_else(|| status.to_string()))
}

/// Provider messages look like `EMAIL_EXISTS` or `WEAK_PASSWORD : Password should be ...`.
fn error_code(message: &str) -> &str {
    message
        .split(|c: char| c == ' ' || c == ':')
        .next()
        .unwrap_or(message)
}

fn map_error_code(message: &str) -> Option<IdentityError> {
    match error_code(message) {
        "EMAIL_EXISTS" => Some(IdentityError::EmailInUse),
        "INVALID_EMAIL" | "MISSING_EMAIL" => Some(IdentityError::InvalidEmail),
        "WEAK_PASSWORD" | "MISSING_PASSWORD" => Some(IdentityError::WeakPassword),
        _ => None,
    }
}

fn is_expired_credential(err: &IdentityError) -> bool {
    match err {
        IdentityError::Unknown(message) => matches!(
            error_code(message),
            "TOKEN_EXPIRED" | "INVALID_ID_TOKEN" | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN"
        ),
        _ => false,
    }
}

fn is_transient(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}
