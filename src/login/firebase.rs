//! Phone verification through the Firebase Identity Toolkit REST API.
//!
//! `accounts:sendVerificationCode` dispatches the SMS and returns
//! `sessionInfo`, which becomes the [`Challenge`]. `accounts:signInWithPhoneNumber`
//! exchanges `sessionInfo` and the code for an ID token. REST error messages
//! (`INVALID_CODE`, `SESSION_EXPIRED`, ...) are mapped to the `auth/*` codes the
//! rest of the crate understands. The API key is passed as a query parameter and
//! is never logged.

use super::provider::{Challenge, Principal, ProviderError, VerificationProvider, Verifier};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info_span, Instrument};

pub const DEFAULT_FIREBASE_URL: &str = "https://identitytoolkit.googleapis.com";

#[derive(Clone)]
pub struct FirebaseProvider {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendCodeRequest<'a> {
    phone_number: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    recaptcha_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendCodeResponse {
    session_info: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    session_info: &'a str,
    code: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    local_id: String,
    #[serde(default)]
    phone_number: String,
}

/// User returned by a confirmed code.
#[derive(Clone, Debug)]
pub struct FirebaseUser {
    local_id: String,
    phone_number: String,
    id_token: SecretString,
}

#[async_trait]
impl Principal for FirebaseUser {
    fn uid(&self) -> &str {
        &self.local_id
    }

    fn phone_number(&self) -> &str {
        &self.phone_number
    }

    async fn id_token(&self) -> Result<SecretString, ProviderError> {
        Ok(self.id_token.clone())
    }
}

/// Maps an Identity Toolkit error message to an `auth/*` code.
/// Messages look like `INVALID_PHONE_NUMBER : Invalid format.`.
fn error_code(message: &str) -> &'static str {
    let reason = message.split(" : ").next().unwrap_or("").trim();

    match reason {
        "INVALID_PHONE_NUMBER" => "auth/invalid-phone-number",
        "MISSING_PHONE_NUMBER" => "auth/missing-phone-number",
        "QUOTA_EXCEEDED" => "auth/quota-exceeded",
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "auth/too-many-requests",
        "CAPTCHA_CHECK_FAILED" => "auth/captcha-check-failed",
        "INVALID_APP_CREDENTIAL" | "MISSING_APP_CREDENTIAL" | "INVALID_RECAPTCHA_TOKEN" => {
            "auth/invalid-app-credential"
        }
        "USER_DISABLED" => "auth/user-disabled",
        "OPERATION_NOT_ALLOWED" => "auth/operation-not-allowed",
        "INVALID_CODE" => "auth/invalid-verification-code",
        "MISSING_CODE" => "auth/missing-verification-code",
        "SESSION_EXPIRED" => "auth/code-expired",
        "INVALID_SESSION_INFO" => "auth/invalid-verification-id",
        "MISSING_SESSION_INFO" => "auth/missing-verification-id",
        _ => "auth/internal-error",
    }
}

fn rest_error(body: &Value) -> ProviderError {
    let message = body
        .get("error")
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("");

    ProviderError::new(error_code(message), message)
}

/// The request URL carries the API key, so it is stripped from the message.
fn network_error(err: reqwest::Error) -> ProviderError {
    ProviderError::new(
        "auth/network-request-failed",
        err.without_url().to_string(),
    )
}

impl FirebaseProvider {
    /// # Errors
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(base_url: &str, api_key: SecretString) -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(crate::APP_USER_AGENT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn call<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<R, ProviderError> {
        let url = format!("{}/v1/accounts:{method}", self.base_url);
        let span = info_span!("firebase.call", http.method = "POST", url = %url);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.expose_secret())])
            .json(body)
            .send()
            .instrument(span)
            .await
            .map_err(network_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(network_error)?;
        let body: Value = serde_json::from_slice(&bytes)
            .map_err(|err| ProviderError::new("auth/internal-error", err.to_string()))?;

        if !status.is_success() {
            let error = rest_error(&body);
            debug!("{} - {}, {}", url, status, error.message);
            return Err(error);
        }

        serde_json::from_value(body)
            .map_err(|err| ProviderError::new("auth/internal-error", err.to_string()))
    }
}

#[async_trait]
impl VerificationProvider for FirebaseProvider {
    type Principal = FirebaseUser;

    async fn send_code(
        &self,
        phone: &str,
        verifier: &dyn Verifier,
    ) -> Result<Challenge, ProviderError> {
        let request = SendCodeRequest {
            phone_number: phone,
            recaptcha_token: verifier.token().await?,
        };

        let response: SendCodeResponse = self.call("sendVerificationCode", &request).await?;

        Ok(Challenge::new(response.session_info))
    }

    async fn confirm(
        &self,
        challenge: &Challenge,
        code: &str,
    ) -> Result<FirebaseUser, ProviderError> {
        let request = SignInRequest {
            session_info: challenge.verification_id(),
            code,
        };

        let response: SignInResponse = self.call("signInWithPhoneNumber", &request).await?;

        Ok(FirebaseUser {
            local_id: response.local_id,
            phone_number: response.phone_number,
            id_token: SecretString::from(response.id_token),
        })
    }
}
