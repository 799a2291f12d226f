//! HTTP client for the Identigraf API. Calls never fail past this boundary:
//! transport and decoding problems collapse into the `COMM_ERROR` envelope and
//! the cause is handed to the configured [`Reporter`]. HTTP status codes are
//! not interpreted; the JSON body alone decides success or failure.

mod errors;
mod types;

pub use errors::{decode_error_code, decode_error_response, GENERIC_ERROR_MESSAGE};
pub use types::*;

use crate::report::Reporter;
use reqwest::{header, Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api2.myrotvorets.center";

/// Page size used when listing matches for a detected face.
pub const MATCHES_PAGE_SIZE: u32 = 20;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid API base URL: {0}")]
    BaseUrl(#[from] url::ParseError),

    #[error("unsupported API base URL scheme: {0}")]
    Scheme(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("request body could not be encoded: {0}")]
    Encode(serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    base_url: String,
}

impl ApiConfig {
    /// # Errors
    /// Returns an error if `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let url = Url::parse(base_url.trim())?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(ClientError::Scheme(other.to_string())),
        }

        Ok(Self {
            base_url: url.as_str().trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: ApiConfig,
    reporter: Arc<dyn Reporter>,
}

impl ApiClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: ApiConfig, reporter: Arc<dyn Reporter>) -> Result<Self, ClientError> {
        let client = Client::builder().user_agent(crate::APP_USER_AGENT).build()?;

        Ok(Self {
            client,
            config,
            reporter,
        })
    }

    /// Asks whether the phone number may log in.
    pub async fn check_phone(&self, phone: &str) -> ApiResponse<CheckPhoneResponse> {
        let url = self.url("/identigraf-auth/v2/checkphone");
        let span = info_span!("api.check_phone", http.method = "POST", url = %url);
        let body = json!({ "phone": phone });

        self.post(&url, Some(&body), None).instrument(span).await
    }

    /// Exchanges a provider identity token for an application login.
    pub async fn login(&self, id_token: &SecretString) -> ApiResponse<LoginResponse> {
        let url = self.url("/identigraf-auth/v2/login");
        let span = info_span!("api.login", http.method = "POST", url = %url);

        self.post::<(), _>(&url, None, Some(id_token))
            .instrument(span)
            .await
    }

    pub async fn check_compare_status(&self, guid: &str) -> ApiResponse<CompareStatusResponse> {
        let url = self.url(&format!("/identigraf/v2/compare/{guid}"));
        let span = info_span!("api.check_compare_status", http.method = "GET", url = %url);

        self.get(&url).instrument(span).await
    }

    pub async fn check_search_status(&self, guid: &str) -> ApiResponse<SearchStatusResponse> {
        let url = self.url(&format!("/identigraf/v2/search/{guid}"));
        let span = info_span!("api.check_search_status", http.method = "GET", url = %url);

        self.get(&url).instrument(span).await
    }

    /// Fetches the first page of matches for one detected face of a search.
    pub async fn get_matched_faces(
        &self,
        guid: &str,
        face_index: u32,
    ) -> ApiResponse<MatchedFacesResponse> {
        let url = self.url(&format!(
            "/identigraf/v2/search/{guid}/matches/{face_index}/0/{MATCHES_PAGE_SIZE}"
        ));
        let span = info_span!("api.get_matched_faces", http.method = "GET", url = %url);

        self.get(&url).instrument(span).await
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.base_url, endpoint.trim_start_matches('/'))
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        url: &str,
        body: Option<&B>,
        auth: Option<&SecretString>,
    ) -> ApiResponse<R> {
        let mut request = self
            .client
            .post(url)
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json");

        if let Some(token) = auth {
            request = request.bearer_auth(token.expose_secret());
        }

        if let Some(body) = body {
            match serde_json::to_vec(body) {
                Ok(bytes) => request = request.body(bytes),
                Err(err) => return self.communication_failure(&ClientError::Encode(err)),
            }
        }

        self.execute(request).await
    }

    async fn get<R: DeserializeOwned>(&self, url: &str) -> ApiResponse<R> {
        let request = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json");

        self.execute(request).await
    }

    async fn execute<R: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResponse<R> {
        match send(request).await {
            Ok(response) => response,
            Err(err) => self.communication_failure(&err),
        }
    }

    fn communication_failure<R>(&self, err: &ClientError) -> ApiResponse<R> {
        debug!("request failed: {err}");
        self.reporter.notify(err);
        ApiResponse::Failure(ErrorResponse::communication())
    }
}

async fn send<R: DeserializeOwned>(request: RequestBuilder) -> Result<ApiResponse<R>, ClientError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.bytes().await?;

    debug!("response status: {}, {} bytes", status, body.len());

    Ok(serde_json::from_slice(&body)?)
}
