//! Wire types for the Identigraf API. Every response is either a domain
//! payload or a failure envelope, discriminated by the `success` field.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const COMM_ERROR_CODE: &str = "COMM_ERROR";
pub const COMM_ERROR_MESSAGE: &str = "Помилка спілкування з сервером";
pub const COMM_ERROR_STATUS: u16 = 502;

/// Failure envelope returned for domain errors and transport failures alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl ErrorResponse {
    /// The sentinel envelope used when the server could not be reached or its
    /// reply could not be decoded.
    #[must_use]
    pub fn communication() -> Self {
        Self {
            success: false,
            status: COMM_ERROR_STATUS,
            code: COMM_ERROR_CODE.to_string(),
            message: COMM_ERROR_MESSAGE.to_string(),
        }
    }

    #[must_use]
    pub fn is_communication_error(&self) -> bool {
        self.code == COMM_ERROR_CODE
    }
}

/// Result of an API call: the domain payload or the failure envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ApiResponse<T> {
    Success(T),
    Failure(ErrorResponse),
}

impl<T> ApiResponse<T> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Converts into a standard `Result`, keeping the envelope as the error.
    ///
    /// # Errors
    /// Returns the failure envelope when the server reported a failure.
    pub fn into_result(self) -> Result<T, ErrorResponse> {
        match self {
            Self::Success(payload) => Ok(payload),
            Self::Failure(error) => Err(error),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for ApiResponse<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;

        let failed = value.get("success").and_then(Value::as_bool) == Some(false);
        if failed {
            ErrorResponse::deserialize(value)
                .map(Self::Failure)
                .map_err(serde::de::Error::custom)
        } else {
            T::deserialize(value)
                .map(Self::Success)
                .map_err(serde::de::Error::custom)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckPhoneResponse {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Processing state of a compare or search job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    InProgress,
    Complete,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareStatusResponse {
    pub success: bool,
    #[serde(default)]
    pub status: JobStatus,
    /// Similarity per compared photo, keyed by the photo index.
    #[serde(default)]
    pub matches: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Number of faces detected on the uploaded photo.
    pub faces: u32,
    /// Matches found per detected face, keyed by the face index.
    #[serde(default)]
    pub matches: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStatusResponse {
    pub success: bool,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SearchStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedFace {
    pub similarity: f64,
    pub object: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedFacesResponse {
    pub success: bool,
    #[serde(default)]
    pub matches: Vec<MatchedFace>,
}
