//! Seams to the phone verification provider. A provider sends a one-time code
//! and hands back an opaque [`Challenge`]; confirming the code against the
//! challenge yields a [`Principal`] that can produce an identity token.

use async_trait::async_trait;
use secrecy::SecretString;
use std::fmt;

/// Provider failure with a machine-readable code such as
/// `auth/invalid-verification-code`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ProviderError {
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// True when the provider will not accept further codes for the challenge.
    #[must_use]
    pub fn ends_challenge(&self) -> bool {
        matches!(
            self.code.as_str(),
            "auth/code-expired"
                | "auth/invalid-verification-id"
                | "auth/missing-verification-id"
                | "auth/too-many-requests"
        )
    }
}

/// Pending one-time-code verification.
#[derive(Clone, PartialEq, Eq)]
pub struct Challenge {
    verification_id: String,
}

impl Challenge {
    pub fn new(verification_id: impl Into<String>) -> Self {
        Self {
            verification_id: verification_id.into(),
        }
    }

    #[must_use]
    pub fn verification_id(&self) -> &str {
        &self.verification_id
    }
}

impl fmt::Debug for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Challenge").finish_non_exhaustive()
    }
}

/// Bot check attached to a code request (a reCAPTCHA widget in the browser).
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Token proving the check passed, if the provider needs one.
    async fn token(&self) -> Result<Option<String>, ProviderError>;

    /// Re-arms the check after a failed code request.
    async fn reset(&self) -> Result<(), ProviderError>;
}

/// Identity verified by a confirmed code.
#[async_trait]
pub trait Principal: Send + Sync {
    fn uid(&self) -> &str;

    fn phone_number(&self) -> &str;

    async fn id_token(&self) -> Result<SecretString, ProviderError>;
}

#[async_trait]
pub trait VerificationProvider: Send + Sync {
    type Principal: Principal;

    async fn send_code(
        &self,
        phone: &str,
        verifier: &dyn Verifier,
    ) -> Result<Challenge, ProviderError>;

    async fn confirm(
        &self,
        challenge: &Challenge,
        code: &str,
    ) -> Result<Self::Principal, ProviderError>;
}

/// Verifier backed by a token obtained out of band. Tokens are single use, so
/// there is nothing to re-arm.
#[derive(Clone, Default)]
pub struct StaticVerifier {
    token: Option<String>,
}

impl StaticVerifier {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|token| !token.trim().is_empty()),
        }
    }
}

impl fmt::Debug for StaticVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticVerifier")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[async_trait]
impl Verifier for StaticVerifier {
    async fn token(&self) -> Result<Option<String>, ProviderError> {
        Ok(self.token.clone())
    }

    async fn reset(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
