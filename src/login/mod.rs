//! Phone login flow.
//!
//! [`LoginFlow`] owns the state of one login screen and sequences the steps:
//! phone submission, provider challenge, code submission, API login, session
//! update and navigation. Every step resolves to an [`Outcome`]; failures are
//! decoded into a user-facing message and the flow returns to an idle state.
//!
//! State machine (`phase` guards every transition):
//!
//! ```text
//!   PhoneEntry --submit_phone--> [busy] --ok--> CodeEntry
//!        ^                          |
//!        +---------- error ---------+
//!
//!   CodeEntry --submit_code--> [busy] --ok--> session set, navigate(Search)
//!        ^  |                     |
//!        |  +--reset--> PhoneEntry +-- provider rejection: stay (or PhoneEntry
//!        |                             when the challenge is exhausted)
//!        +-- API login failure: PhoneEntry
//! ```
//!
//! The state sits behind a mutex that is never held across an await, so a
//! submission arriving while another is in flight observes `Phase::Busy` and
//! is ignored.

mod errors;
mod firebase;
mod phone;
mod provider;

pub use errors::{decode_provider_code, decode_provider_error};
pub use firebase::{FirebaseProvider, FirebaseUser, DEFAULT_FIREBASE_URL};
pub use phone::{normalize_phone, valid_country_code, DEFAULT_COUNTRY_CODE};
pub use provider::{
    Challenge, Principal, ProviderError, StaticVerifier, VerificationProvider, Verifier,
};

use crate::api::{
    decode_error_response, ApiClient, ApiResponse, CheckPhoneResponse, LoginResponse,
};
use crate::report::Reporter;
use crate::session::{Session, SessionStore, User};
use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

/// The two API calls the login flow needs.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn check_phone(&self, phone: &str) -> ApiResponse<CheckPhoneResponse>;

    async fn login(&self, id_token: &SecretString) -> ApiResponse<LoginResponse>;
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn check_phone(&self, phone: &str) -> ApiResponse<CheckPhoneResponse> {
        ApiClient::check_phone(self, phone).await
    }

    async fn login(&self, id_token: &SecretString) -> ApiResponse<LoginResponse> {
        ApiClient::login(self, id_token).await
    }
}

/// Destinations the login screen can send the user to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Search,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Search => "/search",
        }
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Busy,
}

/// Local state of one login screen.
#[derive(Clone, Debug, Default)]
pub struct LoginState {
    /// Phone as typed, kept so the user does not have to retype it.
    pub phone: String,
    pub code: String,
    pub challenge: Option<Challenge>,
    pub phase: Phase,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Busy, or the event does not apply to the current state.
    Ignored,
    ChallengeSent,
    Failed(String),
    Reset,
    LoggedIn,
}

/// What the login screen shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginView {
    Loading,
    Redirect(Route),
    PhoneForm {
        error: Option<String>,
        busy: bool,
    },
    CodeForm {
        phone: String,
        error: Option<String>,
        busy: bool,
    },
}

pub struct LoginFlow<A, P> {
    api: A,
    provider: P,
    store: SessionStore,
    navigator: Arc<dyn Navigator>,
    reporter: Arc<dyn Reporter>,
    country_code: String,
    state: Mutex<LoginState>,
}

impl<A, P> LoginFlow<A, P>
where
    A: AuthApi,
    P: VerificationProvider,
{
    pub fn new(
        api: A,
        provider: P,
        store: SessionStore,
        navigator: Arc<dyn Navigator>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            api,
            provider,
            store,
            navigator,
            reporter,
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            state: Mutex::new(LoginState::default()),
        }
    }

    #[must_use]
    pub fn with_country_code(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = country_code.into();
        self
    }

    #[must_use]
    pub fn snapshot(&self) -> LoginState {
        self.state().clone()
    }

    /// Decides what to show for the given session.
    #[must_use]
    pub fn render(&self, session: &Session) -> LoginView {
        if session.is_unknown() {
            return LoginView::Loading;
        }
        if session.user().is_some() {
            return LoginView::Redirect(Route::Search);
        }

        let state = self.state();
        let busy = state.phase == Phase::Busy;
        let error = state.error.clone();

        if state.challenge.is_some() {
            LoginView::CodeForm {
                phone: state.phone.clone(),
                error,
                busy,
            }
        } else {
            LoginView::PhoneForm { error, busy }
        }
    }

    /// Checks the phone with the API and asks the provider to send a code.
    #[instrument(skip_all)]
    pub async fn submit_phone(&self, phone: &str, verifier: &dyn Verifier) -> Outcome {
        {
            let mut state = self.state();
            if state.phase == Phase::Busy || state.challenge.is_some() {
                debug!("phone submission ignored");
                return Outcome::Ignored;
            }
            state.phase = Phase::Busy;
            state.phone = phone.to_string();
        }

        let normalized = normalize_phone(phone, &self.country_code);

        if let Err(response) = self.api.check_phone(&normalized).await.into_result() {
            warn!(code = %response.code, status = response.status, "phone check failed");
            return self.fail(decode_error_response(&response), |_| {});
        }

        match self.provider.send_code(&normalized, verifier).await {
            Ok(challenge) => {
                info!("verification code sent");
                let mut state = self.state();
                state.challenge = Some(challenge);
                state.error = None;
                state.phase = Phase::Idle;
                Outcome::ChallengeSent
            }
            Err(err) => {
                warn!(code = %err.code, "verification code was not sent");
                let outcome = self.fail(decode_provider_error(&err.code, &err.message), |_| {});

                if let Err(reset_err) = verifier.reset().await {
                    self.reporter.notify(&reset_err);
                }

                outcome
            }
        }
    }

    /// Confirms the code, exchanges the identity token and logs in.
    #[instrument(skip_all)]
    pub async fn submit_code(&self, code: &str) -> Outcome {
        let challenge = {
            let mut state = self.state();
            if state.phase == Phase::Busy {
                debug!("code submission ignored");
                return Outcome::Ignored;
            }
            let Some(challenge) = state.challenge.clone() else {
                debug!("code submitted without a challenge");
                return Outcome::Ignored;
            };
            state.phase = Phase::Busy;
            state.code = code.to_string();
            challenge
        };

        let principal = match self.provider.confirm(&challenge, code).await {
            Ok(principal) => principal,
            Err(err) => return self.provider_rejection(&err),
        };

        let id_token = match principal.id_token().await {
            Ok(token) => token,
            Err(err) => return self.provider_rejection(&err),
        };

        match self.api.login(&id_token).await.into_result() {
            Ok(_) => {
                info!("login succeeded");
                {
                    let mut state = self.state();
                    state.challenge = None;
                    state.code.clear();
                    state.error = None;
                    state.phase = Phase::Idle;
                }

                self.store.set_session(Session::User(User {
                    uid: principal.uid().to_string(),
                    phone_number: principal.phone_number().to_string(),
                    id_token,
                }));
                self.navigator.navigate(Route::Search);

                Outcome::LoggedIn
            }
            Err(response) => {
                warn!(code = %response.code, status = response.status, "login failed");
                self.fail(decode_error_response(&response), |state| {
                    state.code.clear();
                    state.challenge = None;
                })
            }
        }
    }

    /// Drops the pending challenge and returns to phone entry.
    pub fn reset(&self) -> Outcome {
        let mut state = self.state();
        if state.phase == Phase::Busy {
            return Outcome::Ignored;
        }

        state.error = None;
        state.challenge = None;
        state.code.clear();
        Outcome::Reset
    }

    fn provider_rejection(&self, err: &ProviderError) -> Outcome {
        warn!(code = %err.code, "code confirmation failed");
        let exhausted = err.ends_challenge();

        self.fail(decode_provider_error(&err.code, &err.message), |state| {
            if exhausted {
                state.challenge = None;
                state.code.clear();
            }
        })
    }

    fn fail(&self, message: String, update: impl FnOnce(&mut LoginState)) -> Outcome {
        let mut state = self.state();
        update(&mut state);
        state.error = Some(message.clone());
        state.phase = Phase::Idle;
        Outcome::Failed(message)
    }

    fn state(&self) -> MutexGuard<'_, LoginState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErrorResponse;
    use crate::report::testing::RecordingReporter;
    use secrecy::ExposeSecret;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct FakeApi {
        check_phone_error: Option<ErrorResponse>,
        login_error: Option<ErrorResponse>,
        gate: Option<Arc<Notify>>,
        phones: Mutex<Vec<String>>,
        tokens: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AuthApi for FakeApi {
        async fn check_phone(&self, phone: &str) -> ApiResponse<CheckPhoneResponse> {
            self.phones.lock().unwrap().push(phone.to_string());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match &self.check_phone_error {
                Some(error) => ApiResponse::Failure(error.clone()),
                None => ApiResponse::Success(CheckPhoneResponse { success: true }),
            }
        }

        async fn login(&self, id_token: &SecretString) -> ApiResponse<LoginResponse> {
            self.tokens
                .lock()
                .unwrap()
                .push(id_token.expose_secret().to_string());
            match &self.login_error {
                Some(error) => ApiResponse::Failure(error.clone()),
                None => ApiResponse::Success(LoginResponse {
                    success: true,
                    token: None,
                    extra: Default::default(),
                }),
            }
        }
    }

    struct FakeUser;

    #[async_trait]
    impl Principal for FakeUser {
        fn uid(&self) -> &str {
            "uid-1"
        }

        fn phone_number(&self) -> &str {
            "+380501234567"
        }

        async fn id_token(&self) -> Result<SecretString, ProviderError> {
            Ok(SecretString::from("id-token".to_string()))
        }
    }

    #[derive(Default)]
    struct FakeProvider {
        send_error: Option<ProviderError>,
        confirm_error: Option<ProviderError>,
        confirm_gate: Option<Arc<Notify>>,
        sent: AtomicUsize,
        confirmed: AtomicUsize,
    }

    #[async_trait]
    impl VerificationProvider for FakeProvider {
        type Principal = FakeUser;

        async fn send_code(
            &self,
            _phone: &str,
            _verifier: &dyn Verifier,
        ) -> Result<Challenge, ProviderError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            match &self.send_error {
                Some(err) => Err(err.clone()),
                None => Ok(Challenge::new("session-1")),
            }
        }

        async fn confirm(
            &self,
            challenge: &Challenge,
            _code: &str,
        ) -> Result<FakeUser, ProviderError> {
            assert_eq!(challenge.verification_id(), "session-1");
            self.confirmed.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.confirm_gate {
                gate.notified().await;
            }
            match &self.confirm_error {
                Some(err) => Err(err.clone()),
                None => Ok(FakeUser),
            }
        }
    }

    #[derive(Default)]
    struct FakeVerifier {
        fail_reset: bool,
        resets: AtomicUsize,
    }

    #[async_trait]
    impl Verifier for FakeVerifier {
        async fn token(&self) -> Result<Option<String>, ProviderError> {
            Ok(Some("captcha".to_string()))
        }

        async fn reset(&self) -> Result<(), ProviderError> {
            self.resets.fetch_add(1, Ordering::SeqCst);
            if self.fail_reset {
                Err(ProviderError::new("recaptcha/reset", "widget is gone"))
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct RecordingNavigator {
        routes: Mutex<Vec<Route>>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, route: Route) {
            self.routes.lock().unwrap().push(route);
        }
    }

    struct Harness {
        flow: LoginFlow<FakeApi, FakeProvider>,
        store: SessionStore,
        navigator: Arc<RecordingNavigator>,
        reporter: Arc<RecordingReporter>,
    }

    fn harness(api: FakeApi, provider: FakeProvider) -> Harness {
        let store = SessionStore::new();
        store.set_session(Session::Anonymous);
        let navigator = Arc::new(RecordingNavigator::default());
        let reporter = Arc::new(RecordingReporter::default());
        let flow = LoginFlow::new(
            api,
            provider,
            store.clone(),
            navigator.clone(),
            reporter.clone(),
        );

        Harness {
            flow,
            store,
            navigator,
            reporter,
        }
    }

    fn api_error(code: &str) -> ErrorResponse {
        ErrorResponse {
            success: false,
            status: 403,
            code: code.to_string(),
            message: "denied".to_string(),
        }
    }

    #[test]
    fn test_route_path() {
        assert_eq!(Route::Search.path(), "/search");
    }

    #[test]
    fn test_render_follows_session() {
        let h = harness(FakeApi::default(), FakeProvider::default());

        assert_eq!(h.flow.render(&Session::Unknown), LoginView::Loading);
        assert_eq!(
            h.flow.render(&h.store.session()),
            LoginView::PhoneForm {
                error: None,
                busy: false
            }
        );
        let user = Session::User(User {
            uid: "uid".to_string(),
            phone_number: "+380".to_string(),
            id_token: SecretString::from("t".to_string()),
        });
        assert_eq!(h.flow.render(&user), LoginView::Redirect(Route::Search));
        assert!(h.navigator.routes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn phone_submission_sends_normalized_number() {
        let h = harness(FakeApi::default(), FakeProvider::default());
        let verifier = FakeVerifier::default();

        let outcome = h.flow.submit_phone("(050) 123-45-67", &verifier).await;

        assert_eq!(outcome, Outcome::ChallengeSent);
        assert_eq!(
            *h.flow.api.phones.lock().unwrap(),
            vec!["+380501234567".to_string()]
        );
        let state = h.flow.snapshot();
        assert_eq!(state.phone, "(050) 123-45-67");
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.challenge.is_some());
        assert_eq!(
            h.flow.render(&h.store.session()),
            LoginView::CodeForm {
                phone: "(050) 123-45-67".to_string(),
                error: None,
                busy: false
            }
        );
    }

    #[tokio::test]
    async fn failed_phone_check_skips_provider() {
        let api = FakeApi {
            check_phone_error: Some(api_error("USER_NOT_FOUND")),
            ..FakeApi::default()
        };
        let h = harness(api, FakeProvider::default());

        let outcome = h.flow.submit_phone("0501234567", &FakeVerifier::default()).await;

        let message = "Користувача з таким номером телефону не знайдено".to_string();
        assert_eq!(outcome, Outcome::Failed(message.clone()));
        assert_eq!(h.flow.provider.sent.load(Ordering::SeqCst), 0);
        let state = h.flow.snapshot();
        assert_eq!(state.error, Some(message));
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.challenge.is_none());
    }

    #[tokio::test]
    async fn busy_flow_ignores_second_phone_submission() {
        let gate = Arc::new(Notify::new());
        let api = FakeApi {
            gate: Some(gate.clone()),
            ..FakeApi::default()
        };
        let h = harness(api, FakeProvider::default());
        let verifier = FakeVerifier::default();

        let (first, second) = tokio::join!(h.flow.submit_phone("0501234567", &verifier), async {
            let second = h.flow.submit_phone("0670000000", &verifier).await;
            assert_eq!(h.flow.snapshot().phase, Phase::Busy);
            gate.notify_one();
            second
        });

        assert_eq!(first, Outcome::ChallengeSent);
        assert_eq!(second, Outcome::Ignored);
        assert_eq!(h.flow.api.phones.lock().unwrap().len(), 1);
        assert_eq!(h.flow.snapshot().phone, "0501234567");
    }

    #[tokio::test]
    async fn busy_flow_ignores_reset_and_second_code() {
        let gate = Arc::new(Notify::new());
        let provider = FakeProvider {
            confirm_gate: Some(gate.clone()),
            ..FakeProvider::default()
        };
        let h = harness(FakeApi::default(), provider);
        h.flow
            .submit_phone("0501234567", &FakeVerifier::default())
            .await;

        let (first, (reset, second)) = tokio::join!(h.flow.submit_code("123456"), async {
            let reset = h.flow.reset();
            let second = h.flow.submit_code("654321").await;
            let state = h.flow.snapshot();
            assert_eq!(state.phase, Phase::Busy);
            assert!(state.challenge.is_some());
            assert_eq!(state.code, "123456");
            gate.notify_one();
            (reset, second)
        });

        assert_eq!(reset, Outcome::Ignored);
        assert_eq!(second, Outcome::Ignored);
        assert_eq!(first, Outcome::LoggedIn);
        assert_eq!(h.flow.provider.confirmed.load(Ordering::SeqCst), 1);
        assert_eq!(*h.navigator.routes.lock().unwrap(), vec![Route::Search]);
    }

    #[tokio::test]
    async fn provider_send_failure_resets_verifier_and_reports_reset_error() {
        let provider = FakeProvider {
            send_error: Some(ProviderError::new(
                "auth/invalid-phone-number",
                "INVALID_PHONE_NUMBER",
            )),
            ..FakeProvider::default()
        };
        let h = harness(FakeApi::default(), provider);
        let verifier = FakeVerifier {
            fail_reset: true,
            ..FakeVerifier::default()
        };

        let outcome = h.flow.submit_phone("0501234567", &verifier).await;

        assert_eq!(
            outcome,
            Outcome::Failed("Некоректний номер телефону".to_string())
        );
        assert_eq!(verifier.resets.load(Ordering::SeqCst), 1);
        assert_eq!(
            h.reporter.messages(),
            vec!["recaptcha/reset: widget is gone".to_string()]
        );
        assert!(h.flow.snapshot().challenge.is_none());
    }

    #[tokio::test]
    async fn wrong_code_keeps_challenge() {
        let provider = FakeProvider {
            confirm_error: Some(ProviderError::new(
                "auth/invalid-verification-code",
                "INVALID_CODE",
            )),
            ..FakeProvider::default()
        };
        let h = harness(FakeApi::default(), provider);
        h.flow
            .submit_phone("0501234567", &FakeVerifier::default())
            .await;

        let outcome = h.flow.submit_code("000000").await;

        assert_eq!(
            outcome,
            Outcome::Failed("Невірний код підтвердження".to_string())
        );
        let state = h.flow.snapshot();
        assert!(state.challenge.is_some());
        assert_eq!(state.phase, Phase::Idle);
        assert!(h.flow.api.tokens.lock().unwrap().is_empty());
        assert!(h.store.session().user().is_none());
    }

    #[tokio::test]
    async fn expired_code_returns_to_phone_entry() {
        let provider = FakeProvider {
            confirm_error: Some(ProviderError::new("auth/code-expired", "SESSION_EXPIRED")),
            ..FakeProvider::default()
        };
        let h = harness(FakeApi::default(), provider);
        h.flow
            .submit_phone("0501234567", &FakeVerifier::default())
            .await;

        h.flow.submit_code("123456").await;

        let state = h.flow.snapshot();
        assert!(state.challenge.is_none());
        assert_eq!(
            state.error.as_deref(),
            Some("Термін дії коду минув. Запросіть новий код")
        );
        assert_eq!(state.phone, "0501234567");
    }

    #[tokio::test]
    async fn failed_login_clears_challenge() {
        let api = FakeApi {
            login_error: Some(api_error("INVALID_TOKEN")),
            ..FakeApi::default()
        };
        let h = harness(api, FakeProvider::default());
        h.flow
            .submit_phone("0501234567", &FakeVerifier::default())
            .await;

        let outcome = h.flow.submit_code("123456").await;

        assert_eq!(
            outcome,
            Outcome::Failed("Недійсний токен автентифікації".to_string())
        );
        let state = h.flow.snapshot();
        assert!(state.challenge.is_none());
        assert!(state.code.is_empty());
        assert!(h.navigator.routes.lock().unwrap().is_empty());
        assert!(matches!(h.store.session(), Session::Anonymous));
    }

    #[tokio::test]
    async fn successful_login_sets_session_and_navigates_once() {
        let h = harness(FakeApi::default(), FakeProvider::default());
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = notified.clone();
        h.store.subscribe(move |state| {
            assert!(state.session.user().is_some());
            counter.fetch_add(1, Ordering::SeqCst);
        });

        h.flow
            .submit_phone("0501234567", &FakeVerifier::default())
            .await;
        let outcome = h.flow.submit_code("123456").await;

        assert_eq!(outcome, Outcome::LoggedIn);
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert_eq!(*h.navigator.routes.lock().unwrap(), vec![Route::Search]);
        assert_eq!(
            *h.flow.api.tokens.lock().unwrap(),
            vec!["id-token".to_string()]
        );
        let session = h.store.session();
        let user = session.user().unwrap();
        assert_eq!(user.uid, "uid-1");
        assert_eq!(user.id_token.expose_secret(), "id-token");
    }

    #[tokio::test]
    async fn reset_clears_error_and_challenge() {
        let provider = FakeProvider {
            confirm_error: Some(ProviderError::new(
                "auth/invalid-verification-code",
                "INVALID_CODE",
            )),
            ..FakeProvider::default()
        };
        let h = harness(FakeApi::default(), provider);
        h.flow
            .submit_phone("0501234567", &FakeVerifier::default())
            .await;
        h.flow.submit_code("000000").await;
        assert!(h.flow.snapshot().error.is_some());

        assert_eq!(h.flow.reset(), Outcome::Reset);

        let state = h.flow.snapshot();
        assert!(state.error.is_none());
        assert!(state.challenge.is_none());
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(
            h.flow.render(&h.store.session()),
            LoginView::PhoneForm {
                error: None,
                busy: false
            }
        );
    }

    #[tokio::test]
    async fn code_without_challenge_is_ignored() {
        let h = harness(FakeApi::default(), FakeProvider::default());

        assert_eq!(h.flow.submit_code("123456").await, Outcome::Ignored);
        assert_eq!(h.flow.provider.confirmed.load(Ordering::SeqCst), 0);
    }
}
