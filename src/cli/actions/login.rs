use crate::api::{ApiClient, ApiConfig};
use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::login::{
    AuthApi, FirebaseProvider, LoginFlow, LoginView, Navigator, Route, StaticVerifier,
    VerificationProvider, Verifier,
};
use crate::report::{Reporter, TracingReporter};
use crate::session::{Session, SessionStore, User};
use anyhow::{anyhow, Context, Result};
use secrecy::ExposeSecret;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::info;

/// Terminal has a single screen; navigation is only logged.
#[derive(Debug, Default)]
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, route: Route) {
        info!(route = route.path(), "navigate");
    }
}

/// Handle the login action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    let Action::Login {
        phone,
        firebase_url,
        firebase_api_key,
        recaptcha_token,
        print_token,
    } = action
    else {
        return Err(anyhow!("not a login action"));
    };

    let reporter: Arc<dyn Reporter> = Arc::new(TracingReporter);
    let api = ApiClient::new(ApiConfig::new(&globals.api_url)?, reporter.clone())?;
    let provider = FirebaseProvider::new(&firebase_url, firebase_api_key)?;

    // Nothing is persisted, so a fresh process is always logged out.
    let store = SessionStore::new();
    store.set_session(Session::Anonymous);

    let flow = LoginFlow::new(
        api,
        provider,
        store.clone(),
        Arc::new(TerminalNavigator),
        reporter,
    )
    .with_country_code(globals.country_code.clone());

    let verifier = StaticVerifier::new(recaptcha_token);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let user = drive(
        &flow,
        &store,
        &verifier,
        phone,
        &mut lines,
        &mut std::io::stderr(),
    )
    .await?;

    println!("uid: {}", user.uid);
    println!("phone: {}", user.phone_number);
    if print_token {
        println!("token: {}", user.id_token.expose_secret());
    }

    Ok(())
}

/// Runs the login screen against line based input until the session holds a
/// user. An empty line on the code prompt goes back to phone entry.
async fn drive<A, P, R, W>(
    flow: &LoginFlow<A, P>,
    store: &SessionStore,
    verifier: &dyn Verifier,
    mut phone: Option<String>,
    lines: &mut Lines<R>,
    out: &mut W,
) -> Result<User>
where
    A: AuthApi,
    P: VerificationProvider,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        match flow.render(&store.session()) {
            LoginView::Loading => return Err(anyhow!("session is not resolved")),
            LoginView::Redirect(_) => {
                return store
                    .session()
                    .user()
                    .cloned()
                    .context("session has no user");
            }
            LoginView::PhoneForm { error, .. } => {
                show_error(out, error.as_deref())?;
                let input = match phone.take() {
                    Some(input) => input,
                    None => prompt(out, lines, "Phone number: ").await?,
                };
                if input.trim().is_empty() {
                    continue;
                }
                flow.submit_phone(input.trim(), verifier).await;
            }
            LoginView::CodeForm {
                phone: entered,
                error,
                ..
            } => {
                show_error(out, error.as_deref())?;
                let message = format!("Code sent to {entered} (empty line to change number): ");
                let code = prompt(out, lines, &message).await?;
                if code.trim().is_empty() {
                    flow.reset();
                } else {
                    flow.submit_code(code.trim()).await;
                }
            }
        }
    }
}

fn show_error<W: Write>(out: &mut W, error: Option<&str>) -> Result<()> {
    if let Some(error) = error {
        writeln!(out, "{error}")?;
    }
    Ok(())
}

async fn prompt<R, W>(out: &mut W, lines: &mut Lines<R>, message: &str) -> Result<String>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    write!(out, "{message}")?;
    out.flush()?;

    lines
        .next_line()
        .await?
        .ok_or_else(|| anyhow!("input closed before login completed"))
}
