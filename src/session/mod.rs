//! Session store shared by every screen that gates on authentication.
//!
//! The store holds a single [`Session`] value. It starts as
//! [`Session::Unknown`] so callers can tell "not determined yet" apart from
//! "logged out". The only update is [`Action::SetSession`], which replaces the
//! value wholesale and then notifies every subscriber synchronously, once, in
//! subscription order. Nothing is persisted; after a restart the auth listener
//! has to rehydrate the store.

use secrecy::SecretString;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::debug;

/// Identity of the logged in operator.
#[derive(Clone)]
pub struct User {
    pub uid: String,
    pub phone_number: String,
    pub id_token: SecretString,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("uid", &self.uid)
            .field("phone_number", &self.phone_number)
            .field("id_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, Debug, Default)]
pub enum Session {
    /// Not determined yet; screens show a loader.
    #[default]
    Unknown,
    /// Determined to be logged out.
    Anonymous,
    User(User),
}

impl Session {
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::User(user) => Some(user),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AppState {
    pub session: Session,
}

#[derive(Debug)]
pub enum Action {
    SetSession(Session),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&AppState) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(SubscriptionId, Listener)>,
}

#[derive(Default)]
struct Inner {
    state: RwLock<AppState>,
    listeners: Mutex<Listeners>,
}

/// Cheaply cloneable handle; clones share the same state and subscribers.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the whole state.
    #[must_use]
    pub fn state(&self) -> AppState {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn session(&self) -> Session {
        self.state().session
    }

    /// Applies an update and notifies subscribers with the new state.
    pub fn dispatch(&self, action: Action) {
        let snapshot = {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);

            match action {
                Action::SetSession(session) => state.session = session,
            }

            state.clone()
        };

        debug!(
            authenticated = snapshot.session.user().is_some(),
            "session updated"
        );

        // Listeners may read the store or unsubscribe, so no lock is held here.
        let listeners: Vec<Listener> = self
            .listeners()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(&snapshot);
        }
    }

    pub fn set_session(&self, session: Session) {
        self.dispatch(Action::SetSession(session));
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&AppState) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners();
        let id = SubscriptionId(listeners.next_id);
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        id
    }

    /// Returns `false` if the subscription was already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners();
        let before = listeners.entries.len();
        listeners.entries.retain(|(entry, _)| *entry != id);
        listeners.entries.len() != before
    }

    fn listeners(&self) -> MutexGuard<'_, Listeners> {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
