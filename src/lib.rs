//! # Identigraf (phone login and face-search client)
//!
//! `identigraf` is the client side of the Identigraf phone-number login. It
//! talks to the Identigraf HTTP API, drives a one-time-code verification
//! provider, and keeps the resulting session for the rest of the application.
//!
//! ## Login Flow
//!
//! 1. **Phone:** The entered number is normalized (digits only, country code
//!    prefixed) and checked with `POST /identigraf-auth/v2/checkphone`.
//! 2. **Challenge:** When the API knows the number, the verification provider
//!    sends a one-time code and returns a challenge handle.
//! 3. **Code:** The code is confirmed against the challenge; the verified
//!    principal yields an identity token.
//! 4. **Login:** The identity token is exchanged with
//!    `POST /identigraf-auth/v2/login`; on success the session store is set and
//!    the navigator moves to the search area.
//!
//! ## Failure Envelopes
//!
//! API calls never fail past the client boundary. Transport and decoding
//! problems become the `COMM_ERROR` envelope (status 502) and are reported to
//! the [`report::Reporter`].

pub mod api;
pub mod cli;
pub mod login;
pub mod report;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
