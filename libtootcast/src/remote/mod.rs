//! Capability interfaces to the remote service
//!
//! The session state machine and the status client only talk to the instance
//! through these traits, so they can be exercised with [`mock::MockBackend`]
//! without network access. [`mastodon::MastodonBackend`] is the real
//! implementation.
//!
//! All calls are blocking. Implementations report failures as [`RemoteError`];
//! callers decide what a failure means for the session.

use reqwest::Url;
use secrecy::SecretString;

use crate::error::RemoteError;
use crate::session::Session;
use crate::types::{NewStatus, Scope, Status, StatusFilter, StatusId};

pub mod mastodon;

// Mock backend is available for all builds (not just tests) to support integration tests
pub mod mock;

/// Application credentials issued by the instance at registration
#[derive(Clone, PartialEq, Eq)]
pub struct Registration {
    /// Identifier of the registered application, if the instance reports one
    pub client_id: Option<String>,
    pub client_key: String,
    pub client_secret: String,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("client_id", &self.client_id)
            .field("client_key", &self.client_key)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// OAuth application registration and login
pub trait AuthClient {
    /// Register this application with the instance
    fn register_application(
        &self,
        base_url: &Url,
        app_name: &str,
        scopes: &[Scope],
    ) -> Result<Registration, RemoteError>;

    /// Exchange application and user credentials for an access token
    fn login(
        &self,
        base_url: &Url,
        client_key: &str,
        client_secret: &str,
        username: &str,
        password: &SecretString,
        scopes: &[Scope],
    ) -> Result<String, RemoteError>;
}

/// Status operations on an authenticated session
pub trait StatusApi {
    /// Publish a status and return its identifier
    fn post_status(&self, session: &Session, status: &NewStatus) -> Result<StatusId, RemoteError>;

    /// Fetch statuses of the authenticated account
    fn fetch_statuses(
        &self,
        session: &Session,
        filter: &StatusFilter,
    ) -> Result<Vec<Status>, RemoteError>;
}

impl<T: AuthClient + ?Sized> AuthClient for &T {
    fn register_application(
        &self,
        base_url: &Url,
        app_name: &str,
        scopes: &[Scope],
    ) -> Result<Registration, RemoteError> {
        (**self).register_application(base_url, app_name, scopes)
    }

    fn login(
        &self,
        base_url: &Url,
        client_key: &str,
        client_secret: &str,
        username: &str,
        password: &SecretString,
        scopes: &[Scope],
    ) -> Result<String, RemoteError> {
        (**self).login(base_url, client_key, client_secret, username, password, scopes)
    }
}

impl<T: StatusApi + ?Sized> StatusApi for &T {
    fn post_status(&self, session: &Session, status: &NewStatus) -> Result<StatusId, RemoteError> {
        (**self).post_status(session, status)
    }

    fn fetch_statuses(
        &self,
        session: &Session,
        filter: &StatusFilter,
    ) -> Result<Vec<Status>, RemoteError> {
        (**self).fetch_statuses(session, filter)
    }
}
