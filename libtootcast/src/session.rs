//! Credential state machine
//!
//! Every construction re-reads the document and classifies it:
//!
//! | State           | Condition                              | Action                       |
//! |-----------------|----------------------------------------|------------------------------|
//! | `NoInstance`    | `base_url` missing or malformed        | configuration error          |
//! | `Unregistered`  | no `client_key`/`client_secret`        | register application, save   |
//! | `Registered`    | application credentials, no token      | log in, save                 |
//! | `Authenticated` | `access_token` present                 | ready, no network call       |
//!
//! Transitions only move forward and each one is saved before the next starts, so
//! an interrupted bootstrap resumes where it stopped. A token the instance later
//! rejects is never replaced automatically; see [`SessionManager::reset_login`].

use std::fmt;

use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::config::{ConfigDocument, APPLICATION_NAME};
use crate::error::{AuthStep, ConfigError, RemoteError, RemoteErrorKind, Result, TootcastError};
use crate::remote::AuthClient;
use crate::store::ConfigStore;
use crate::types::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    NoInstance,
    Unregistered,
    Registered,
    Authenticated,
}

impl CredentialState {
    /// Classify a structurally valid document
    pub fn classify(document: &ConfigDocument) -> Self {
        if document.base_url().is_err() {
            CredentialState::NoInstance
        } else if document.access_token().is_some() {
            CredentialState::Authenticated
        } else if document.has_app_credentials() {
            CredentialState::Registered
        } else {
            CredentialState::Unregistered
        }
    }
}

impl fmt::Display for CredentialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CredentialState::NoInstance => "no instance",
            CredentialState::Unregistered => "unregistered",
            CredentialState::Registered => "registered",
            CredentialState::Authenticated => "authenticated",
        };
        f.write_str(label)
    }
}

/// User credentials for the login step
///
/// The password is never written to the config document.
pub struct LoginCredentials {
    /// Falls back to `user.username` from the document when absent
    pub username: Option<String>,
    pub password: SecretString,
}

impl LoginCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: SecretString::from(password.into()),
        }
    }

    /// Password only; the username comes from the document
    pub fn password_only(password: impl Into<String>) -> Self {
        Self {
            username: None,
            password: SecretString::from(password.into()),
        }
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// An authenticated session against one instance
pub struct Session {
    base_url: Url,
    access_token: SecretString,
}

impl Session {
    pub fn new(base_url: Url, access_token: impl Into<String>) -> Self {
        Self {
            base_url,
            access_token: SecretString::from(access_token.into()),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url.as_str())
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Drives a document through the credential state machine
pub struct SessionManager<'a, A> {
    store: &'a ConfigStore,
    auth: A,
    app_name: String,
    scopes: Vec<Scope>,
}

impl<'a, A: AuthClient> SessionManager<'a, A> {
    pub fn new(store: &'a ConfigStore, auth: A) -> Self {
        Self {
            store,
            auth,
            app_name: APPLICATION_NAME.to_string(),
            scopes: Scope::DEFAULT.to_vec(),
        }
    }

    /// Name the application registers under
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Scopes requested at registration and login
    pub fn scopes(mut self, scopes: &[Scope]) -> Self {
        self.scopes = scopes.to_vec();
        self
    }

    /// Advance the document until it is authenticated
    ///
    /// Returns the final document together with the session. An already
    /// authenticated document is returned as-is without any remote call.
    ///
    /// # Errors
    ///
    /// - `ConfigError::NoInstance` if the instance URL is missing or malformed
    /// - `AuthFailed` if registration or login fails; the stored document keeps
    ///   its previous state
    /// - `CredentialsRequired` if login is needed but no password (or username)
    ///   was supplied
    pub fn establish(
        &self,
        document: ConfigDocument,
        login: Option<&LoginCredentials>,
    ) -> Result<(ConfigDocument, Session)> {
        let mut document = document.normalized();
        document.validate(self.store.path())?;
        let base_url = document.base_url()?;

        loop {
            let state = CredentialState::classify(&document);
            debug!(%state, base_url = %base_url, "Classified credential state");

            document = match state {
                CredentialState::NoInstance => {
                    return Err(ConfigError::NoInstance {
                        reason: "instance.base_url is not usable".to_string(),
                    }
                    .into())
                }
                CredentialState::Unregistered => self.register(&document, &base_url)?,
                CredentialState::Registered => self.login(&document, &base_url, login)?,
                CredentialState::Authenticated => {
                    let token = document.access_token().unwrap_or_default().to_string();
                    let session = Session::new(base_url, token);
                    return Ok((document, session));
                }
            };
        }
    }

    /// Drop the stored access token so the next run logs in again
    ///
    /// This is an explicit operator action for a token the instance no longer
    /// accepts. It is never triggered by a failed API call.
    pub fn reset_login(&self, document: ConfigDocument) -> Result<ConfigDocument> {
        let mut document = document.normalized();
        if document.user.access_token.take().is_some() {
            self.store.save(&document)?;
            info!("Removed stored access token; login is required on the next run");
        }
        Ok(document)
    }

    fn register(&self, document: &ConfigDocument, base_url: &Url) -> Result<ConfigDocument> {
        info!(base_url = %base_url, app_name = %self.app_name, "Registering application");

        let registration = self
            .auth
            .register_application(base_url, &self.app_name, &self.scopes)
            .map_err(|source| auth_failed(AuthStep::Register, source))?;

        if registration.client_key.trim().is_empty()
            || registration.client_secret.trim().is_empty()
        {
            return Err(auth_failed(
                AuthStep::Register,
                RemoteError::new(
                    RemoteErrorKind::Protocol,
                    "instance returned empty application credentials",
                ),
            ));
        }

        let mut next = document.clone();
        if registration.client_id.is_some() {
            next.application.client_id = registration.client_id;
        }
        next.instance.client_key = Some(registration.client_key);
        next.instance.client_secret = Some(registration.client_secret);

        self.store.save(&next)?;
        info!("Application registered and saved");
        Ok(next)
    }

    fn login(
        &self,
        document: &ConfigDocument,
        base_url: &Url,
        login: Option<&LoginCredentials>,
    ) -> Result<ConfigDocument> {
        let login = login.ok_or(TootcastError::CredentialsRequired)?;
        let username = login
            .username
            .as_deref()
            .or(document.user.username.as_deref())
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(TootcastError::CredentialsRequired)?;

        // Registered state guarantees both halves are present
        let (client_key, client_secret) = match (
            document.instance.client_key.as_deref(),
            document.instance.client_secret.as_deref(),
        ) {
            (Some(key), Some(secret)) => (key, secret),
            _ => {
                return Err(ConfigError::Invalid {
                    path: self.store.path().to_path_buf(),
                    reason: "application credentials are incomplete".to_string(),
                }
                .into())
            }
        };

        info!(base_url = %base_url, username = %username, "Logging in");

        let token = self
            .auth
            .login(
                base_url,
                client_key,
                client_secret,
                username,
                &login.password,
                &self.scopes,
            )
            .map_err(|source| auth_failed(AuthStep::Login, source))?;

        if token.trim().is_empty() {
            return Err(auth_failed(
                AuthStep::Login,
                RemoteError::new(RemoteErrorKind::Protocol, "instance returned an empty access token"),
            ));
        }

        let mut next = document.clone();
        next.user.access_token = Some(token);

        self.store.save(&next)?;
        info!("Logged in and saved access token");
        Ok(next)
    }
}

fn auth_failed(step: AuthStep, source: RemoteError) -> TootcastError {
    TootcastError::AuthFailed { step, source }
}
