//! Construction entry point
//!
//! ```no_run
//! use libtootcast::{ClientOptions, TootClient};
//!
//! # fn example() -> libtootcast::Result<()> {
//! let client = TootClient::connect(ClientOptions::new())?;
//! let id = client.post_status("Hello from tootcast")?;
//! println!("Posted {}", id);
//!
//! for status in &client.fetch_statuses(Default::default()) {
//!     println!("{}", status?.content);
//! }
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{ConfigDocument, APPLICATION_NAME};
use crate::error::{Result, TootcastError};
use crate::remote::mastodon::MastodonBackend;
use crate::remote::{AuthClient, StatusApi};
use crate::session::{CredentialState, LoginCredentials, Session, SessionManager};
use crate::status::{StatusClient, StatusQuery};
use crate::store::ConfigStore;
use crate::types::{NewStatus, Scope, StatusFilter, StatusId};

/// Options for constructing a [`TootClient`]
#[derive(Debug)]
pub struct ClientOptions {
    config_dir: Option<PathBuf>,
    login: Option<LoginCredentials>,
    app_name: String,
    scopes: Vec<Scope>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            config_dir: None,
            login: None,
            app_name: APPLICATION_NAME.to_string(),
            scopes: Scope::DEFAULT.to_vec(),
        }
    }
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this directory instead of the resolved default
    pub fn config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Credentials for the login step, needed only while not yet authenticated
    pub fn login(mut self, login: LoginCredentials) -> Self {
        self.login = Some(login);
        self
    }

    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn scopes(mut self, scopes: &[Scope]) -> Self {
        self.scopes = scopes.to_vec();
        self
    }

    pub fn config_dir_override(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }
}

/// A client with an authenticated session
///
/// Constructing one loads the config document, runs whatever part of the
/// bootstrap is still missing and only then hands out status operations.
pub struct TootClient<B> {
    store: ConfigStore,
    document: ConfigDocument,
    status: StatusClient<B>,
}

impl TootClient<MastodonBackend> {
    /// Construct against the real instance
    pub fn connect(options: ClientOptions) -> Result<Self> {
        let backend = MastodonBackend::with_user_agent(&options.app_name)
            .map_err(TootcastError::RemoteUnavailable)?;
        Self::open(options, backend)
    }
}

impl<B: AuthClient + StatusApi> TootClient<B> {
    /// Construct with an explicit remote backend
    pub fn open(options: ClientOptions, backend: B) -> Result<Self> {
        let store = ConfigStore::open(options.config_dir_override())?;
        let document = store.load()?;

        let (document, session) = SessionManager::new(&store, &backend)
            .app_name(options.app_name.as_str())
            .scopes(&options.scopes)
            .establish(document, options.login.as_ref())?;

        info!(base_url = %session.base_url(), "Session ready");

        let status = StatusClient::new(session, backend).with_defaults(document.defaults.clone());
        Ok(Self {
            store,
            document,
            status,
        })
    }
}

impl<B: StatusApi> TootClient<B> {
    pub fn post_status(&self, text: &str) -> Result<StatusId> {
        self.status.post_status(text)
    }

    pub fn post(&self, status: &NewStatus) -> Result<StatusId> {
        self.status.post(status)
    }

    pub fn fetch_statuses(&self, filter: StatusFilter) -> StatusQuery<'_, B> {
        self.status.fetch_statuses(filter)
    }

    /// Query using the configured fetch limit
    pub fn recent_statuses(&self) -> StatusQuery<'_, B> {
        self.status.recent_statuses()
    }

    /// Always `Authenticated` for a constructed client
    pub fn state(&self) -> CredentialState {
        CredentialState::classify(&self.document)
    }

    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }

    pub fn session(&self) -> &Session {
        self.status.session()
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn backend(&self) -> &B {
        self.status.api()
    }
}
