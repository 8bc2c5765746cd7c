//! Mock backend for testing
//!
//! Scripted substitute for the remote service. It implements both
//! [`AuthClient`] and [`StatusApi`], records every call and never touches the
//! network, so the state machine and status client can be tested end to end.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};

use crate::error::RemoteError;
use crate::remote::{AuthClient, Registration, StatusApi};
use crate::session::Session;
use crate::types::{NewStatus, Scope, Status, StatusFilter, StatusId, Visibility};

/// Configuration for mock backend behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Result of `register_application`
    pub registration: Result<Registration, RemoteError>,

    /// Result of `login`
    pub login: Result<String, RemoteError>,

    /// Error returned by `post_status`; success otherwise
    pub post_error: Option<RemoteError>,

    /// Error returned by `fetch_statuses`; success otherwise
    pub fetch_error: Option<RemoteError>,

    /// Statuses returned by `fetch_statuses`
    pub statuses: Vec<Status>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            registration: Ok(Registration {
                client_id: None,
                client_key: "mock-key".to_string(),
                client_secret: "mock-secret".to_string(),
            }),
            login: Ok("mock-token".to_string()),
            post_error: None,
            fetch_error: None,
            statuses: Vec::new(),
        }
    }
}

/// A recorded remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Register {
        base_url: String,
        app_name: String,
        scopes: Vec<Scope>,
    },
    Login {
        base_url: String,
        client_key: String,
        username: String,
        password: String,
    },
    Post {
        access_token: String,
        text: String,
    },
    Fetch {
        access_token: String,
        limit: u32,
    },
}

/// Mock remote service
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    config: MockConfig,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockBackend {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Backend whose registration issues the given application credentials
    pub fn registering(client_key: &str, client_secret: &str) -> Self {
        Self::new(MockConfig {
            registration: Ok(Registration {
                client_id: None,
                client_key: client_key.to_string(),
                client_secret: client_secret.to_string(),
            }),
            ..Default::default()
        })
    }

    /// Replace the token returned by login
    pub fn with_token(mut self, token: &str) -> Self {
        self.config.login = Ok(token.to_string());
        self
    }

    pub fn with_registration_error(mut self, error: RemoteError) -> Self {
        self.config.registration = Err(error);
        self
    }

    pub fn with_login_error(mut self, error: RemoteError) -> Self {
        self.config.login = Err(error);
        self
    }

    pub fn with_post_error(mut self, error: RemoteError) -> Self {
        self.config.post_error = Some(error);
        self
    }

    pub fn with_fetch_error(mut self, error: RemoteError) -> Self {
        self.config.fetch_error = Some(error);
        self
    }

    pub fn with_statuses(mut self, statuses: Vec<Status>) -> Self {
        self.config.statuses = statuses;
        self
    }

    /// All calls made so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn register_call_count(&self) -> usize {
        self.count(|c| matches!(c, MockCall::Register { .. }))
    }

    pub fn login_call_count(&self) -> usize {
        self.count(|c| matches!(c, MockCall::Login { .. }))
    }

    pub fn post_call_count(&self) -> usize {
        self.count(|c| matches!(c, MockCall::Post { .. }))
    }

    pub fn fetch_call_count(&self) -> usize {
        self.count(|c| matches!(c, MockCall::Fetch { .. }))
    }

    /// Build a status record for scripted feeds
    pub fn status(id: &str, content: &str) -> Status {
        Status {
            id: StatusId(id.to_string()),
            uri: format!("https://example.social/users/mock/statuses/{}", id),
            url: Some(format!("https://example.social/@mock/{}", id)),
            account: "mock".to_string(),
            content: format!("<p>{}</p>", content),
            created_at: Utc::now(),
            visibility: Visibility::Public,
            in_reply_to_id: None,
            language: Some("en".to_string()),
            spoiler_text: String::new(),
            replies_count: 0,
            reblogs_count: 0,
            favourites_count: 0,
        }
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn count(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }
}

impl AuthClient for MockBackend {
    fn register_application(
        &self,
        base_url: &Url,
        app_name: &str,
        scopes: &[Scope],
    ) -> Result<Registration, RemoteError> {
        self.record(MockCall::Register {
            base_url: base_url.to_string(),
            app_name: app_name.to_string(),
            scopes: scopes.to_vec(),
        });
        self.config.registration.clone()
    }

    fn login(
        &self,
        base_url: &Url,
        client_key: &str,
        _client_secret: &str,
        username: &str,
        password: &SecretString,
        _scopes: &[Scope],
    ) -> Result<String, RemoteError> {
        self.record(MockCall::Login {
            base_url: base_url.to_string(),
            client_key: client_key.to_string(),
            username: username.to_string(),
            password: password.expose_secret().to_string(),
        });
        self.config.login.clone()
    }
}

impl StatusApi for MockBackend {
    fn post_status(&self, session: &Session, status: &NewStatus) -> Result<StatusId, RemoteError> {
        self.record(MockCall::Post {
            access_token: session.access_token().to_string(),
            text: status.text.clone(),
        });

        match &self.config.post_error {
            Some(error) => Err(error.clone()),
            None => Ok(StatusId(format!("mock-{}", self.post_call_count()))),
        }
    }

    fn fetch_statuses(
        &self,
        session: &Session,
        filter: &StatusFilter,
    ) -> Result<Vec<Status>, RemoteError> {
        self.record(MockCall::Fetch {
            access_token: session.access_token().to_string(),
            limit: filter.limit,
        });

        match &self.config.fetch_error {
            Some(error) => Err(error.clone()),
            None => Ok(self
                .config
                .statuses
                .iter()
                .take(filter.limit as usize)
                .cloned()
                .collect()),
        }
    }
}
