//! Mastodon backend
//!
//! Implements the remote capability traits against a Mastodon-compatible
//! instance using the megalodon library. Megalodon does not expose the OAuth
//! password grant, so login posts to `/oauth/token` directly with reqwest.
//!
//! The library API is blocking: every call runs to completion on a
//! current-thread tokio runtime owned by the backend. Do not call it from
//! inside another tokio runtime.

use megalodon::entities::StatusVisibility;
use megalodon::megalodon::{
    AppInputOptions, GetAccountStatusesInputOptions, PostStatusInputOptions, PostStatusOutput,
};
use megalodon::{Megalodon, SNS};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::runtime::Runtime;
use tracing::debug;

use crate::config::APPLICATION_NAME;
use crate::error::{RemoteError, RemoteErrorKind};
use crate::remote::{AuthClient, Registration, StatusApi};
use crate::session::Session;
use crate::types::{NewStatus, Scope, Status, StatusFilter, StatusId, Visibility};

/// Redirect URI for applications that never use the authorization-code flow
const OUT_OF_BAND_REDIRECT: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Remote backend talking to a real instance
pub struct MastodonBackend {
    runtime: Runtime,
    http: reqwest::Client,
    user_agent: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl MastodonBackend {
    /// Create a backend identifying itself with the application name
    pub fn new() -> Result<Self, RemoteError> {
        Self::with_user_agent(APPLICATION_NAME)
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self, RemoteError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RemoteError::unavailable(format!("Failed to start I/O runtime: {}", e)))?;

        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| RemoteError::unavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            runtime,
            http,
            user_agent: user_agent.to_string(),
        })
    }

    fn client(
        &self,
        base_url: &Url,
        access_token: Option<String>,
    ) -> Result<Box<dyn Megalodon + Send + Sync>, RemoteError> {
        megalodon::generator(
            SNS::Mastodon,
            instance_root(base_url),
            access_token,
            Some(self.user_agent.clone()),
        )
        .map_err(|e| map_megalodon_error(e, "create client"))
    }

    async fn request_token(
        &self,
        base_url: &Url,
        form: &[(&str, &str)],
    ) -> Result<String, RemoteError> {
        let endpoint = base_url
            .join("oauth/token")
            .map_err(|e| RemoteError::rejected(format!("Invalid token endpoint: {}", e)))?;

        let response = self
            .http
            .post(endpoint)
            .form(form)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, "login"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::from_http_status(
                status.as_u16(),
                format!("login returned HTTP {}: {}", status.as_u16(), body.trim()),
            ));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            RemoteError::new(
                RemoteErrorKind::Protocol,
                format!("Unexpected token response: {}", e),
            )
        })?;

        Ok(token.access_token)
    }
}

impl AuthClient for MastodonBackend {
    fn register_application(
        &self,
        base_url: &Url,
        app_name: &str,
        scopes: &[Scope],
    ) -> Result<Registration, RemoteError> {
        let client = self.client(base_url, None)?;
        let options = AppInputOptions {
            scopes: Some(scopes.iter().map(|s| s.as_str().to_string()).collect()),
            redirect_uris: Some(OUT_OF_BAND_REDIRECT.to_string()),
            ..Default::default()
        };

        let app = self
            .runtime
            .block_on(client.register_app(app_name.to_string(), &options))
            .map_err(|e| map_megalodon_error(e, "register application"))?;

        debug!(app_id = %app.id, "Instance accepted application registration");

        Ok(Registration {
            client_id: Some(app.id).filter(|id| !id.is_empty()),
            client_key: app.client_id,
            client_secret: app.client_secret,
        })
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
        let scope = Scope::join(scopes);
        let form = [
            ("grant_type", "password"),
            ("client_id", client_key),
            ("client_secret", client_secret),
            ("username", username),
            ("password", password.expose_secret()),
            ("scope", scope.as_str()),
        ];

        self.runtime.block_on(self.request_token(base_url, &form))
    }
}

impl StatusApi for MastodonBackend {
    fn post_status(&self, session: &Session, status: &NewStatus) -> Result<StatusId, RemoteError> {
        let client = self.client(session.base_url(), Some(session.access_token().to_string()))?;
        let options = PostStatusInputOptions {
            in_reply_to_id: status.in_reply_to_id.as_ref().map(|id| id.0.clone()),
            visibility: status.visibility.map(to_megalodon_visibility),
            language: status.language.clone(),
            spoiler_text: status.spoiler_text.clone(),
            ..Default::default()
        };

        let response = self
            .runtime
            .block_on(client.post_status(status.text.clone(), Some(&options)))
            .map_err(|e| map_megalodon_error(e, "post status"))?;

        let id = match response.json {
            PostStatusOutput::Status(status) => status.id,
            PostStatusOutput::ScheduledStatus(scheduled) => scheduled.id,
        };

        Ok(StatusId(id))
    }

    fn fetch_statuses(
        &self,
        session: &Session,
        filter: &StatusFilter,
    ) -> Result<Vec<Status>, RemoteError> {
        let client = self.client(session.base_url(), Some(session.access_token().to_string()))?;

        self.runtime.block_on(async {
            let account = client
                .verify_account_credentials()
                .await
                .map_err(|e| map_megalodon_error(e, "verify credentials"))?;

            let options = GetAccountStatusesInputOptions {
                limit: Some(filter.limit),
                pinned: Some(filter.pinned),
                exclude_replies: Some(filter.exclude_replies),
                exclude_reblogs: Some(filter.exclude_reblogs),
                only_media: Some(false),
                ..Default::default()
            };

            let response = client
                .get_account_statuses(account.json.id, Some(&options))
                .await
                .map_err(|e| map_megalodon_error(e, "fetch statuses"))?;

            Ok::<_, RemoteError>(response.json.into_iter().map(from_megalodon_status).collect())
        })
    }
}

/// Megalodon appends API paths to the base URL, so drop the trailing slash
fn instance_root(base_url: &Url) -> String {
    base_url.as_str().trim_end_matches('/').to_string()
}

fn to_megalodon_visibility(visibility: Visibility) -> StatusVisibility {
    match visibility {
        Visibility::Public => StatusVisibility::Public,
        Visibility::Unlisted => StatusVisibility::Unlisted,
        Visibility::Private => StatusVisibility::Private,
        Visibility::Direct => StatusVisibility::Direct,
    }
}

fn from_megalodon_visibility(visibility: &StatusVisibility) -> Visibility {
    match visibility {
        StatusVisibility::Unlisted => Visibility::Unlisted,
        StatusVisibility::Private => Visibility::Private,
        StatusVisibility::Direct => Visibility::Direct,
        _ => Visibility::Public,
    }
}

fn from_megalodon_status(status: megalodon::entities::Status) -> Status {
    Status {
        visibility: from_megalodon_visibility(&status.visibility),
        id: StatusId(status.id),
        uri: status.uri,
        url: status.url,
        account: status.account.acct,
        content: status.content,
        created_at: status.created_at,
        in_reply_to_id: status.in_reply_to_id.map(StatusId),
        language: status.language,
        spoiler_text: status.spoiler_text,
        replies_count: status.replies_count as u32,
        reblogs_count: status.reblogs_count as u32,
        favourites_count: status.favourites_count as u32,
    }
}

/// Map megalodon errors to RemoteError
///
/// HTTP errors carry their status code, which decides the kind. Transport
/// failures without a response are `Unavailable`; undecodable responses are
/// `Protocol`.
fn map_megalodon_error(error: megalodon::error::Error, context: &str) -> RemoteError {
    use megalodon::error::Error;

    let message = format!("Mastodon {} failed: {}", context, error);
    match &error {
        Error::OwnError(own) => match own.status {
            Some(status) => RemoteError::from_http_status(status, message),
            None => RemoteError::unavailable(message),
        },
        Error::RequestError(request) => match request.status() {
            Some(status) => RemoteError::from_http_status(status.as_u16(), message),
            None => RemoteError::unavailable(message),
        },
        Error::JsonError(_) | Error::ParseError(_) => {
            RemoteError::new(RemoteErrorKind::Protocol, message)
        }
        _ => RemoteError::unavailable(message),
    }
}

fn map_reqwest_error(error: reqwest::Error, context: &str) -> RemoteError {
    let message = format!("{} failed: {}", context, error);
    match error.status() {
        Some(status) => RemoteError::from_http_status(status.as_u16(), message),
        None if error.is_decode() => RemoteError::new(RemoteErrorKind::Protocol, message),
        None => RemoteError::unavailable(message),
    }
}
