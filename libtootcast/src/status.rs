//! Status operations on an authenticated session
//!
//! `StatusClient` is a thin layer over [`StatusApi`]: it checks input, applies
//! the document defaults and turns remote failures into the error taxonomy. A
//! rejected token surfaces as `SessionExpired`; nothing here ever re-registers
//! or logs in again.

use std::vec;

use tracing::debug;

use crate::config::DefaultsSection;
use crate::error::{RemoteError, RemoteErrorKind, Result, TootcastError};
use crate::remote::StatusApi;
use crate::session::Session;
use crate::types::{NewStatus, Status, StatusFilter, StatusId};

pub struct StatusClient<S> {
    session: Session,
    api: S,
    defaults: DefaultsSection,
}

impl<S: StatusApi> StatusClient<S> {
    pub fn new(session: Session, api: S) -> Self {
        Self {
            session,
            api,
            defaults: DefaultsSection::default(),
        }
    }

    /// Use the visibility, language and fetch limit from the config document
    pub fn with_defaults(mut self, defaults: DefaultsSection) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn api(&self) -> &S {
        &self.api
    }

    /// Publish a plain text status
    pub fn post_status(&self, text: &str) -> Result<StatusId> {
        self.post(&NewStatus::new(text))
    }

    /// Publish a status with reply, visibility, language or content warning
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for empty or whitespace-only text (no remote call is made)
    /// - `SessionExpired` if the instance rejects the access token
    /// - `RemoteRejected` if the instance refuses the content or rate-limits
    /// - `RemoteUnavailable` on transport failure
    pub fn post(&self, status: &NewStatus) -> Result<StatusId> {
        if status.text.trim().is_empty() {
            return Err(TootcastError::InvalidInput(
                "Status text cannot be empty".to_string(),
            ));
        }

        let mut status = status.clone();
        if status.visibility.is_none() {
            status.visibility = self.defaults.visibility;
        }
        if status.language.is_none() {
            status.language = self.defaults.language.clone();
        }

        let id = self
            .api
            .post_status(&self.session, &status)
            .map_err(map_remote_error)?;

        debug!(status_id = %id, "Posted status");
        Ok(id)
    }

    /// Lazy query over the account's statuses
    ///
    /// Nothing is requested until the query is run or iterated, and every run
    /// queries the instance again.
    pub fn fetch_statuses(&self, filter: StatusFilter) -> StatusQuery<'_, S> {
        StatusQuery {
            client: self,
            filter,
        }
    }

    /// Query with the default filter and the configured fetch limit
    pub fn recent_statuses(&self) -> StatusQuery<'_, S> {
        let mut filter = StatusFilter::default();
        if let Some(limit) = self.defaults.fetch_limit {
            filter.limit = limit;
        }
        self.fetch_statuses(filter)
    }
}

/// A restartable status query
pub struct StatusQuery<'a, S> {
    client: &'a StatusClient<S>,
    filter: StatusFilter,
}

impl<'a, S: StatusApi> StatusQuery<'a, S> {
    pub fn filter(&self) -> &StatusFilter {
        &self.filter
    }

    /// Run the query now
    pub fn fetch(&self) -> Result<Vec<Status>> {
        let statuses = self
            .client
            .api
            .fetch_statuses(&self.client.session, &self.filter)
            .map_err(map_remote_error)?;

        debug!(count = statuses.len(), "Fetched statuses");
        Ok(statuses)
    }

    /// Iterate the results, querying on the first call to `next`
    ///
    /// A failed query yields its error once and then ends.
    pub fn iter(&self) -> StatusIter<'_, 'a, S> {
        StatusIter {
            query: self,
            state: IterState::Pending,
        }
    }
}

impl<'q, 'a, S: StatusApi> IntoIterator for &'q StatusQuery<'a, S> {
    type Item = Result<Status>;
    type IntoIter = StatusIter<'q, 'a, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct StatusIter<'q, 'a, S> {
    query: &'q StatusQuery<'a, S>,
    state: IterState,
}

enum IterState {
    Pending,
    Ready(vec::IntoIter<Status>),
    Done,
}

impl<S: StatusApi> Iterator for StatusIter<'_, '_, S> {
    type Item = Result<Status>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.state {
                IterState::Pending => match self.query.fetch() {
                    Ok(statuses) => self.state = IterState::Ready(statuses.into_iter()),
                    Err(e) => {
                        self.state = IterState::Done;
                        return Some(Err(e));
                    }
                },
                IterState::Ready(statuses) => return statuses.next().map(Ok),
                IterState::Done => return None,
            }
        }
    }
}

fn map_remote_error(error: RemoteError) -> TootcastError {
    match error.kind {
        RemoteErrorKind::Unauthorized => TootcastError::SessionExpired(error),
        RemoteErrorKind::Unavailable => TootcastError::RemoteUnavailable(error),
        RemoteErrorKind::Rejected | RemoteErrorKind::RateLimited | RemoteErrorKind::Protocol => {
            TootcastError::RemoteRejected(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::{MockBackend, MockCall};
    use crate::types::Visibility;
    use reqwest::Url;

    fn client(backend: &MockBackend) -> StatusClient<&MockBackend> {
        let session = Session::new(Url::parse("https://example.social/").unwrap(), "token1");
        StatusClient::new(session, backend)
    }

    #[test]
    fn test_post_status_delegates() {
        let backend = MockBackend::default();
        let id = client(&backend).post_status("hello").unwrap();

        assert_eq!(id.as_str(), "mock-1");
        assert_eq!(
            backend.calls(),
            vec![MockCall::Post {
                access_token: "token1".to_string(),
                text: "hello".to_string(),
            }]
        );
    }

    #[test]
    fn test_post_empty_text_is_rejected_locally() {
        let backend = MockBackend::default();

        let result = client(&backend).post_status("  \n ");

        assert!(matches!(result, Err(TootcastError::InvalidInput(_))));
        assert_eq!(backend.post_call_count(), 0);
    }

    #[test]
    fn test_remote_error_mapping() {
        let cases = [
            (RemoteError::unauthorized("x"), "SessionExpired"),
            (RemoteError::unavailable("x"), "RemoteUnavailable"),
            (RemoteError::rejected("x"), "RemoteRejected"),
            (
                RemoteError::new(RemoteErrorKind::RateLimited, "x"),
                "RemoteRejected",
            ),
        ];

        for (error, expected) in cases {
            let mapped = format!("{:?}", map_remote_error(error));
            assert!(mapped.starts_with(expected), "{} vs {}", mapped, expected);
        }
    }

    #[test]
    fn test_defaults_fill_unset_fields() {
        let backend = MockBackend::default();
        let client = client(&backend).with_defaults(DefaultsSection {
            visibility: Some(Visibility::Unlisted),
            language: Some("en".to_string()),
            fetch_limit: Some(3),
            ..Default::default()
        });

        client.post(&NewStatus::new("hi")).unwrap();
        assert_eq!(client.recent_statuses().filter().limit, 3);
    }

    #[test]
    fn test_query_is_lazy() {
        let backend = MockBackend::default().with_statuses(vec![MockBackend::status("1", "one")]);
        let client = client(&backend);

        let query = client.fetch_statuses(StatusFilter::default());
        assert_eq!(backend.fetch_call_count(), 0);

        let mut iter = query.iter();
        assert_eq!(backend.fetch_call_count(), 0);
        assert!(iter.next().unwrap().is_ok());
        assert!(iter.next().is_none());
        assert_eq!(backend.fetch_call_count(), 1);
    }

    #[test]
    fn test_query_restarts_on_each_iteration() {
        let backend = MockBackend::default().with_statuses(vec![
            MockBackend::status("1", "one"),
            MockBackend::status("2", "two"),
        ]);
        let client = client(&backend);
        let query = client.fetch_statuses(StatusFilter::default());

        let first: Vec<_> = query.iter().collect::<Result<_>>().unwrap();
        let second: Vec<_> = (&query).into_iter().collect::<Result<_>>().unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(backend.fetch_call_count(), 2);
    }

    #[test]
    fn test_failed_query_yields_error_once() {
        let backend = MockBackend::default().with_fetch_error(RemoteError::unavailable("down"));
        let client = client(&backend);
        let query = client.fetch_statuses(StatusFilter::default());

        let mut iter = query.iter();
        assert!(matches!(
            iter.next(),
            Some(Err(TootcastError::RemoteUnavailable(_)))
        ));
        assert!(iter.next().is_none());
    }
}
