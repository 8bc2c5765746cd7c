//! Core types for Tootcast

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier the remote service assigned to a status
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusId(pub String);

impl StatusId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for StatusId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Who can see a status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Unlisted,
    Private,
    Direct,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::Private => "private",
            Visibility::Direct => "direct",
        }
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "unlisted" => Ok(Visibility::Unlisted),
            "private" => Ok(Visibility::Private),
            "direct" => Ok(Visibility::Direct),
            _ => Err(format!(
                "Invalid visibility: '{}'. Valid options: public, unlisted, private, direct",
                s
            )),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OAuth scope requested at registration and login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Read,
    Write,
    Follow,
    Push,
}

impl Scope {
    /// Scopes needed to read and post statuses
    pub const DEFAULT: [Scope; 2] = [Scope::Read, Scope::Write];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Read => "read",
            Scope::Write => "write",
            Scope::Follow => "follow",
            Scope::Push => "push",
        }
    }

    /// Space-separated scope string as used by OAuth requests
    pub fn join(scopes: &[Scope]) -> String {
        scopes
            .iter()
            .map(Scope::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStatus {
    pub text: String,
    pub visibility: Option<Visibility>,
    pub in_reply_to_id: Option<StatusId>,
    pub language: Option<String>,
    /// Content warning shown before the text
    pub spoiler_text: Option<String>,
}

impl NewStatus {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            visibility: None,
            in_reply_to_id: None,
            language: None,
            spoiler_text: None,
        }
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn in_reply_to(mut self, id: StatusId) -> Self {
        self.in_reply_to_id = Some(id);
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn spoiler_text(mut self, text: impl Into<String>) -> Self {
        self.spoiler_text = Some(text.into());
        self
    }
}

/// A status as returned by the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub id: StatusId,
    pub uri: String,
    pub url: Option<String>,
    /// Account handle of the author
    pub account: String,
    /// Rendered HTML content
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub visibility: Visibility,
    pub in_reply_to_id: Option<StatusId>,
    pub language: Option<String>,
    pub spoiler_text: String,
    pub replies_count: u32,
    pub reblogs_count: u32,
    pub favourites_count: u32,
}

/// Which of the account's statuses to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFilter {
    pub limit: u32,
    pub exclude_replies: bool,
    pub exclude_reblogs: bool,
    /// Only pinned statuses
    pub pinned: bool,
}

impl Default for StatusFilter {
    fn default() -> Self {
        Self {
            limit: 20,
            exclude_replies: true,
            exclude_reblogs: true,
            pinned: false,
        }
    }
}

impl StatusFilter {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }
}
