//! Tootcast - scriptable posting to Mastodon-compatible instances
//!
//! This library keeps the OAuth credential lifecycle in a hand-editable config
//! document and exposes status posting and fetching once a session is
//! authenticated. The first run registers the application and logs in; later
//! runs resume from the stored credentials without any extra remote call.

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod remote;
pub mod session;
pub mod status;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use client::{ClientOptions, TootClient};
pub use config::ConfigDocument;
pub use error::{ConfigError, RemoteError, Result, TootcastError};
pub use session::{CredentialState, LoginCredentials, Session, SessionManager};
pub use status::StatusClient;
pub use store::ConfigStore;
pub use types::{NewStatus, Status, StatusFilter, StatusId, Visibility};
pub use reqwest::Url;
