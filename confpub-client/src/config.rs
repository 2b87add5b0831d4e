//! Client configuration.

use serde::{Deserialize, Serialize};

/// Page size used by every paginated listing unless configured otherwise.
pub const DEFAULT_PAGE_LIMIT: usize = 25;

/// Connection settings for the remote content service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the service (e.g. `https://wiki.example.com`).
    pub root_url: String,
    /// User name for basic authentication. Leave empty to send the secret as
    /// a bearer token.
    pub username: Option<String>,
    /// Password, or a personal access token when no user name is set.
    #[serde(skip_serializing)]
    pub password_or_token: Option<String>,
    /// Minimum time between the starts of two requests. `None` or zero
    /// disables rate limiting.
    pub min_seconds_between_requests: Option<f64>,
    /// Batch size for paginated listings.
    pub page_limit: usize,
    /// Overall timeout per request (seconds).
    pub request_timeout_secs: u64,
    /// Connect timeout (seconds).
    pub connect_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            root_url: String::new(),
            username: None,
            password_or_token: None,
            min_seconds_between_requests: None,
            page_limit: DEFAULT_PAGE_LIMIT,
            request_timeout_secs: 60,
            connect_timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    /// Credentials derived from the configured user name and secret.
    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::from_parts(self.username.as_deref(), self.password_or_token.as_deref())
    }
}

/// How requests authenticate.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Authorization: Basic base64(username:password)`.
    Basic { username: String, password: String },
    /// `Authorization: Bearer <token>`.
    Bearer(String),
}

impl Credentials {
    /// Picks the authentication scheme from a user name and a secret.
    ///
    /// Both present selects basic authentication; a secret without a user
    /// name is a bearer token. Anything else yields no credentials.
    pub fn from_parts(username: Option<&str>, secret: Option<&str>) -> Option<Self> {
        let username = username.filter(|u| !u.is_empty());
        let secret = secret.filter(|s| !s.is_empty())?;
        Some(match username {
            Some(username) => Credentials::Basic {
                username: username.to_string(),
                password: secret.to_string(),
            },
            None => Credentials::Bearer(secret.to_string()),
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::Bearer(_) => f.debug_tuple("Bearer").field(&"<redacted>").finish(),
        }
    }
}
