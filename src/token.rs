use crate::client::Client;
use crate::error::AuthError;
use crate::Error;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// Tokens closer than this to their expiry are treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Account and application credentials for the password grant.
///
/// Only "script" type applications may use the password grant.
#[derive(Clone)]
pub struct Credentials {
    /// Reddit username.
    pub username: String,
    /// Reddit password.
    pub password: String,
    /// Application client ID.
    pub client_id: String,
    /// Application client secret.
    pub client_secret: String,
    /// Identifying user agent. Overrides the one set with
    /// [`Client::with_user_agent`][`crate::Client::with_user_agent`].
    pub user_agent: Option<String>,
}

impl Credentials {
    /// Creates credentials with no user agent override.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Credentials {
        Credentials {
            username: username.into(),
            password: password.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            user_agent: None,
        }
    }

    /// Reads `REDDIT_USERNAME`, `REDDIT_PASSWORD`, `REDDIT_CLIENT_ID`, `REDDIT_CLIENT_SECRET`
    /// and the optional `REDDIT_USER_AGENT` from the environment.
    pub fn from_env() -> Result<Credentials, Error> {
        fn var(name: &'static str) -> Result<String, Error> {
            std::env::var(name).map_err(|_| Error::MissingVar(name))
        }

        Ok(Credentials {
            username: var("REDDIT_USERNAME")?,
            password: var("REDDIT_PASSWORD")?,
            client_id: var("REDDIT_CLIENT_ID")?,
            client_secret: var("REDDIT_CLIENT_SECRET")?,
            user_agent: std::env::var("REDDIT_USER_AGENT").ok(),
        })
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("client_id", &self.client_id)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

/// A bearer token returned by the password grant.
#[derive(Clone)]
pub struct Token {
    pub(crate) access_token: String,
    pub(crate) expires_at: Option<DateTime<Utc>>,
}

impl Token {
    /// When the token expires, if the provider said so.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns true if the token expires within the next minute. Tokens without a known
    /// expiry never expire.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |at| {
            at.checked_sub_signed(Duration::seconds(EXPIRY_MARGIN_SECS))
                .map_or(true, |deadline| deadline <= Utc::now())
        })
    }
}

impl Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Runs the password grant once. Never retries.
pub(crate) async fn fetch(client: &Client, credentials: &Credentials) -> Result<Token, Error> {
    let body = client
        .auth_post("api/v1/access_token")
        .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
        .form(&TokenRequest {
            grant_type: "password",
            username: &credentials.username,
            password: &credentials.password,
        })
        .send()
        .await?
        .bytes()
        .await?;

    let token = parse_token_response(&body, Utc::now())?;
    tracing::info!(expires_at = ?token.expires_at, "access token acquired");
    Ok(token)
}

/// The provider reports failures in the body, sometimes alongside a non-success status, so the
/// status is not consulted.
fn parse_token_response(body: &[u8], now: DateTime<Utc>) -> Result<Token, AuthError> {
    let response: TokenResponse = serde_json::from_slice(body).map_err(AuthError::Malformed)?;
    if let Some(error) = response.error {
        return Err(AuthError::Rejected(match error {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        }));
    }
    let access_token = response
        .access_token
        .ok_or(AuthError::MissingAccessToken)?;
    Ok(Token {
        access_token,
        expires_at: response.expires_in.and_then(|secs| expiry(now, secs)),
    })
}

/// Lifetimes too large to represent are treated as having no known expiry.
fn expiry(now: DateTime<Utc>, expires_in: u64) -> Option<DateTime<Utc>> {
    let lifetime = Duration::from_std(std::time::Duration::from_secs(expires_in)).ok()?;
    now.checked_add_signed(lifetime)
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<serde_json::Value>,
}
