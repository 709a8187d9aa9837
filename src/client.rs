use crate::token::{self, Credentials};
use crate::{Error, Media, Session};
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::time::Duration;

const DEFAULT_USER_AGENT: &str = concat!(
    "reddit-uploader/",
    env!("CARGO_PKG_VERSION"),
    " (media upload client)",
);

/// HTTP client.
///
/// Holds the endpoints and transport settings shared by every request. A `Client` is cheap to
/// clone; logging in with [`Client::login`] moves it into a [`Session`].
#[derive(Debug, Clone)]
pub struct Client {
    pub(crate) auth_host: Cow<'static, str>,
    pub(crate) api_host: Cow<'static, str>,
    pub(crate) user_agent: Option<String>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) default_poster: Option<Media>,
    pub(crate) client: reqwest::Client,
}

impl Client {
    /// Creates a new `Client` that authenticates against `https://www.reddit.com/` and calls
    /// the API at `https://oauth.reddit.com/`.
    #[must_use]
    #[allow(clippy::missing_panics_doc)] // tested to not panic
    pub fn new() -> Client {
        Client {
            auth_host: Cow::Borrowed("https://www.reddit.com/"),
            api_host: Cow::Borrowed("https://oauth.reddit.com/"),
            user_agent: None,
            timeout: None,
            default_poster: None,
            client: reqwest::Client::builder()
                .user_agent(DEFAULT_USER_AGENT)
                .build()
                .unwrap(),
        }
    }

    /// Sets the host used for the OAuth token exchange.
    #[must_use]
    pub fn with_auth_host(mut self, host: String) -> Client {
        self.auth_host = Cow::Owned(with_trailing_slash(host));
        self
    }

    /// Sets the host used for the media lease and submission endpoints.
    #[must_use]
    pub fn with_api_host(mut self, host: String) -> Client {
        self.api_host = Cow::Owned(with_trailing_slash(host));
        self
    }

    /// Sets the `User-Agent` sent with every request.
    ///
    /// Reddit rejects generic user agents; use something like
    /// `platform:app-id:version (by /u/username)`.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: String) -> Client {
        self.user_agent = Some(user_agent);
        self
    }

    /// Sets a deadline for each request. Requests that exceed it fail with [`Error::Timeout`].
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Client {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the poster image uploaded for video posts submitted without one.
    #[must_use]
    pub fn with_default_poster(mut self, poster: Media) -> Client {
        self.default_poster = Some(poster);
        self
    }

    /// Exchanges the credentials for an access token, returning a [`Session`].
    ///
    /// A user agent carried in the credentials replaces the one set on this client.
    #[tracing::instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(mut self, credentials: Credentials) -> Result<Session, Error> {
        if let Some(user_agent) = &credentials.user_agent {
            self.user_agent = Some(user_agent.clone());
        }
        let token = token::fetch(&self, &credentials).await?;
        Ok(Session {
            client: self,
            credentials,
            token,
        })
    }

    /// POST to the OAuth host.
    pub(crate) fn auth_post(&self, path: &str) -> RequestBuilder {
        tracing::info!(path, "Client::auth_post");
        self.post_url(&format!("{}{}", self.auth_host, path))
    }

    /// Bearer-authenticated POST to the API host.
    pub(crate) fn api_post(&self, path: &str, access_token: &str) -> RequestBuilder {
        tracing::info!(path, "Client::api_post");
        self.post_url(&format!("{}{}", self.api_host, path))
            .header(AUTHORIZATION, format!("Bearer {}", access_token))
    }

    /// Unauthenticated POST to an absolute URL.
    pub(crate) fn post_url(&self, url: &str) -> RequestBuilder {
        let mut request = self.client.post(url);
        if let Some(user_agent) = &self.user_agent {
            request = request.header(USER_AGENT, user_agent);
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        request
    }
}

impl Default for Client {
    fn default() -> Client {
        Client::new()
    }
}

fn with_trailing_slash(mut host: String) -> String {
    if !host.ends_with('/') {
        host.push('/');
    }
    host
}

/// Reads the whole body and decodes it into a typed response, so that shape mismatches surface
/// as [`Error::Decode`] rather than as transport errors.
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
