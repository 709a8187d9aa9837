use crate::error::SubmitError;
use crate::token::{self, Credentials, Token};
use crate::{Client, Error, Kind, Media, MediaUrl, Submission, Submitted};

/// Logged-in session.
///
/// Holds the credentials it was created with and the current bearer token. Every request made
/// through a session carries that token. [`Session::refresh`] replaces the token as a whole,
/// and needs `&mut self`, so callers sharing a session across tasks must serialize refreshes
/// themselves.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) client: Client,
    pub(crate) credentials: Credentials,
    pub(crate) token: Token,
}

impl Session {
    /// Logs in with the default [`Client`], returning a `Session`.
    ///
    /// Securely storing the user's password is an exercise left to the caller.
    pub async fn login(credentials: Credentials) -> Result<Session, Error> {
        Client::new().login(credentials).await
    }

    /// The current bearer token.
    #[must_use]
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Runs the password grant again and replaces the current token. On failure the old token
    /// is kept.
    #[tracing::instrument(skip(self), fields(username = %self.credentials.username))]
    pub async fn refresh(&mut self) -> Result<(), Error> {
        self.token = token::fetch(&self.client, &self.credentials).await?;
        Ok(())
    }

    /// Refreshes the token only if [`Token::is_expired`]. Returns whether a refresh happened.
    pub async fn refresh_if_expired(&mut self) -> Result<bool, Error> {
        if self.token.is_expired() {
            self.refresh().await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Uploads a media asset, returning its durable URL.
    ///
    /// Each call requests a fresh lease; leases are never reused.
    pub async fn upload_media(&self, media: &Media) -> Result<MediaUrl, Error> {
        media.upload(&self.client, &self.token.access_token).await
    }

    /// Submit a post of any kind. Media referenced by `kind` must already be uploaded.
    pub async fn submit(&self, submission: &Submission, kind: &Kind) -> Result<Submitted, Error> {
        submission
            .send(&self.client, &self.token.access_token, kind)
            .await
    }

    /// Submit a text post.
    #[tracing::instrument(skip(self, text))]
    pub async fn submit_text(
        &self,
        submission: &Submission,
        text: impl Into<String>,
    ) -> Result<Submitted, Error> {
        self.submit(submission, &Kind::Text { text: text.into() })
            .await
    }

    /// Submit a link post.
    #[tracing::instrument(skip(self))]
    pub async fn submit_link(
        &self,
        submission: &Submission,
        url: &str,
    ) -> Result<Submitted, Error> {
        self.submit(submission, &Kind::Link { url: url.into() })
            .await
    }

    /// Upload an image and submit it.
    #[tracing::instrument(skip(self))]
    pub async fn submit_image(
        &self,
        submission: &Submission,
        image: &Media,
    ) -> Result<Submitted, Error> {
        submission.validate()?;
        let MediaUrl { url, .. } = self.upload_media(image).await?;
        self.submit(submission, &Kind::Image { url }).await
    }

    /// Upload a video and its poster image, then submit them.
    ///
    /// Without a `poster`, the client's [default poster][`Client::with_default_poster`] is
    /// uploaded instead. With neither, fails with [`SubmitError::MissingVideoUrls`] before
    /// anything is uploaded.
    #[tracing::instrument(skip(self))]
    pub async fn submit_video(
        &self,
        submission: &Submission,
        video: &Media,
        poster: Option<&Media>,
    ) -> Result<Submitted, Error> {
        submission.validate()?;
        let poster = poster
            .or(self.client.default_poster.as_ref())
            .ok_or(SubmitError::MissingVideoUrls)?;

        let MediaUrl { url, .. } = self.upload_media(video).await?;
        let MediaUrl {
            url: poster_url, ..
        } = self.upload_media(poster).await?;
        self.submit(submission, &Kind::Video { url, poster_url })
            .await
    }

    /// Submit a video from a video and poster that were already uploaded with
    /// [`Session::upload_media`].
    #[tracing::instrument(skip(self))]
    pub async fn submit_video_urls(
        &self,
        submission: &Submission,
        video: &MediaUrl,
        poster: &MediaUrl,
    ) -> Result<Submitted, Error> {
        self.submit(
            submission,
            &Kind::Video {
                url: video.url.clone(),
                poster_url: poster.url.clone(),
            },
        )
        .await
    }
}
