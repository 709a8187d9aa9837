use reqwest::StatusCode;

/// Errors that might occur when using the library.
///
/// Each step of the authenticate → upload → submit chain reports its own classification; the
/// orchestrating methods on [`Session`][`crate::Session`] pass the first failure through
/// unchanged.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The OAuth credential exchange failed.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Uploading a media asset failed.
    #[error("upload failed: {0}")]
    Upload(#[from] UploadError),

    /// The submission endpoint rejected the post.
    #[error("submission rejected: {0}")]
    Submit(#[from] SubmitError),

    /// Attempted to submit a post without a subreddit or title.
    #[error("submission is missing `{0}`")]
    IncompleteSubmission(&'static str),

    /// A transport-level deadline was exceeded. See [`Client::with_timeout`][`crate::Client::with_timeout`].
    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// Any other HTTP client error (including status codes indicating failure).
    #[error("request error: {0}")]
    Request(#[source] reqwest::Error),

    /// A response body did not have the expected shape.
    #[error("json decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A required environment variable is not set.
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(err)
        } else {
            Error::Request(err)
        }
    }
}

/// Failures of the password-grant token exchange.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The provider answered with an `error` field, carried here verbatim.
    #[error("{0}")]
    Rejected(String),

    /// The provider answered without an `access_token` or an `error`.
    #[error("missing access token")]
    MissingAccessToken,

    /// The provider's response was not the expected JSON object.
    #[error("malformed token response: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Failures of the two-phase media upload.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum UploadError {
    /// No upload lease was granted, either because the filename has no known media type or
    /// because the API refused the lease.
    #[error("lease denied: {0}")]
    LeaseDenied(String),

    /// The binary POST to the leased storage URL returned a non-success status.
    #[error("transfer failed with {status}: {body}")]
    TransferFailed {
        /// Status returned by the storage endpoint.
        status: StatusCode,
        /// Raw response body returned by the storage endpoint.
        body: String,
    },
}

/// Errors reported by the submission endpoint, classified by the first entry of its `errors`
/// list.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SubmitError {
    /// `IMAGES_NOTALLOWED`
    #[error("community does not allow images")]
    ImagesNotAllowed,

    /// `SUBREDDIT_NOEXIST`
    #[error("community does not exist")]
    SubredditDoesNotExist,

    /// `SUBREDDIT_NOTALLOWED`
    #[error("this community only allows trusted members to post here")]
    SubredditNotAllowed,

    /// `MISSING_VIDEO_URLS`: a video was submitted without both a video and a poster URL.
    #[error("a video post requires both a video URL and a poster URL")]
    MissingVideoUrls,

    /// Any other error code, with the message the API sent alongside it.
    #[error("{code}: {message}")]
    Other {
        /// Error code, e.g. `RATELIMIT`.
        code: String,
        /// Human-readable message.
        message: String,
    },
}

impl SubmitError {
    pub(crate) fn from_code(code: &str, message: &str) -> SubmitError {
        match code {
            "IMAGES_NOTALLOWED" => SubmitError::ImagesNotAllowed,
            "SUBREDDIT_NOEXIST" => SubmitError::SubredditDoesNotExist,
            "SUBREDDIT_NOTALLOWED" => SubmitError::SubredditNotAllowed,
            "MISSING_VIDEO_URLS" => SubmitError::MissingVideoUrls,
            _ => SubmitError::Other {
                code: code.to_owned(),
                message: message.to_owned(),
            },
        }
    }
}
