use crate::client::{self, Client};
use crate::error::SubmitError;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// Describes where and how to post, independent of what is being posted.
///
/// Only [`subreddit`][`Submission::subreddit`] and [`title`][`Submission::title`] are required;
/// everything else is left out of the request when unset.
#[derive(Clone, Debug, Default, Serialize)]
#[must_use]
pub struct Submission {
    /// Subreddit name, without the `r/` prefix.
    #[serde(rename = "sr")]
    pub subreddit: String,
    /// Post title.
    pub title: String,
    /// Flair template ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flair_id: Option<String>,
    /// Flair text, for flair templates that allow editing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flair_text: Option<String>,
    /// Whether to send comment replies to the inbox. Left to the account default when unset.
    #[serde(rename = "sendreplies", skip_serializing_if = "Option::is_none")]
    pub send_replies: Option<bool>,
    /// Allow submitting a link that was already submitted to this subreddit.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub resubmit: bool,
    /// Marks the post as not safe for work.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub nsfw: bool,
    /// Marks the post as a spoiler.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub spoiler: bool,
}

impl Submission {
    /// Creates a submission to `subreddit` titled `title`.
    pub fn new(subreddit: impl Into<String>, title: impl Into<String>) -> Submission {
        Submission {
            subreddit: subreddit.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.subreddit.is_empty() {
            return Err(Error::IncompleteSubmission("subreddit"));
        }
        if self.title.is_empty() {
            return Err(Error::IncompleteSubmission("title"));
        }
        Ok(())
    }

    /// Sends the submission with its kind-specific fields. Media must already be uploaded.
    #[tracing::instrument(skip(self, client, access_token), fields(subreddit = %self.subreddit))]
    pub(crate) async fn send(
        &self,
        client: &Client,
        access_token: &str,
        kind: &Kind,
    ) -> Result<Submitted, Error> {
        self.validate()?;

        let form = ApiSubmission {
            submission: self,
            kind,
            api_type: "json",
        };
        tracing::debug!(?form);

        let response: SubmitResponse = client::decode(
            client
                .api_post("api/submit", access_token)
                .form(&form)
                .send()
                .await?
                .error_for_status()?,
        )
        .await?;
        let submitted = response.into_result()?;
        tracing::info!(url = ?submitted.url, "post submitted");
        Ok(submitted)
    }
}

/// What is being posted, with the fields each kind requires.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Kind {
    /// A text post.
    #[serde(rename = "self")]
    Text {
        /// Markdown body.
        text: String,
    },
    /// A link to an external page.
    Link {
        /// Link target.
        url: String,
    },
    /// An uploaded image.
    Image {
        /// Uploaded media URL.
        url: String,
    },
    /// An uploaded video with its poster image.
    Video {
        /// Uploaded video URL.
        url: String,
        /// Uploaded poster image URL.
        #[serde(rename = "video_poster_url")]
        poster_url: String,
    },
}

/// The `data` object of a successful submission.
#[allow(clippy::module_name_repetitions)]
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct Submitted {
    /// Permalink of the new post. Absent for videos until processing finishes.
    pub url: Option<String>,
    /// Base-36 post ID.
    pub id: Option<String>,
    /// Fullname of the post (`t3_` + ID).
    pub name: Option<String>,
    /// The submitting user's "submitted" page, returned for media posts.
    pub user_submitted_page: Option<String>,
    /// Websocket URL that streams media processing status, returned for media posts.
    pub websocket_url: Option<String>,
}

#[derive(Serialize)]
struct ApiSubmission<'a> {
    #[serde(flatten)]
    submission: &'a Submission,
    #[serde(flatten)]
    kind: &'a Kind,
    api_type: &'static str,
}

impl Debug for ApiSubmission<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_json::to_value(self).map_err(|_| fmt::Error)?)
    }
}

#[derive(Deserialize)]
struct SubmitResponse {
    json: SubmitResponseInner,
}

#[derive(Deserialize)]
struct SubmitResponseInner {
    #[serde(default)]
    errors: Vec<Vec<Option<String>>>,
    #[serde(default)]
    data: Submitted,
}

impl SubmitResponse {
    /// Classifies by the first error entry only; later entries are ignored.
    fn into_result(self) -> Result<Submitted, SubmitError> {
        match self.json.errors.first() {
            Some(entry) => {
                let field = |i: usize| entry.get(i).and_then(Option::as_deref).unwrap_or_default();
                Err(SubmitError::from_code(field(0), field(1)))
            }
            None => Ok(self.json.data),
        }
    }
}
