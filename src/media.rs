use crate::client::{self, Client};
use crate::error::UploadError;
use crate::Error;
use bytes::Bytes;
use derive_more::Display;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// The broad type of an uploaded asset.
#[allow(clippy::module_name_repetitions)]
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum MediaKind {
    /// A still image.
    #[display(fmt = "image")]
    Image,
    /// A video.
    #[display(fmt = "video")]
    Video,
    /// An animated GIF.
    #[display(fmt = "gif")]
    Gif,
}

/// Resolves a filename's extension to the MIME type sent with the lease request.
pub(crate) fn mime_type(filename: &str) -> Option<(&'static str, MediaKind)> {
    let (_, extension) = filename.rsplit_once('.')?;
    Some(match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => ("image/jpeg", MediaKind::Image),
        "png" => ("image/png", MediaKind::Image),
        "gif" => ("image/gif", MediaKind::Gif),
        "mp4" => ("video/mp4", MediaKind::Video),
        "mov" => ("video/quicktime", MediaKind::Video),
        _ => return None,
    })
}

/// A media asset waiting to be uploaded: its bytes and the filename that determines its type.
#[derive(Clone)]
pub struct Media {
    content: Bytes,
    filename: String,
}

impl Media {
    /// Create a `Media` from a buffer.
    pub fn new(content: impl Into<Bytes>, filename: impl Into<String>) -> Media {
        Media {
            content: content.into(),
            filename: filename.into(),
        }
    }

    /// Create a `Media` from a file on disk, named after the file.
    #[cfg(feature = "fs")]
    pub async fn from_file(path: impl AsRef<std::path::Path>) -> Result<Media, std::io::Error> {
        let filename = path
            .as_ref()
            .file_name()
            .and_then(std::ffi::OsStr::to_str)
            .unwrap_or("file")
            .to_owned();
        let content = tokio::fs::read(path).await?;
        Ok(Media::new(content, filename))
    }

    /// The filename sent with the lease request and the file part.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Size of the content in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Returns true if the content is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// The kind of media this filename resolves to, if any.
    #[must_use]
    pub fn kind(&self) -> Option<MediaKind> {
        mime_type(&self.filename).map(|(_, kind)| kind)
    }

    /// Requests a lease for this asset, then uploads the bytes to the leased storage URL.
    #[tracing::instrument(skip(self, client, access_token), fields(filename = %self.filename, len = self.content.len()))]
    pub(crate) async fn upload(
        &self,
        client: &Client,
        access_token: &str,
    ) -> Result<MediaUrl, Error> {
        let (mimetype, kind) = mime_type(&self.filename)
            .ok_or_else(|| UploadError::LeaseDenied("unknown extension".into()))?;

        let response = client
            .api_post("api/media/asset.json", access_token)
            .form(&LeaseRequest {
                filepath: &self.filename,
                mimetype,
                api_type: "json",
            })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::LeaseDenied(format!("{}: {}", status, body)).into());
        }
        let response: LeaseResponse = client::decode(response).await?;
        let lease = Lease::try_from(response)?;
        tracing::info!(action = %lease.action, key = %lease.key, "lease granted");

        let mut form = Form::new();
        for (name, value) in &lease.fields {
            form = form.text(name.clone(), value.clone());
        }
        form = form.part(
            "file",
            Part::stream_with_length(Body::from(self.content.clone()), self.content.len() as u64)
                .file_name(self.filename.clone())
                .mime_str(mimetype)?,
        );

        let response = client.post_url(&lease.action).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::TransferFailed { status, body }.into());
        }

        let url = lease.media_url();
        tracing::info!(%url, %kind, "media uploaded");
        Ok(MediaUrl { url, kind })
    }
}

impl Debug for Media {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Media")
            .field("filename", &self.filename)
            .field("len", &self.content.len())
            .finish()
    }
}

/// The durable URL of an uploaded asset.
#[allow(clippy::module_name_repetitions)]
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[display(fmt = "{}", url)]
pub struct MediaUrl {
    /// Leased storage URL joined with the lease key.
    pub url: String,
    /// What was uploaded.
    pub kind: MediaKind,
}

/// A single-use, pre-signed upload authorization.
#[derive(Debug)]
struct Lease {
    /// Absolute storage URL.
    action: String,
    /// Signing fields, forwarded verbatim as multipart text fields.
    fields: Vec<(String, String)>,
    key: String,
}

impl Lease {
    fn media_url(&self) -> String {
        format!("{}/{}", self.action, self.key)
    }
}

impl TryFrom<LeaseResponse> for Lease {
    type Error = UploadError;

    fn try_from(response: LeaseResponse) -> Result<Lease, UploadError> {
        let args = response.args.unwrap_or_default();
        let action = match args.action.as_deref() {
            None | Some("") => return Err(UploadError::LeaseDenied("lease not granted".into())),
            Some(action) if action.starts_with("//") => format!("https:{}", action),
            Some(action) => action.to_owned(),
        };
        let fields: Vec<(String, String)> = args
            .fields
            .into_iter()
            .map(|field| (field.name, field.value))
            .collect();
        let key = fields
            .iter()
            .find(|(name, _)| name == "key")
            .map(|(_, value)| value.clone())
            .ok_or_else(|| UploadError::LeaseDenied("lease has no key field".into()))?;
        Ok(Lease {
            action,
            fields,
            key,
        })
    }
}

#[derive(Serialize)]
struct LeaseRequest<'a> {
    filepath: &'a str,
    mimetype: &'static str,
    api_type: &'static str,
}

#[derive(Deserialize)]
struct LeaseResponse {
    #[serde(default)]
    args: Option<LeaseArgs>,
}

#[derive(Default, Deserialize)]
struct LeaseArgs {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    fields: Vec<LeaseField>,
}

#[derive(Deserialize)]
struct LeaseField {
    name: String,
    value: String,
}
