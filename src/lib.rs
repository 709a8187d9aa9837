//! reddit-uploader is a client for [Reddit](https://www.reddit.com/dev/api/) that uploads images
//! and videos through Reddit's media lease protocol and submits posts that use them.
//!
//! ```no_run
//! use reddit_uploader::{Client, Credentials, Media, Submission};
//!
//! # async fn f() -> Result<(), Box<dyn std::error::Error>> {
//! // Log in with a "script" application's credentials
//! let session = Client::new()
//!     .with_user_agent("linux:my-bot:v0.1.0 (by /u/spez)".into())
//!     .login(Credentials::new("spez", "hunter2", "client-id", "client-secret"))
//!     .await?;
//!
//! // Describe where the post goes
//! let submission = Submission::new("test", "hello from reddit-uploader!");
//!
//! // Upload the image and submit it
//! let image = Media::new(std::fs::read("photo.png")?, "photo.png");
//! let submitted = session.submit_image(&submission, &image).await?;
//! println!("{:?}", submitted.url);
//! # Ok(())
//! # }
//! ```
//!
//! Nothing is retried: every method returns the first error it runs into. Tokens are not
//! refreshed automatically either; call [`Session::refresh_if_expired`] before a batch of
//! requests if the session is long-lived.

#![deny(elided_lifetimes_in_paths)]
#![warn(clippy::pedantic, missing_docs)]
#![allow(clippy::missing_errors_doc)]

mod client;
mod error;
mod media;
mod session;
mod submission;
mod token;

pub use crate::client::Client;
pub use crate::error::{AuthError, Error, SubmitError, UploadError};
pub use crate::media::{Media, MediaKind, MediaUrl};
pub use crate::session::Session;
pub use crate::submission::{Kind, Submission, Submitted};
pub use crate::token::{Credentials, Token};
