#![deny(elided_lifetimes_in_paths)]
#![warn(clippy::pedantic)]

use anyhow::Result;
use reddit_uploader::{Client, Credentials, Media, Submission};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let subreddit = std::env::var("REDDIT_SUBREDDIT")?;
    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: submit_image <image>"))?;

    let session = Client::new().login(Credentials::from_env()?).await?;

    let image = Media::from_file(&path).await?;
    let submission = Submission {
        send_replies: Some(false),
        ..Submission::new(subreddit, "test from reddit-uploader")
    };
    let submitted = session.submit_image(&submission, &image).await?;
    println!("{}", submitted.url.unwrap_or_default());

    Ok(())
}
