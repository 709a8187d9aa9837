#![deny(elided_lifetimes_in_paths)]
#![warn(clippy::pedantic)]

use anyhow::Result;
use reddit_uploader::{Client, Credentials, Media, Submission};
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let subreddit = std::env::var("REDDIT_SUBREDDIT")?;
    let mut args = std::env::args().skip(1);
    let (video, poster) = match (args.next(), args.next()) {
        (Some(video), poster) => (video, poster),
        (None, _) => anyhow::bail!("usage: submit_video <video> [poster]"),
    };

    let mut session = Client::new()
        .with_timeout(Duration::from_secs(120))
        .login(Credentials::from_env()?)
        .await?;
    session.refresh_if_expired().await?;

    let video = Media::from_file(&video).await?;
    let poster = match poster {
        Some(poster) => Some(Media::from_file(&poster).await?),
        None => None,
    };
    let submitted = session
        .submit_video(
            &Submission::new(subreddit, "video from reddit-uploader"),
            &video,
            poster.as_ref(),
        )
        .await?;

    // Video posts have no permalink until processing finishes.
    if let Some(websocket_url) = submitted.websocket_url {
        println!("processing status: {}", websocket_url);
    }

    Ok(())
}
