//! The `about` subcommand.

use clap::Args;
use tokio::io::AsyncWriteExt as _;

use crate::{docs, prelude::*};

/// Arguments for the `about` subcommand.
#[derive(Debug, Args)]
pub struct AboutOpts {}

/// The `about` subcommand.
///
/// Prints the application README and the privacy guidelines, the same two
/// documents the in-app help panel shows.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_about(_opts: &AboutOpts) -> Result<()> {
    let readme = docs::load_markdown_file(docs::ABOUT_PATH).await?;
    let privacy = docs::load_markdown_file(docs::PRIVACY_PATH).await?;

    let mut stdout = tokio::io::stdout();
    for (title, body) in [
        ("About this application", &readme),
        ("Privacy guidelines", &privacy),
    ] {
        let banner = format!("{}\n{}\n\n", title, "=".repeat(title.len()));
        stdout
            .write_all(banner.as_bytes())
            .await
            .context("failed to write documentation")?;
        stdout
            .write_all(body.as_bytes())
            .await
            .context("failed to write documentation")?;
        stdout
            .write_all(b"\n")
            .await
            .context("failed to write documentation")?;
    }
    stdout.flush().await.context("failed to flush stdout")?;
    Ok(())
}
