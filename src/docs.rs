//! Static documentation shown on demand.

use crate::prelude::*;

/// Path to the "about this application" document.
pub const ABOUT_PATH: &str = "README.md";

/// Path to the privacy guidelines document.
pub const PRIVACY_PATH: &str = "privacy_guidelines.md";

/// Load a documentation file.
///
/// These documents ship alongside the application, so a missing one is a
/// broken installation, not a user error.
pub async fn load_markdown_file(path: &str) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read documentation file {:?}", path))
}
