//! Recognition using the `tesseract` CLI tool.

use std::{
    fs::{File, read_to_string},
    io::Write as _,
};

use async_trait::async_trait;
use tokio::process::Command;

use crate::{
    exec::{check_for_command_failure, with_cpu_semaphore},
    prelude::*,
};

use super::{RecognitionEngine, RecognitionInput};

/// Recognition engine wrapping the `tesseract` CLI tool.
///
/// Useful when no cloud credentials are available. Quality is noticeably
/// worse than the hosted service on low-contrast scans.
#[non_exhaustive]
pub struct TesseractEngine {}

impl TesseractEngine {
    /// Create a new `tesseract` engine.
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait]
impl RecognitionEngine for TesseractEngine {
    #[instrument(level = "debug", skip_all, fields(name = %input.name, index = %input.index))]
    async fn recognize(&self, input: RecognitionInput) -> Result<String> {
        let extension = mime_guess::get_mime_extensions_str(&input.mime_type)
            .and_then(|o| o.first())
            .ok_or_else(|| {
                anyhow!("cannot determine extension for {}", input.mime_type)
            })?;

        // Write our input to a temporary file.
        let tmpdir = tempfile::TempDir::with_prefix("tesseract")?;
        let input_path = tmpdir.path().join(format!("input.{}", extension));
        let output_path = tmpdir.path().join("output.txt");
        let mut input_file =
            File::create(&input_path).context("cannot create tesseract input file")?;
        input_file
            .write_all(&input.data)
            .context("cannot write tesseract input file")?;
        input_file
            .flush()
            .context("cannot flush tesseract input file")?;

        // Run tesseract on the input file.
        let output = with_cpu_semaphore(|| async {
            Command::new("tesseract")
                .arg(&input_path)
                .arg(output_path.with_extension(""))
                .output()
                .await
                .context("cannot run tesseract")
        })
        .await?;
        check_for_command_failure("tesseract", &output, None)?;

        // Read the output file.
        read_to_string(&output_path).context("cannot read tesseract output file")
    }
}
