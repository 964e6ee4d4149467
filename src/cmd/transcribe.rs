//! The `transcribe` subcommand.

use clap::Args;
use tokio::io::AsyncWriteExt as _;

use crate::{
    engines::engine_for_name,
    prelude::*,
    transcript::{Transcript, transcribe_images, transcribe_pdf},
    ui::{ProgressConfig, Ui},
    upload::{Batch, UploadedFile, validate_batch},
};

/// Arguments for the `transcribe` subcommand.
#[derive(Debug, Args)]
pub struct TranscribeOpts {
    /// The image files (PNG or JPEG) or single PDF to transcribe.
    #[clap(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// The recognition engine to use.
    #[clap(long, default_value = "vision")]
    pub engine: String,

    /// The DPI to use when rasterizing PDF pages.
    #[clap(long, default_value = "300")]
    pub dpi: u32,

    /// Where to write the transcript. Pass `-` to write to standard output.
    #[clap(short = 'o', long = "out", default_value = "transcription.txt")]
    pub output_path: PathBuf,
}

impl TranscribeOpts {
    /// Are we writing the transcript to standard output?
    pub fn writes_to_stdout(&self) -> bool {
        self.output_path == Path::new("-")
    }
}

/// The `transcribe` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_transcribe(ui: Ui, opts: &TranscribeOpts) -> Result<()> {
    // Describe and validate the uploads. No file contents are read until the
    // whole batch has passed.
    let mut files = Vec::with_capacity(opts.files.len());
    for path in &opts.files {
        files.push(UploadedFile::from_path(path).await?);
    }
    let batch = validate_batch(files)?;

    // Set up our recognition engine, once. Credential problems surface here,
    // before any conversion work starts.
    let engine = engine_for_name(&opts.engine).await?;

    // Run the pipeline.
    let progress_config = ProgressConfig {
        emoji: "📄",
        msg: "Transcribing",
        done_msg: "Transcribed",
    };
    let transcript = match &batch {
        Batch::Pdf(pdf) => {
            // The real page count is filled in once the PDF has been opened.
            let pb = ui.new_progress_bar(&progress_config, 0);
            transcribe_pdf(pdf, opts.dpi, engine, &pb).await?
        }
        Batch::Images(uploads) => {
            let pb = ui.new_progress_bar(&progress_config, uploads.len() as u64);
            transcribe_images(uploads, engine, &pb).await?
        }
    };

    // Report any warnings we collected along the way.
    for warning in &transcript.warnings {
        ui.display_message("⚠️", warning);
    }

    // Write out the transcript.
    write_transcript(opts, &transcript).await?;
    if !opts.writes_to_stdout() {
        ui.display_message(
            "📝",
            &format!("Wrote transcript to {}", opts.output_path.display()),
        );
    }
    Ok(())
}

/// Write the transcript to the chosen output, UTF-8 encoded.
async fn write_transcript(opts: &TranscribeOpts, transcript: &Transcript) -> Result<()> {
    if opts.writes_to_stdout() {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(transcript.text.as_bytes())
            .await
            .context("failed to write transcript to stdout")?;
        stdout.flush().await.context("failed to flush stdout")?;
    } else {
        tokio::fs::write(&opts.output_path, transcript.text.as_bytes())
            .await
            .with_context(|| {
                format!(
                    "failed to write transcript to {}",
                    opts.output_path.display()
                )
            })?;
    }
    Ok(())
}
