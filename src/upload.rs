//! Upload validation.
//!
//! All limits are enforced here, before any file contents are read. Everything
//! downstream may assume it is working with an accepted batch.

use crate::prelude::*;

/// Media types we can send to a recognition engine as-is.
const ACCEPTED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg"];

/// The PDF media type, which gets rasterized into page images first.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Aggregate size ceiling across all accepted files in a batch.
pub const MAX_TOTAL_BYTES: u64 = 200 * 1024 * 1024;

/// Maximum number of accepted files in a batch.
pub const MAX_FILE_COUNT: usize = 5;

/// A file submitted for transcription.
///
/// This records only metadata. No bytes are read from the file until the
/// whole batch has passed validation.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    /// Where the file lives on disk.
    pub path: PathBuf,

    /// The original file name, used in labels and messages.
    pub name: String,

    /// The declared media type, guessed from the file name.
    pub media_type: String,

    /// The size of the file in bytes.
    pub size: u64,
}

impl UploadedFile {
    /// Describe a file on disk, without reading its contents.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("failed to stat {:?}", path.display()))?;
        if !metadata.is_file() {
            return Err(anyhow!("{:?} is not a regular file", path.display()));
        }
        let name = path
            .file_name()
            .with_context(|| format!("failed to get file name from {:?}", path.display()))?
            .to_string_lossy()
            .into_owned();
        let media_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_owned();
        Ok(Self {
            path: path.to_owned(),
            name,
            media_type,
            size: metadata.len(),
        })
    }

    /// Is this a PDF upload?
    pub fn is_pdf(&self) -> bool {
        self.media_type == PDF_MEDIA_TYPE
    }

    /// Can we submit this file to a recognition engine directly?
    fn is_supported_image(&self) -> bool {
        ACCEPTED_IMAGE_TYPES.contains(&self.media_type.as_str())
    }
}

/// One position in an image batch. Skipped files keep their upload position,
/// so that labels for the surviving files stay aligned with what the user
/// submitted.
#[derive(Clone, Debug)]
pub enum Upload {
    /// An accepted image.
    Accepted(UploadedFile),

    /// A file we refused to process, with the warning recorded for it.
    Skipped { warning: String },
}

/// A batch of uploads that has passed validation.
#[derive(Debug)]
pub enum Batch {
    /// A single PDF, to be rasterized into page images.
    Pdf(UploadedFile),

    /// Individual images, in upload order.
    Images(Vec<Upload>),
}

/// Validate a batch of uploads against our limits.
///
/// This is a pure decision over file metadata. Failures here are user errors,
/// reported before any expensive work begins.
pub fn validate_batch(files: Vec<UploadedFile>) -> Result<Batch> {
    if files.is_empty() {
        return Err(anyhow!("no files to transcribe"));
    }

    // A PDF may only be submitted alone. The alternative behaviors here are
    // all surprising, so we refuse outright.
    if files.iter().any(|f| f.is_pdf()) {
        if files.len() > 1 {
            return Err(anyhow!(
                "a PDF must be uploaded by itself, without any other files"
            ));
        }
        let pdf = files.into_iter().next().expect("checked non-empty above");
        check_total_size(pdf.size)?;
        return Ok(Batch::Pdf(pdf));
    }

    // Sort the images into accepted and skipped, keeping upload order.
    let uploads = files
        .into_iter()
        .map(|file| {
            if file.is_supported_image() {
                Upload::Accepted(file)
            } else {
                let warning = format!(
                    "skipping {}: unsupported type {} (supported: PNG, JPEG, PDF)",
                    file.name, file.media_type
                );
                Upload::Skipped { warning }
            }
        })
        .collect::<Vec<_>>();

    let accepted = uploads
        .iter()
        .filter_map(|u| match u {
            Upload::Accepted(file) => Some(file),
            Upload::Skipped { .. } => None,
        })
        .collect::<Vec<_>>();
    if accepted.is_empty() {
        return Err(anyhow!(
            "none of the uploaded files have a supported type (PNG, JPEG, PDF)"
        ));
    }
    if accepted.len() > MAX_FILE_COUNT {
        return Err(anyhow!(
            "too many files: {} uploaded, but at most {} are allowed per batch",
            accepted.len(),
            MAX_FILE_COUNT
        ));
    }
    check_total_size(accepted.iter().map(|f| f.size).sum())?;

    Ok(Batch::Images(uploads))
}

/// Enforce the aggregate size ceiling.
fn check_total_size(total: u64) -> Result<()> {
    if total > MAX_TOTAL_BYTES {
        Err(anyhow!(
            "uploads total {} bytes, which exceeds the {} MiB limit",
            total,
            MAX_TOTAL_BYTES / (1024 * 1024)
        ))
    } else {
        Ok(())
    }
}
