//! Iterate over the pages of a PDF as rasterized images.

use std::{fs, sync::LazyLock, vec};

use regex::Regex;
use tokio::process::Command;

use crate::{
    exec::{check_for_command_failure, with_cpu_semaphore},
    prelude::*,
};

/// A default error regex for checking command output.
static ERROR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)error").expect("failed to compile regex"));

/// Poppler prints this when reconstructing a damaged xref table. It still
/// produces correct page images, so we treat it as a warning.
static DOWNGRADE_TO_WARNING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)error: xref num").expect("failed to compile regex")
});

/// Does this line contain an error?
fn is_error_line(line: &str) -> bool {
    ERROR_REGEX.is_match(line) && !DOWNGRADE_TO_WARNING_REGEX.is_match(line)
}

/// A single rasterized page image.
#[derive(Debug)]
pub struct Page {
    /// The MIME type of our data.
    pub mime_type: String,
    /// The encoded image data for this page.
    pub data: Vec<u8>,
}

/// A stream over PDF pages as PNG images, using Poppler's `pdftocairo` CLI
/// tool.
pub struct PageIter {
    /// The temporary directory holding the rasterized pages.
    ///
    /// This is released by [`Drop`].
    #[allow(dead_code)]
    tmpdir: tempfile::TempDir,
    /// Iterator over the page files in the temporary directory.
    dir_iter: vec::IntoIter<PathBuf>,
    /// The number of pages in the document.
    total_pages: usize,
    /// Any warnings that occurred while rasterizing the document.
    warnings: Vec<String>,
}

impl PageIter {
    /// Create a new [`PageIter`] from a PDF file, rasterizing each page.
    ///
    /// If the PDF is malformed or unreadable, this fails as a whole. We never
    /// return a partial set of pages.
    #[instrument(level = "debug", skip_all, fields(path = %path.display(), dpi))]
    pub async fn from_pdf(path: &Path, dpi: u32) -> Result<Self> {
        // Count the number of pages in the PDF.
        let total_pages = get_pdf_page_count(path).await?;

        // Construct an output filename. pdftocairo will add digits to this if
        // there is more than one page.
        let filename = path
            .file_name()
            .context("failed to get filename from PDF path")?;

        // Create a temporary directory to hold the PNG files.
        let tmpdir = tempfile::TempDir::with_prefix("pages")?;
        let tmpdir_path = tmpdir.path().to_owned();

        // Run pdftocairo to convert the PDF to PNG files.
        //
        // We use `with_cpu_semaphore` because `pdftocairo` will use _at least_
        // 100% of a CPU, and we don't want to run 200 copies of it at once by
        // mistake.
        let out_path = tmpdir_path.join(filename).with_extension("png");
        let mut cmd = Command::new("pdftocairo");
        cmd.arg("-png").arg("-r").arg(dpi.to_string());
        let output = with_cpu_semaphore(|| async {
            cmd.arg(path).arg(out_path).output().await.with_context(|| {
                format!("failed to run pdftocairo on {:?}", path.display())
            })
        })
        .await?;
        check_for_command_failure("pdftocairo", &output, Some(&is_error_line))?;

        // Get the list of PNG files in the temporary directory. pdftocairo
        // numbers them with zero-padded page indices, so lexical order is page
        // order.
        let mut dir_paths = tmpdir_path
            .read_dir()
            .with_context(|| {
                format!(
                    "failed to read temporary directory {:?}",
                    tmpdir_path.display()
                )
            })?
            .map(|entry| {
                let entry = entry.with_context(|| {
                    format!(
                        "failed to read entry in temporary directory {:?}",
                        tmpdir_path.display()
                    )
                })?;
                Ok(entry.path())
            })
            .collect::<Result<Vec<_>>>()?;
        dir_paths.sort();
        let dir_iter = dir_paths.into_iter();

        // Keep any output from pdftocairo around as warnings.
        let mut warnings = vec![];
        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            warnings.push(line.trim().to_string());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines() {
            warnings.push(line.trim().to_string());
        }

        Ok(Self {
            tmpdir,
            dir_iter,
            total_pages,
            warnings,
        })
    }

    /// Get any warnings that occurred while processing the document.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// How many pages does the document have?
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }
}

impl Iterator for PageIter {
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(path) = self.dir_iter.next() {
            // Read the PNG file into a byte vector.
            let result = fs::read(&path)
                .with_context(|| format!("failed to read file {:?}", path.display()));
            let bytes = match result {
                Ok(bytes) => bytes,
                Err(err) => return Some(Err(err)),
            };

            // Delete the file to recover space a bit early.
            let result = fs::remove_file(&path)
                .with_context(|| format!("failed to delete file {:?}", path.display()));
            if let Err(err) = result {
                return Some(Err(err));
            }

            Some(Ok(Page {
                mime_type: "image/png".to_string(),
                data: bytes,
            }))
        } else {
            None
        }
    }
}

/// Get the number of pages in a PDF file.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn get_pdf_page_count(path: &Path) -> Result<usize> {
    // Run pdfinfo to get the number of pages.
    let mut cmd = Command::new("pdfinfo");
    let output = cmd
        .arg(path)
        .output()
        .await
        .with_context(|| format!("failed to run pdfinfo on {:?}", path.display()))?;
    check_for_command_failure("pdfinfo", &output, None)?;

    // Parse the output of pdfinfo into properties.
    let output =
        String::from_utf8(output.stdout).context("pdfinfo output was not valid UTF-8")?;
    let mut page_count = None;
    for line in output.lines() {
        let mut parts = line.splitn(2, ':');
        let key = parts.next().unwrap_or("").trim();
        let value = parts.next().unwrap_or("").trim();
        if key == "Pages" {
            page_count = Some(value.to_string());
        }
    }

    // Get the number of pages from the properties.
    let page_count_str =
        page_count.ok_or_else(|| anyhow!("failed to find page count in pdfinfo output"))?;
    page_count_str.parse::<usize>().with_context(|| {
        format!(
            "failed to parse page count for {:?} from pdfinfo output",
            path.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    static TEST_PDF_PATH: &str = "tests/fixtures/two_pages.pdf";

    #[test]
    fn is_error_line_works() {
        assert!(is_error_line("error: something went wrong"));
        assert!(is_error_line("ERROR: something went wrong"));
        assert!(!is_error_line("Warning: something is odd"));
        assert!(!is_error_line(
            "Internal Error: xref num 1234 not found but needed, document has changes, reconstruct aborted"
        ));
    }

    #[tokio::test]
    #[ignore = "Requires poppler-utils to be installed"]
    async fn page_count_returns_correct_number_of_pages() -> Result<()> {
        let page_count = get_pdf_page_count(Path::new(TEST_PDF_PATH)).await?;
        assert_eq!(page_count, 2);
        Ok(())
    }

    #[tokio::test]
    #[ignore = "Requires poppler-utils to be installed"]
    async fn page_iter_returns_pages_in_order() -> Result<()> {
        let page_iter = PageIter::from_pdf(Path::new(TEST_PDF_PATH), 72).await?;
        assert_eq!(page_iter.total_pages(), 2);
        let pages = page_iter.collect::<Result<Vec<_>>>()?;
        assert_eq!(pages.len(), 2);
        for page in &pages {
            assert_eq!(page.mime_type, "image/png");
            assert!(!page.data.is_empty());
        }
        Ok(())
    }

    #[tokio::test]
    #[ignore = "Requires poppler-utils to be installed"]
    async fn malformed_pdf_fails_as_a_whole() {
        let tmpdir = tempfile::TempDir::new().unwrap();
        let path = tmpdir.path().join("broken.pdf");
        fs::write(&path, b"this is not a PDF").unwrap();
        assert!(PageIter::from_pdf(&path, 72).await.is_err());
    }
}
