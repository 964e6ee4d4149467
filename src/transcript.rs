//! Transcript assembly.
//!
//! The assembler drives one recognition call per unit of work, strictly
//! sequentially and in input order, and concatenates the labeled results.
//! Any rasterization or recognition failure aborts the whole run: we never
//! produce a transcript with silently missing units.

use std::{fmt::Write as _, sync::Arc};

use indicatif::ProgressBar;

use crate::{
    engines::{RecognitionEngine, RecognitionInput},
    page_iter::PageIter,
    prelude::*,
    upload::{Upload, UploadedFile},
};

/// What kind of unit of work a transcript section describes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnitKind {
    /// A rasterized PDF page.
    Page,
    /// An individually uploaded image.
    Image,
}

impl UnitKind {
    /// The label used in section headers.
    fn label(self) -> &'static str {
        match self {
            UnitKind::Page => "page",
            UnitKind::Image => "image",
        }
    }
}

/// The assembled transcript of a batch, plus any warnings recorded along the
/// way.
#[derive(Debug, Default)]
pub struct Transcript {
    /// The concatenated, labeled text of every transcribed unit.
    pub text: String,

    /// Warnings recorded for skipped files and noisy conversions.
    pub warnings: Vec<String>,
}

impl Transcript {
    /// Append one labeled section. Sections appear in the order this is
    /// called, which must be input order.
    fn push_section(&mut self, kind: UnitKind, index: usize, text: &str) {
        write!(self.text, "--- {} {} ---\n{}\n\n", kind.label(), index, text)
            .expect("writing to a String cannot fail");
    }
}

/// Transcribe a single PDF, one recognition call per page, in page order.
#[instrument(level = "debug", skip_all, fields(name = %pdf.name))]
pub async fn transcribe_pdf(
    pdf: &UploadedFile,
    dpi: u32,
    engine: Arc<dyn RecognitionEngine>,
    progress: &ProgressBar,
) -> Result<Transcript> {
    let page_iter = PageIter::from_pdf(&pdf.path, dpi)
        .await
        .with_context(|| format!("failed to convert {} into page images", pdf.name))?;
    progress.set_length(page_iter.total_pages() as u64);

    let mut transcript = Transcript::default();
    transcript.warnings.extend(page_iter.warnings().to_owned());

    for (page_idx, page) in page_iter.enumerate() {
        let index = page_idx + 1;
        let page = page?;
        let text = engine
            .recognize(RecognitionInput {
                name: format!("{} page {}", pdf.name, index),
                index,
                mime_type: page.mime_type,
                data: page.data,
            })
            .await
            .with_context(|| format!("recognition failed for {} page {}", pdf.name, index))?;
        transcript.push_section(UnitKind::Page, index, &text);
        progress.inc(1);
    }
    Ok(transcript)
}

/// Transcribe a batch of individual images, one recognition call per accepted
/// file, in upload order.
///
/// Skipped files contribute a warning instead of a section, but still consume
/// their position, so surviving sections keep the numbering the user expects.
#[instrument(level = "debug", skip_all)]
pub async fn transcribe_images(
    uploads: &[Upload],
    engine: Arc<dyn RecognitionEngine>,
    progress: &ProgressBar,
) -> Result<Transcript> {
    let mut transcript = Transcript::default();
    for (idx, upload) in uploads.iter().enumerate() {
        let index = idx + 1;
        match upload {
            Upload::Skipped { warning } => {
                warn!("{}", warning);
                transcript.warnings.push(warning.clone());
            }
            Upload::Accepted(file) => {
                let data = tokio::fs::read(&file.path).await.with_context(|| {
                    format!("failed to read {:?}", file.path.display())
                })?;
                let text = engine
                    .recognize(RecognitionInput {
                        name: file.name.clone(),
                        index,
                        mime_type: file.media_type.clone(),
                        data,
                    })
                    .await
                    .with_context(|| format!("recognition failed for {}", file.name))?;
                transcript.push_section(UnitKind::Image, index, &text);
            }
        }
        progress.inc(1);
    }
    Ok(transcript)
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::Mutex};

    use async_trait::async_trait;

    use super::*;

    /// An engine that returns scripted text per call, or fails on request.
    struct ScriptedEngine {
        responses: Vec<Result<&'static str, &'static str>>,
        calls: Mutex<usize>,
    }

    impl ScriptedEngine {
        fn new(responses: Vec<Result<&'static str, &'static str>>) -> Arc<Self> {
            Arc::new(Self {
                responses,
                calls: Mutex::new(0),
            })
        }

        fn call_count(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl RecognitionEngine for ScriptedEngine {
        async fn recognize(&self, _input: RecognitionInput) -> Result<String> {
            let mut calls = self.calls.lock().unwrap();
            let response = self.responses[*calls];
            *calls += 1;
            match response {
                Ok(text) => Ok(text.to_owned()),
                Err(msg) => Err(anyhow!("{}", msg)),
            }
        }
    }

    /// Build an image batch of temp files, with `None` marking a skipped slot.
    fn image_batch(tmpdir: &Path, slots: &[Option<&str>]) -> Vec<Upload> {
        slots
            .iter()
            .map(|slot| match slot {
                Some(name) => {
                    let path = tmpdir.join(name);
                    fs::write(&path, b"fake image bytes").unwrap();
                    Upload::Accepted(UploadedFile {
                        path,
                        name: (*name).to_owned(),
                        media_type: "image/png".to_owned(),
                        size: 16,
                    })
                }
                None => Upload::Skipped {
                    warning: "skipping notes.txt: unsupported type text/plain".to_owned(),
                },
            })
            .collect()
    }

    #[test]
    fn section_format_matches_the_documented_layout() {
        let mut transcript = Transcript::default();
        transcript.push_section(UnitKind::Page, 1, "Hello");
        transcript.push_section(UnitKind::Page, 2, "World");
        assert_eq!(
            transcript.text,
            "--- page 1 ---\nHello\n\n--- page 2 ---\nWorld\n\n"
        );
    }

    #[test]
    fn empty_recognition_text_still_gets_a_section() {
        let mut transcript = Transcript::default();
        transcript.push_section(UnitKind::Image, 1, "");
        assert_eq!(transcript.text, "--- image 1 ---\n\n\n");
    }

    #[tokio::test]
    async fn images_are_transcribed_in_upload_order() {
        let tmpdir = tempfile::TempDir::new().unwrap();
        let uploads =
            image_batch(tmpdir.path(), &[Some("one.png"), Some("two.png")]);
        let engine = ScriptedEngine::new(vec![Ok("ONE"), Ok("TWO")]);
        let transcript =
            transcribe_images(&uploads, engine.clone(), &ProgressBar::hidden())
                .await
                .unwrap();
        assert_eq!(
            transcript.text,
            "--- image 1 ---\nONE\n\n--- image 2 ---\nTWO\n\n"
        );
        assert_eq!(engine.call_count(), 2);
        assert!(transcript.warnings.is_empty());
    }

    #[tokio::test]
    async fn skipped_files_keep_their_positions_and_record_a_warning() {
        let tmpdir = tempfile::TempDir::new().unwrap();
        let uploads =
            image_batch(tmpdir.path(), &[Some("one.png"), None, Some("three.png")]);
        let engine = ScriptedEngine::new(vec![Ok("ONE"), Ok("THREE")]);
        let transcript =
            transcribe_images(&uploads, engine.clone(), &ProgressBar::hidden())
                .await
                .unwrap();
        assert_eq!(
            transcript.text,
            "--- image 1 ---\nONE\n\n--- image 3 ---\nTHREE\n\n"
        );
        assert_eq!(transcript.warnings.len(), 1);
        assert!(transcript.warnings[0].contains("notes.txt"));
        // The skipped file never reached the engine.
        assert_eq!(engine.call_count(), 2);
    }

    #[tokio::test]
    async fn a_recognition_failure_aborts_the_whole_run() {
        let tmpdir = tempfile::TempDir::new().unwrap();
        let uploads =
            image_batch(tmpdir.path(), &[Some("one.png"), Some("two.png")]);
        let engine = ScriptedEngine::new(vec![Ok("ONE"), Err("service unavailable")]);
        let err = transcribe_images(&uploads, engine, &ProgressBar::hidden())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("recognition failed for two.png"));
    }

    #[tokio::test]
    async fn assembly_is_deterministic() {
        let tmpdir = tempfile::TempDir::new().unwrap();
        let uploads =
            image_batch(tmpdir.path(), &[Some("one.png"), None, Some("three.png")]);
        let mut texts = vec![];
        for _ in 0..2 {
            let engine = ScriptedEngine::new(vec![Ok("ONE"), Ok("THREE")]);
            let transcript =
                transcribe_images(&uploads, engine, &ProgressBar::hidden())
                    .await
                    .unwrap();
            texts.push(transcript.text);
        }
        assert_eq!(texts[0], texts[1]);
    }
}
