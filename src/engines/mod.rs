//! Recognition engine interface.

use std::sync::Arc;

use async_trait::async_trait;

use crate::prelude::*;

pub mod echo;
pub mod tesseract;
pub mod vision;

/// One unit of work for a recognition engine: a single page or image.
pub struct RecognitionInput {
    /// A name for the unit, used in logs and error messages.
    pub name: String,

    /// The 1-based position of the unit within the batch.
    pub index: usize,

    /// The MIME type of the image data.
    pub mime_type: String,

    /// The encoded image data.
    pub data: Vec<u8>,
}

/// Interface to a recognition engine.
///
/// Implementations wrap an external OCR tool or service. A successful call
/// returns the recognized text, which may be empty if the engine found none.
/// Failures are returned as errors, and abort the whole transcription run.
#[async_trait]
pub trait RecognitionEngine: Send + Sync + 'static {
    /// Recognize the text in a single image.
    async fn recognize(&self, input: RecognitionInput) -> Result<String>;
}

/// Get the recognition engine with the given name.
///
/// Engines that need credentials validate them here, once, before any
/// conversion or recognition work starts.
pub async fn engine_for_name(name: &str) -> Result<Arc<dyn RecognitionEngine>> {
    match name {
        "vision" => Ok(Arc::new(vision::VisionEngine::new().await?)),
        "tesseract" => Ok(Arc::new(tesseract::TesseractEngine::new())),
        "echo" => Ok(Arc::new(echo::EchoEngine::new())),
        _ => Err(anyhow!(
            "unknown recognition engine {:?} (expected vision, tesseract or echo)",
            name
        )),
    }
}
