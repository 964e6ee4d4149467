//! Recognition using the Google Cloud Vision API.

use std::env;

use async_trait::async_trait;
use google_cloud_vision_v1 as vision;
use serde::Deserialize;
use vision::{
    client::ImageAnnotator,
    model::{AnnotateImageRequest, Feature, Image, feature},
};

use crate::prelude::*;

use super::{RecognitionEngine, RecognitionInput};

/// Environment variable holding the service account credential document.
///
/// Note that this holds the JSON document itself, not a path to it, matching
/// how the original deployment provisions credentials.
const CREDENTIALS_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// The parts of a service account key we check before building a client, so
/// that a malformed credential document fails with a useful message instead
/// of a confusing API error later.
#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    #[serde(rename = "type")]
    key_type: String,
    #[allow(dead_code)]
    project_id: String,
    #[allow(dead_code)]
    client_email: String,
}

/// Recognition engine wrapping the Google Cloud Vision API.
pub struct VisionEngine {
    /// Our Vision API client.
    client: ImageAnnotator,
}

impl VisionEngine {
    /// Create a new `vision` engine.
    ///
    /// Credentials are parsed and validated once here, and the resulting
    /// client is reused for every unit in the run.
    pub async fn new() -> Result<Self> {
        let credentials_json = env::var(CREDENTIALS_VAR).map_err(|_| {
            anyhow!(
                "{} must be set to a service account credential document",
                CREDENTIALS_VAR
            )
        })?;
        let credentials_value: serde_json::Value = serde_json::from_str(&credentials_json)
            .with_context(|| format!("{} does not contain valid JSON", CREDENTIALS_VAR))?;
        let key: ServiceAccountKey = serde_json::from_value(credentials_value.clone())
            .with_context(|| {
                format!("{} is not a service account credential document", CREDENTIALS_VAR)
            })?;
        if key.key_type != "service_account" {
            return Err(anyhow!(
                "{} has credential type {:?}, expected \"service_account\"",
                CREDENTIALS_VAR,
                key.key_type
            ));
        }

        let credentials =
            google_cloud_auth::credentials::service_account::Builder::new(credentials_value)
                .build()
                .context("failed to build Google credentials")?;
        let client = ImageAnnotator::builder()
            .with_credentials(credentials)
            .build()
            .await
            .context("failed to create Vision API client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RecognitionEngine for VisionEngine {
    #[instrument(level = "debug", skip_all, fields(name = %input.name, index = %input.index))]
    async fn recognize(&self, input: RecognitionInput) -> Result<String> {
        // Build our request. Vision detects the image format from the bytes
        // themselves, so we don't pass the MIME type along.
        let request = AnnotateImageRequest::new()
            .set_image(Image::new().set_content(input.data))
            .set_features([
                Feature::new().set_type(feature::Type::DocumentTextDetection)
            ]);

        // Issue a single synchronous document-text-detection request.
        let response = self
            .client
            .batch_annotate_images()
            .set_requests([request])
            .send()
            .await
            .with_context(|| format!("Vision API request failed for {}", input.name))?;
        trace!(?response, "Vision response");

        let annotated = response.responses.into_iter().next().ok_or_else(|| {
            anyhow!("Vision API returned no response for {}", input.name)
        })?;
        if let Some(status) = &annotated.error {
            return Err(anyhow!(
                "Vision API error for {}: {}",
                input.name,
                status.message
            ));
        }

        // An absent annotation means the service found no text at all.
        let text = annotated
            .full_text_annotation
            .map(|annotation| annotation.text)
            .unwrap_or_default();
        debug!(%text, "Extracted text");
        Ok(text)
    }
}
