//! Echo engine for testing.
//!
//! This engine "recognizes" a short description of each unit without reading
//! the image content. It lets the whole pipeline be exercised offline, with
//! deterministic output.

use async_trait::async_trait;

use crate::prelude::*;

use super::{RecognitionEngine, RecognitionInput};

/// Echo engine for testing.
#[derive(Debug)]
pub struct EchoEngine;

impl EchoEngine {
    /// Create a new echo engine.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RecognitionEngine for EchoEngine {
    async fn recognize(&self, input: RecognitionInput) -> Result<String> {
        Ok(format!("{} ({} bytes)", input.name, input.data.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_output_is_deterministic() {
        let engine = EchoEngine::new();
        let input = || RecognitionInput {
            name: "scan.png".to_owned(),
            index: 1,
            mime_type: "image/png".to_owned(),
            data: vec![0; 16],
        };
        let first = engine.recognize(input()).await.unwrap();
        let second = engine.recognize(input()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, "scan.png (16 bytes)");
    }
}
