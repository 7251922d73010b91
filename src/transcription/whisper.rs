//! OpenAI Whisper transcription backend.

use super::Transcriber;
use crate::credential::Credential;
use crate::failure::{classify_openai_error, variant_name, FailureKind};
use crate::openai::create_client;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// OpenAI Whisper-based transcriber requesting plain-text output.
pub struct WhisperTranscriber {
    model: String,
    timeout: Duration,
}

impl WhisperTranscriber {
    /// Create a new Whisper transcriber with default settings.
    pub fn new() -> Self {
        Self::with_config("whisper-1", Duration::from_secs(crate::openai::DEFAULT_TIMEOUT_SECS))
    }

    /// Create a new Whisper transcriber with custom configuration.
    pub fn with_config(model: &str, timeout: Duration) -> Self {
        Self {
            model: model.to_string(),
            timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Default for WhisperTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self, credential), fields(audio_path = %audio_path.display(), model = %self.model))]
    async fn transcribe(
        &self,
        audio_path: &Path,
        credential: &Credential,
    ) -> std::result::Result<String, FailureKind> {
        let client = create_client(credential, self.timeout).map_err(|e| {
            warn!("Failed to create OpenAI client: {}", e);
            FailureKind::unexpected(e.category())
        })?;

        let file_bytes = tokio::fs::read(audio_path).await.map_err(|e| {
            warn!("Failed to read audio file: {}", e);
            FailureKind::unexpected(variant_name(&e.kind()))
        })?;

        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(file_name, file_bytes))
            .model(&self.model)
            .response_format(AudioResponseFormat::Text)
            .build()
            .map_err(|e| classify_openai_error(&e))?;

        debug!("Sending transcription request");
        let body = client.audio().transcribe_raw(request).await.map_err(|e| {
            warn!("Whisper API error: {}", e);
            classify_openai_error(&e)
        })?;

        String::from_utf8(body.to_vec()).map_err(|_| FailureKind::unexpected("Utf8Error"))
    }
}
