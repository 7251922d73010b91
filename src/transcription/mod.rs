//! Transcription stage.
//!
//! [`TranscriptionStage`] checks the local preconditions (credential present,
//! audio file exists) and then hands the file to a [`Transcriber`] backend.
//! The production backend is [`WhisperTranscriber`].

mod whisper;

pub use whisper::WhisperTranscriber;

use crate::credential::Credential;
use crate::failure::{Failure, FailureKind, Stage, StageOutcome};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Plain-text transcript of an audio file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Transcript(String);

impl Transcript {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backend performing a single speech-to-text request.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio at `audio_path` to plain text.
    async fn transcribe(
        &self,
        audio_path: &Path,
        credential: &Credential,
    ) -> std::result::Result<String, FailureKind>;
}

/// The transcription stage of the pipeline.
#[derive(Clone)]
pub struct TranscriptionStage {
    transcriber: Arc<dyn Transcriber>,
}

impl TranscriptionStage {
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self { transcriber }
    }

    /// Transcribe the audio file at `audio_path`.
    ///
    /// Returns a failure without touching the backend when the credential is
    /// blank or the file does not exist.
    #[instrument(skip(self, credential), fields(audio_path = %audio_path.display()))]
    pub async fn run(&self, audio_path: &Path, credential: &Credential) -> StageOutcome<Transcript> {
        if credential.is_blank() {
            return Err(Failure::new(Stage::Transcription, FailureKind::MissingCredential));
        }
        if !audio_path.exists() {
            return Err(Failure::new(
                Stage::Transcription,
                FailureKind::AudioNotFound {
                    path: audio_path.to_path_buf(),
                },
            ));
        }

        info!("Transcribing audio");
        match self.transcriber.transcribe(audio_path, credential).await {
            Ok(text) => {
                info!("Transcription complete ({} chars)", text.len());
                Ok(Transcript::new(text.trim()))
            }
            Err(kind) => {
                let failure = Failure::new(Stage::Transcription, kind);
                warn!("Transcription failed: {}", failure);
                Err(failure)
            }
        }
    }
}
