//! Analysis stage.
//!
//! Sends an assembled prompt to a chat-completion backend and returns the
//! Markdown-formatted summary, key concepts and quiz.

mod openai;
mod params;

pub use openai::ChatAnalyzer;
pub use params::{AnalysisParameters, LearningLevel, FIELD_PLACEHOLDER};

use crate::config::{AnalysisSettings, Prompts};
use crate::credential::Credential;
use crate::failure::{Failure, FailureKind, Stage, StageOutcome};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Markdown produced by the analysis stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub markdown: String,
}

/// A single chat-completion request: one system and one user message.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Backend performing a single chat-completion request.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Return the text content of the first completion choice.
    async fn complete(
        &self,
        request: &CompletionRequest,
        credential: &Credential,
    ) -> std::result::Result<String, FailureKind>;
}

/// The analysis stage of the pipeline.
#[derive(Clone)]
pub struct AnalysisStage {
    analyzer: Arc<dyn Analyzer>,
    settings: AnalysisSettings,
    system: String,
}

impl AnalysisStage {
    pub fn new(analyzer: Arc<dyn Analyzer>, settings: AnalysisSettings, prompts: &Prompts) -> Self {
        Self {
            analyzer,
            settings,
            system: prompts.analysis.system.clone(),
        }
    }

    /// Run the analysis for an already assembled `prompt`.
    ///
    /// The prompt is passed through unchanged; only the credential is checked.
    #[instrument(skip(self, prompt, credential), fields(model = %self.settings.model, prompt_len = prompt.len()))]
    pub async fn run(&self, prompt: &str, credential: &Credential) -> StageOutcome<AnalysisResult> {
        if credential.is_blank() {
            return Err(Failure::new(Stage::Analysis, FailureKind::MissingCredential));
        }

        let request = CompletionRequest {
            model: self.settings.model.clone(),
            system: self.system.clone(),
            prompt: prompt.to_string(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        info!("Requesting lecture analysis");
        match self.analyzer.complete(&request, credential).await {
            Ok(text) => {
                info!("Analysis complete ({} chars)", text.len());
                Ok(AnalysisResult {
                    markdown: text.trim().to_string(),
                })
            }
            Err(kind) => {
                let failure = Failure::new(Stage::Analysis, kind);
                warn!("Analysis failed: {}", failure);
                Err(failure)
            }
        }
    }
}
