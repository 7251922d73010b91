//! Kangui - Lecture Analysis Assistant
//!
//! Turns a recorded lecture into study material: the audio is transcribed
//! with OpenAI Whisper and the transcript is analyzed by a chat model into a
//! Korean summary, three key concepts and a three-question review quiz.
//!
//! # Architecture
//!
//! - `config` - Configuration and prompt templates
//! - `credential` - The OpenAI key, redacted in all output
//! - `upload` - Uploaded audio and its transient on-disk copy
//! - `transcription` - Speech-to-text stage
//! - `analysis` - Learning-material generation stage
//! - `failure` - Typed stage failures and their user-facing messages
//! - `orchestrator` - Pipeline coordination
//! - `web` - Upload form and JSON API
//! - `cli` - Command-line interface
//!
//! # Example
//!
//! ```rust,no_run
//! use kangui::analysis::{AnalysisParameters, LearningLevel};
//! use kangui::config::Settings;
//! use kangui::credential::Credential;
//! use kangui::orchestrator::Orchestrator;
//! use kangui::upload::AudioUpload;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(&settings, Credential::new("sk-..."))?;
//!
//!     let upload = AudioUpload::from_path("lecture.mp3".as_ref()).await?;
//!     let params = AnalysisParameters::new(LearningLevel::High, "물리학");
//!     let report = orchestrator.process_upload(&upload, &params).await;
//!
//!     if let Some(analysis) = report.outcome.analysis() {
//!         println!("{}", analysis.markdown);
//!     }
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod credential;
pub mod error;
pub mod failure;
pub mod openai;
pub mod orchestrator;
pub mod transcription;
pub mod upload;
pub mod web;

pub use error::{KanguiError, Result};
