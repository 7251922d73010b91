//! CLI module for Kangui.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::analysis::LearningLevel;
use clap::{Parser, Subcommand};

/// Kangui - Lecture Analysis Assistant
///
/// Transcribes a lecture recording with OpenAI Whisper and turns the transcript
/// into a Korean summary, key concepts and a review quiz.
#[derive(Parser, Debug)]
#[command(name = "kangui")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// OpenAI API key (overrides the config file)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcribe and analyze a lecture recording
    Analyze {
        /// Audio file (mp3, wav, m4a, ogg, flac, mpga, mpeg, webm)
        file: String,

        /// Target learning level (e.g. 고등학생, high, college-major)
        #[arg(short, long, default_value = "college-general")]
        level: LearningLevel,

        /// Lecture subject field (e.g. "파이썬 머신러닝")
        #[arg(short, long, default_value = "")]
        field: String,

        /// Also write the analysis Markdown to this file
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Start the web upload form and JSON API
    Serve {
        /// Host to bind to (default from config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (default from config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List the available learning levels
    Levels,

    /// Check configuration and environment
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "analysis.model")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
