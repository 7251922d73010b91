//! User-chosen analysis parameters.

use crate::config::Prompts;
use crate::transcription::Transcript;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Placeholder substituted when no subject field was given.
pub const FIELD_PLACEHOLDER: &str = "지정되지 않음";

/// Target learning level for the generated material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LearningLevel {
    Elementary,
    Middle,
    High,
    #[default]
    CollegeGeneral,
    CollegeMajor,
    Expert,
}

impl LearningLevel {
    pub const ALL: [LearningLevel; 6] = [
        LearningLevel::Elementary,
        LearningLevel::Middle,
        LearningLevel::High,
        LearningLevel::CollegeGeneral,
        LearningLevel::CollegeMajor,
        LearningLevel::Expert,
    ];

    /// Korean label, as shown to users and embedded in the prompt.
    pub fn label(&self) -> &'static str {
        match self {
            LearningLevel::Elementary => "초등학생",
            LearningLevel::Middle => "중학생",
            LearningLevel::High => "고등학생",
            LearningLevel::CollegeGeneral => "대학생(교양)",
            LearningLevel::CollegeMajor => "대학생(전공)",
            LearningLevel::Expert => "전문가",
        }
    }

    /// Stable ASCII identifier, used in forms and on the command line.
    pub fn slug(&self) -> &'static str {
        match self {
            LearningLevel::Elementary => "elementary",
            LearningLevel::Middle => "middle",
            LearningLevel::High => "high",
            LearningLevel::CollegeGeneral => "college-general",
            LearningLevel::CollegeMajor => "college-major",
            LearningLevel::Expert => "expert",
        }
    }
}

impl std::str::FromStr for LearningLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        LearningLevel::ALL
            .into_iter()
            .find(|level| level.label() == s || level.slug().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown learning level: {}", s))
    }
}

impl std::fmt::Display for LearningLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Parameters interpolated into the analysis prompt. Never validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisParameters {
    pub level: LearningLevel,
    /// Subject field, e.g. "파이썬 머신러닝". Empty means unspecified.
    #[serde(default)]
    pub field: String,
}

impl AnalysisParameters {
    pub fn new(level: LearningLevel, field: impl Into<String>) -> Self {
        Self {
            level,
            field: field.into(),
        }
    }

    /// The subject field, or [`FIELD_PLACEHOLDER`] when empty.
    pub fn field_or_placeholder(&self) -> &str {
        let field = self.field.trim();
        if field.is_empty() {
            FIELD_PLACEHOLDER
        } else {
            field
        }
    }

    /// Build the analysis prompt for `transcript` from the configured template.
    pub fn build_prompt(&self, prompts: &Prompts, transcript: &Transcript) -> String {
        let mut vars = HashMap::new();
        vars.insert("field".to_string(), self.field_or_placeholder().to_string());
        vars.insert("level".to_string(), self.level.label().to_string());
        vars.insert("transcript".to_string(), transcript.as_str().to_string());

        prompts.render_with_custom(&prompts.analysis.user, &vars)
    }
}
