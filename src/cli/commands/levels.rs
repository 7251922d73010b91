//! Levels command implementation.

use crate::analysis::LearningLevel;
use crate::cli::Output;

/// List the learning levels accepted by `analyze --level`.
pub fn run_levels() {
    Output::header("Learning levels");
    for level in LearningLevel::ALL {
        let marker = if level == LearningLevel::default() { " (default)" } else { "" };
        Output::kv(level.slug(), &format!("{}{}", level.label(), marker));
    }
}
