//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::config::Settings;
use crate::credential::Credential;
use crate::error::{KanguiError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Analysis needs a credential and a writable scratch directory.
    Analyze,
    /// The server needs a writable scratch directory. The key may come from the form.
    Serve,
}

/// Run pre-flight checks for the given operation.
///
/// Returns the credential to use, if one is configured.
pub fn check(
    operation: Operation,
    explicit_key: Option<&str>,
    settings: &Settings,
) -> Result<Option<Credential>> {
    check_scratch_dir(settings)?;

    let credential = Credential::resolve(explicit_key, settings);
    match operation {
        Operation::Analyze if credential.is_none() => Err(KanguiError::Config(
            "OpenAI API key not set. Use --api-key, export OPENAI_API_KEY='sk-...', or set openai.api_key in the config file".to_string(),
        )),
        _ => Ok(credential),
    }
}

/// Check that the scratch directory exists or can be created.
fn check_scratch_dir(settings: &Settings) -> Result<()> {
    let dir = settings.temp_dir();
    std::fs::create_dir_all(&dir).map_err(|e| {
        KanguiError::Config(format!(
            "Scratch directory {} is not usable: {}",
            dir.display(),
            e
        ))
    })
}
