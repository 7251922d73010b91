//! OpenAI credential handling.

use crate::config::Settings;
use std::fmt;

/// An opaque OpenAI bearer token.
///
/// The value is never printed: `Debug` and `Display` are redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Whether the credential is unusable (empty or whitespace only).
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// The raw token, for handing to the HTTP client.
    pub fn expose(&self) -> &str {
        self.0.trim()
    }

    /// Resolve the credential to use: an explicit value (CLI flag or the
    /// `OPENAI_API_KEY` environment variable) wins over the config file.
    /// Blank values are skipped.
    pub fn resolve(explicit: Option<&str>, settings: &Settings) -> Option<Self> {
        explicit
            .into_iter()
            .chain(settings.openai.api_key.as_deref())
            .map(Credential::new)
            .find(|c| !c.is_blank())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}
