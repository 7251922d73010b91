//! OpenAI client configuration.

use crate::credential::Credential;
use crate::error::Result;
use async_openai::{config::OpenAIConfig, Client};
use backoff::ExponentialBackoffBuilder;
use std::time::Duration;

/// Default timeout for OpenAI API requests (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client for the given credential.
///
/// Each stage makes exactly one attempt, so the client's built-in
/// rate-limit backoff is switched off and a 429 surfaces immediately.
pub fn create_client(credential: &Credential, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    let no_retry = ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build();

    let config = OpenAIConfig::new().with_api_key(credential.expose());

    Ok(Client::with_config(config)
        .with_http_client(http_client)
        .with_backoff(no_retry))
}
