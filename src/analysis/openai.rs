//! OpenAI chat-completion analysis backend.

use super::{Analyzer, CompletionRequest};
use crate::credential::Credential;
use crate::failure::{classify_openai_error, FailureKind};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Chat-completion analyzer backed by the OpenAI API.
pub struct ChatAnalyzer {
    timeout: Duration,
}

impl ChatAnalyzer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ChatAnalyzer {
    fn default() -> Self {
        Self::new(Duration::from_secs(crate::openai::DEFAULT_TIMEOUT_SECS))
    }
}

#[async_trait]
impl Analyzer for ChatAnalyzer {
    #[instrument(skip_all, fields(model = %request.model))]
    async fn complete(
        &self,
        request: &CompletionRequest,
        credential: &Credential,
    ) -> std::result::Result<String, FailureKind> {
        let client = create_client(credential, self.timeout).map_err(|e| {
            warn!("Failed to create OpenAI client: {}", e);
            FailureKind::unexpected(e.category())
        })?;

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system.clone())
                .build()
                .map_err(|e| classify_openai_error(&e))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt.clone())
                .build()
                .map_err(|e| classify_openai_error(&e))?
                .into(),
        ];

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&request.model)
            .messages(messages)
            .temperature(request.temperature)
            .max_completion_tokens(request.max_tokens)
            .build()
            .map_err(|e| classify_openai_error(&e))?;

        debug!("Sending chat completion request");
        let response = client.chat().create(chat_request).await.map_err(|e| {
            warn!("Chat completion API error: {}", e);
            classify_openai_error(&e)
        })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| FailureKind::unexpected("EmptyCompletion"))
    }
}
