use crate::openai::OpenAIClientTrait;
use anyhow::Result;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    CreateChatCompletionRequest, CreateChatCompletionResponse,
};
use async_openai::Client;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

// A real implementation of the OpenAI client
pub struct RealOpenAIClient {
    client: Client<OpenAIConfig>,
}

impl RealOpenAIClient {
    pub fn new(client: Client<OpenAIConfig>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OpenAIClientTrait for RealOpenAIClient {
    async fn chat_completion(
        &self,
        request: CreateChatCompletionRequest,
    ) -> Result<CreateChatCompletionResponse, anyhow::Error> {
        let response = self.client.chat().create(request).await?;
        Ok(response)
    }
}

/// Builds a client from the configured credentials.
///
/// Fails when the key is absent, blank, or the literal `None` that an empty
/// `.env` entry tends to produce.
pub fn maybe_create_openai_client(
    api_key: Option<String>,
    api_base: Option<String>,
) -> Result<Arc<dyn OpenAIClientTrait>> {
    let api_key = api_key
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty() && key != "None")
        .ok_or_else(|| {
            anyhow::anyhow!(
                "OPENAI_API_KEY is missing or invalid. Set it in .env or environment."
            )
        })?;

    let mut config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(api_base) = api_base.filter(|base| !base.trim().is_empty()) {
        info!("Using OpenAI API base {}", api_base);
        config = config.with_api_base(api_base);
    }

    Ok(Arc::new(RealOpenAIClient::new(Client::with_config(config))))
}
