pub mod fake;
pub mod real;

use anyhow::Result;
use async_openai::types::{
    CreateChatCompletionRequest, CreateChatCompletionResponse,
};
use async_trait::async_trait;

/// What a fake client saw for one request
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model_name: String,
    pub temperature: Option<f32>,
    pub json_response: bool,
    pub system_prompt: Option<String>,
    pub user_prompt: Option<String>,
}

/// A trait that abstracts OpenAI client functionality for testing
///
/// The planner only ever needs a single chat completion, so the trait takes
/// a fully built request and hands back the raw response. Both the real
/// client and [`fake::FakeOpenAIClient`] implement it.
#[async_trait]
pub trait OpenAIClientTrait: Send + Sync {
    /// Sends one chat completion request to the language model
    ///
    /// # Arguments
    /// * `request` - model, messages, temperature and response format
    ///
    /// # Returns
    /// The complete ChatCompletionResponse from the model, or an error when
    /// the call itself failed (network, auth, quota)
    async fn chat_completion(
        &self,
        request: CreateChatCompletionRequest,
    ) -> Result<CreateChatCompletionResponse, anyhow::Error>;
}
