use anyhow::Result;
use async_openai::types::{
    ChatChoice, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageContent,
    ChatCompletionRequestUserMessageContent, ChatCompletionResponseMessage,
    CompletionUsage, CreateChatCompletionRequest,
    CreateChatCompletionResponse, FinishReason, ResponseFormat, Role,
};
use async_trait::async_trait;
use std::sync::Mutex;

use crate::openai::{ModelRequest, OpenAIClientTrait};

/// Returned once the queued replies run out.
pub const DEFAULT_FAKE_REPLY: &str = "{}";

enum FakeReply {
    Content(Option<String>),
    Error(String),
}

/// A fake implementation of the OpenAI client for testing
///
/// Replies are queued with the builder methods and handed out in order.
/// Every request is recorded so tests can check the prompts that were sent.
///
/// # Example
///
/// ```
/// use health_companion::openai::OpenAIClientTrait;
/// use health_companion::openai::fake::FakeOpenAIClient;
/// use async_openai::types::{
///     ChatCompletionRequestMessage, CreateChatCompletionRequestArgs,
/// };
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = FakeOpenAIClient::new()
///         .with_response(r#"{"wellnessScore": 75}"#);
///
///     let request = CreateChatCompletionRequestArgs::default()
///         .model("gpt-4o-mini")
///         .messages(Vec::<ChatCompletionRequestMessage>::new())
///         .build()?;
///     let response = client.chat_completion(request).await?;
///
///     let content = response.choices.first()
///         .and_then(|choice| choice.message.content.as_ref())
///         .map(String::from)
///         .unwrap_or_default();
///     assert_eq!(content, r#"{"wellnessScore": 75}"#);
///     Ok(())
/// }
/// ```
pub struct FakeOpenAIClient {
    replies: Mutex<Vec<FakeReply>>,
    // Track requests for verification in tests
    pub requests: Mutex<Vec<ModelRequest>>,
}

impl Default for FakeOpenAIClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeOpenAIClient {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(vec![]),
            requests: Mutex::new(vec![]),
        }
    }

    /// Add a response to be returned by the fake client
    pub fn with_response(self, response: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push(FakeReply::Content(Some(response.to_string())));
        self
    }

    /// Configure the client to return a response with None content
    pub fn with_none_content_response(self) -> Self {
        self.replies.lock().unwrap().push(FakeReply::Content(None));
        self
    }

    /// Configure the client to fail the next call, as a network or auth
    /// failure would
    pub fn with_error(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push(FakeReply::Error(message.to_string()));
        self
    }

    /// Snapshot of the requests seen so far
    pub fn recorded_requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn record(request: &CreateChatCompletionRequest) -> ModelRequest {
    let mut system_prompt = None;
    let mut user_prompt = None;
    for message in &request.messages {
        match message {
            ChatCompletionRequestMessage::System(system) => {
                if let ChatCompletionRequestSystemMessageContent::Text(text) =
                    &system.content
                {
                    system_prompt = Some(text.clone());
                }
            }
            ChatCompletionRequestMessage::User(user) => {
                if let ChatCompletionRequestUserMessageContent::Text(text) =
                    &user.content
                {
                    user_prompt = Some(text.clone());
                }
            }
            _ => {}
        }
    }

    ModelRequest {
        model_name: request.model.clone(),
        temperature: request.temperature,
        json_response: matches!(
            request.response_format,
            Some(ResponseFormat::JsonObject)
        ),
        system_prompt,
        user_prompt,
    }
}

#[async_trait]
impl OpenAIClientTrait for FakeOpenAIClient {
    #[allow(deprecated)]
    async fn chat_completion(
        &self,
        request: CreateChatCompletionRequest,
    ) -> Result<CreateChatCompletionResponse, anyhow::Error> {
        self.requests.lock().unwrap().push(record(&request));

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                FakeReply::Content(Some(DEFAULT_FAKE_REPLY.to_string()))
            } else {
                replies.remove(0)
            }
        };

        let content_option = match reply {
            FakeReply::Content(content) => content,
            FakeReply::Error(message) => {
                return Err(anyhow::anyhow!(message));
            }
        };

        let message = ChatCompletionResponseMessage {
            role: Role::Assistant,
            content: content_option,
            #[allow(deprecated)]
            function_call: None,
            tool_calls: None,
            #[allow(deprecated)]
            refusal: None,
            audio: None,
        };

        let chat_choice = ChatChoice {
            index: 0,
            message,
            finish_reason: Some(FinishReason::Stop),
            logprobs: None,
        };

        let usage = CompletionUsage {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            prompt_tokens_details: None,
            completion_tokens_details: None,
        };

        Ok(CreateChatCompletionResponse {
            id: "fake_id".to_string(),
            object: "chat.completion".to_string(),
            created: 0,
            model: request.model.clone(),
            system_fingerprint: Some("fake-fingerprint".to_string()),
            service_tier: None,
            choices: vec![chat_choice],
            usage: Some(usage),
        })
    }
}
