use crate::openai::OpenAIClientTrait;
use crate::profile::ChildHealthProfile;
use crate::prompts::{build_user_prompt, HEALTH_PLAN_SYSTEM_PROMPT};
use crate::render::{format_key, render_value};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    ResponseFormat,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_PLAN_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_PLAN_TEMPERATURE: f32 = 0.3;
pub const SCORE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=100.0;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("model request failed: {0}")]
    Upstream(anyhow::Error),
    #[error("model reply is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("model reply had no content")]
    EmptyReply,
    #[error("model reply is JSON but not an object")]
    NotAnObject,
}

impl PlanError {
    /// True for every way the reply itself can be unusable.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            PlanError::Parse(_) | PlanError::EmptyReply | PlanError::NotAnObject
        )
    }
}

#[derive(Debug, Clone)]
pub struct PlannerSettings {
    pub model: String,
    pub temperature: f32,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_PLAN_MODEL.to_string(),
            temperature: DEFAULT_PLAN_TEMPERATURE,
        }
    }
}

/// Turns a profile into a parsed plan with a single model call.
#[derive(Clone)]
pub struct HealthPlanner {
    client: Arc<dyn OpenAIClientTrait>,
    settings: PlannerSettings,
}

impl HealthPlanner {
    pub fn new(
        client: Arc<dyn OpenAIClientTrait>,
        settings: PlannerSettings,
    ) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    #[instrument(skip(self, profile), fields(model = %self.settings.model), err)]
    pub async fn generate(
        &self,
        profile: &ChildHealthProfile,
    ) -> Result<HealthPlan, PlanError> {
        let start_time = std::time::Instant::now();

        debug!("Building health plan messages");
        let system_message = ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(HEALTH_PLAN_SYSTEM_PROMPT)
                .build()
                .map_err(|e| PlanError::Upstream(e.into()))?,
        );
        let user_message = ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(build_user_prompt(profile))
                .build()
                .map_err(|e| PlanError::Upstream(e.into()))?,
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.settings.model.as_str())
            .temperature(self.settings.temperature)
            .response_format(ResponseFormat::JsonObject)
            .messages([system_message, user_message])
            .build()
            .map_err(|e| PlanError::Upstream(e.into()))?;

        let response = self
            .client
            .chat_completion(request)
            .await
            .map_err(PlanError::Upstream)?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(PlanError::EmptyReply)?;

        info!(
            "Health plan reply received in {} ms",
            start_time.elapsed().as_millis()
        );

        HealthPlan::from_reply(&content)
    }
}

/// The parsed model reply. Section order is the order the model wrote them.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthPlan {
    sections: Map<String, Value>,
}

impl HealthPlan {
    pub fn from_reply(content: &str) -> Result<Self, PlanError> {
        match serde_json::from_str::<Value>(content)? {
            Value::Object(sections) => Ok(Self { sections }),
            other => {
                warn!(
                    "Model replied with non-object JSON: {}",
                    type_name(&other)
                );
                Err(PlanError::NotAnObject)
            }
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.sections
    }

    /// The wellness score, when the plan has one that reads as a whole number.
    pub fn wellness_score(&self, rules: &DisplayRules) -> Option<i64> {
        self.sections
            .iter()
            .filter(|(key, _)| rules.is_score_key(key))
            .find_map(|(_, value)| parse_score(value))
    }

    /// Every top-level entry that should be shown, rendered for display.
    pub fn sections(&self, rules: &DisplayRules) -> Vec<PlanSection> {
        self.sections
            .iter()
            .filter(|(key, value)| {
                if rules.is_hidden_key(key) {
                    return false;
                }
                // An unreadable score is still worth showing as text.
                !(rules.is_score_key(key) && parse_score(value).is_some())
            })
            .map(|(key, value)| PlanSection::new(key, value))
            .collect()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// Only scores inside 0..=100 count; anything else is shown as plain text.
fn parse_score(value: &Value) -> Option<i64> {
    let score = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => {
            text.replace('%', "").trim().parse::<i64>().ok()? as f64
        }
        _ => return None,
    };
    SCORE_RANGE
        .contains(&score)
        .then(|| score.trunc() as i64)
}

/// The two response keys the display treats specially. Kept apart from the
/// renderer, which knows nothing about plan semantics.
#[derive(Debug, Clone)]
pub struct DisplayRules {
    /// Compared against the lowercased `format_key` label.
    pub score_label: String,
    /// Matched exactly.
    pub hidden_keys: Vec<String>,
}

impl Default for DisplayRules {
    fn default() -> Self {
        Self {
            score_label: "wellness score".to_string(),
            hidden_keys: vec!["childProfile".to_string()],
        }
    }
}

impl DisplayRules {
    pub fn is_score_key(&self, key: &str) -> bool {
        format_key(key).to_lowercase() == self.score_label
    }

    pub fn is_hidden_key(&self, key: &str) -> bool {
        self.hidden_keys.iter().any(|hidden| hidden == key)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanSection {
    pub key: String,
    pub title: String,
    pub markdown: String,
    pub html: String,
}

impl PlanSection {
    fn new(key: &str, value: &Value) -> Self {
        let mut body = render_value(value, 0);
        if body.is_empty() && !value.is_string() {
            body = value.to_string();
        }
        Self {
            key: key.to_string(),
            title: format_key(key),
            html: markdown::to_html(&body),
            markdown: body,
        }
    }
}
