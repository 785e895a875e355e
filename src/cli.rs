use crate::plan::{PlannerSettings, DEFAULT_PLAN_MODEL};
use clap::Parser;

/// Model settings shared by the server and the sample binary
#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL
    #[arg(long, env = "OPENAI_API_BASE")]
    pub openai_api_base: Option<String>,

    /// Model used to write health plans
    #[arg(long, env = "HEALTH_PLAN_MODEL", default_value = DEFAULT_PLAN_MODEL)]
    pub model: String,

    /// Sampling temperature for plan generation
    #[arg(long, default_value_t = 0.3)]
    pub temperature: f32,
}

impl CommonArgs {
    pub fn planner_settings(&self) -> PlannerSettings {
        PlannerSettings {
            model: self.model.clone(),
            temperature: self.temperature,
        }
    }
}
