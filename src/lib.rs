use crate::openai::OpenAIClientTrait;
use crate::plan::{DisplayRules, HealthPlanner, PlannerSettings};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub mod app;
pub mod cli;
pub mod openai;
pub mod plan;
pub mod profile;
pub mod prompts;
pub mod render;

pub mod test_utils;

pub const DEFAULT_PLAN_TIMEOUT: Duration = Duration::from_secs(90);

// Shared by every request; nothing in here changes after startup.
pub struct AppState {
    pub planner: Option<HealthPlanner>,
    pub display_rules: DisplayRules,
    pub plan_timeout: Duration,
}

impl AppState {
    // Create a new AppState for testing with minimal configuration
    pub fn new_for_testing_with_openai_client(
        openai_client: Option<Arc<dyn OpenAIClientTrait>>,
    ) -> Self {
        Self {
            planner: openai_client.map(|client| {
                HealthPlanner::new(client, PlannerSettings::default())
            }),
            display_rules: DisplayRules::default(),
            plan_timeout: Duration::from_secs(5),
        }
    }
}

// Create a config struct to hold AppState configuration
pub struct AppConfig {
    pub openai_client: Arc<dyn OpenAIClientTrait>,
    pub planner_settings: PlannerSettings,
    pub plan_timeout: Duration,
}

// Function to create AppState from parameters
pub fn create_app_state(config: AppConfig) -> Arc<AppState> {
    info!(
        "Health plans use model {} at temperature {}",
        config.planner_settings.model, config.planner_settings.temperature
    );

    Arc::new(AppState {
        planner: Some(HealthPlanner::new(
            config.openai_client,
            config.planner_settings,
        )),
        display_rules: DisplayRules::default(),
        plan_timeout: config.plan_timeout,
    })
}
