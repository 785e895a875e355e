use crate::cli::CommonArgs;
use crate::openai::real::maybe_create_openai_client;
use crate::plan::{HealthPlan, PlanError, PlanSection};
use crate::profile::{
    ChildHealthProfile, ProfileForm, ACTIVITY_LEVEL_OPTIONS, AGE_RANGE,
    GENDER_OPTIONS, HEIGHT_CM_RANGE, SCREEN_TIME_HOURS_RANGE,
    SLEEP_HOURS_RANGE, WEIGHT_KG_RANGE,
};
use crate::AppState;
use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use clap::Parser;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;
use tera::{Context as TeraContext, Tera};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{prelude::*, Registry};
use tracing_tree::HierarchicalLayer;

// Add build-time information
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const DISCLAIMER: &str = "This is AI-generated guidance. Always consult a healthcare provider for medical decisions.";

#[derive(Parser, Debug)]
#[command(author, version, about = "Pediatric AI health companion")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Port to listen on
    #[arg(long, default_value_t = 3010)]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Seconds to wait for the model before giving up on a plan
    #[arg(long, default_value_t = crate::DEFAULT_PLAN_TIMEOUT.as_secs())]
    plan_timeout_secs: u64,
}

pub async fn health_check() -> &'static str {
    "OK"
}

fn get_build_info() -> String {
    let mut parts = vec![format!("Version {}", built_info::PKG_VERSION)];

    if let Some(commit) = built_info::GIT_COMMIT_HASH_SHORT {
        let dirty = built_info::GIT_DIRTY.unwrap_or(false);
        parts.push(format!(
            "Commit {}{}",
            commit,
            if dirty { " (dirty)" } else { "" }
        ));
    }
    parts.push(format!("Built {}", built_info::BUILT_TIME_UTC));
    parts.push(format!("Profile {}", built_info::PROFILE));

    parts.join(" • ")
}

static TEMPLATES: OnceLock<Tera> = OnceLock::new();

fn init_templates() -> Tera {
    let mut tera = Tera::default();
    tera.add_raw_template("base.html", include_str!("templates/base.html"))
        .expect("base.html is a valid template");
    tera.add_raw_template("form.html", include_str!("templates/form.html"))
        .expect("form.html is a valid template");
    tera.add_raw_template("plan.html", include_str!("templates/plan.html"))
        .expect("plan.html is a valid template");
    tera
}

pub fn ensure_templates() {
    TEMPLATES.get_or_init(init_templates);
}

fn render_template(name: &str, context: &TeraContext) -> String {
    TEMPLATES
        .get_or_init(init_templates)
        .render(name, context)
        .unwrap_or_else(|e| {
            error!("Failed to render {}: {}", name, e);
            format!("Template error: {}", e)
        })
}

#[derive(Debug, Serialize)]
struct NumberField {
    name: &'static str,
    label: &'static str,
    min: String,
    max: String,
    step: &'static str,
    value: String,
}

fn number_fields(form: &ProfileForm) -> Vec<NumberField> {
    vec![
        NumberField {
            name: "age",
            label: "Age (years)",
            min: AGE_RANGE.start().to_string(),
            max: AGE_RANGE.end().to_string(),
            step: "1",
            value: form.age.clone(),
        },
        NumberField {
            name: "height_cm",
            label: "Height (cm)",
            min: HEIGHT_CM_RANGE.start().to_string(),
            max: HEIGHT_CM_RANGE.end().to_string(),
            step: "0.5",
            value: form.height_cm.clone(),
        },
        NumberField {
            name: "weight_kg",
            label: "Weight (kg)",
            min: WEIGHT_KG_RANGE.start().to_string(),
            max: WEIGHT_KG_RANGE.end().to_string(),
            step: "0.1",
            value: form.weight_kg.clone(),
        },
        NumberField {
            name: "sleep_hours",
            label: "Sleep (hours/night)",
            min: SLEEP_HOURS_RANGE.start().to_string(),
            max: SLEEP_HOURS_RANGE.end().to_string(),
            step: "0.5",
            value: form.sleep_hours.clone(),
        },
        NumberField {
            name: "screen_time_hours",
            label: "Screen time (hours/day)",
            min: SCREEN_TIME_HOURS_RANGE.start().to_string(),
            max: SCREEN_TIME_HOURS_RANGE.end().to_string(),
            step: "0.5",
            value: form.screen_time_hours.clone(),
        },
    ]
}

fn form_page(
    status: StatusCode,
    form: &ProfileForm,
    warning: Option<String>,
    error: Option<String>,
) -> Response {
    let mut context = TeraContext::new();
    context.insert("build_info", &get_build_info());
    context.insert("form", form);
    context.insert("number_fields", &number_fields(form));
    context.insert("gender_options", GENDER_OPTIONS);
    context.insert("activity_options", ACTIVITY_LEVEL_OPTIONS);
    if let Some(warning) = warning {
        context.insert("warning", &warning);
    }
    if let Some(error) = error {
        context.insert("error", &error);
    }

    (status, Html(render_template("form.html", &context))).into_response()
}

#[axum::debug_handler]
async fn profile_form_page() -> Response {
    form_page(StatusCode::OK, &ProfileForm::default(), None, None)
}

// Runs the planner under the configured deadline. Failures come back as a
// status and the message shown to the parent.
async fn generate_plan(
    state: &AppState,
    profile: &ChildHealthProfile,
) -> Result<HealthPlan, (StatusCode, String)> {
    let planner = state.planner.as_ref().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "Health plan generation is not configured".to_string(),
        )
    })?;

    let result =
        match tokio::time::timeout(state.plan_timeout, planner.generate(profile))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(PlanError::Upstream(anyhow::anyhow!(
                "no reply within {} seconds",
                state.plan_timeout.as_secs()
            ))),
        };

    result.map_err(|e| {
        if e.is_parse_error() {
            warn!("Unusable health plan reply: {}", e);
        } else {
            error!("Health plan request failed: {}", e);
        }
        (StatusCode::BAD_GATEWAY, format!("Something went wrong: {}", e))
    })
}

#[derive(Debug, Serialize)]
struct PlanResponse {
    wellness_score: Option<i64>,
    sections: Vec<PlanSection>,
    plan: Value,
}

#[axum::debug_handler]
async fn submit_profile(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ProfileForm>,
) -> Response {
    let profile = match form.validate() {
        Ok(profile) => profile,
        Err(e) => {
            info!("Rejected profile form: {}", e);
            return form_page(
                StatusCode::UNPROCESSABLE_ENTITY,
                &form,
                Some(e.to_string()),
                None,
            );
        }
    };

    let plan = match generate_plan(&state, &profile).await {
        Ok(plan) => plan,
        Err((status, message)) => {
            return form_page(status, &form, None, Some(message));
        }
    };

    let mut context = TeraContext::new();
    context.insert("build_info", &get_build_info());
    context.insert("child_name", &profile.name);
    if let Some(score) = plan.wellness_score(&state.display_rules) {
        context.insert("wellness_score", &score);
    }
    context.insert("sections", &plan.sections(&state.display_rules));
    context.insert("disclaimer", DISCLAIMER);

    Html(render_template("plan.html", &context)).into_response()
}

#[axum::debug_handler]
async fn api_generate_plan(
    State(state): State<Arc<AppState>>,
    Json(profile): Json<ChildHealthProfile>,
) -> Result<Json<PlanResponse>, (StatusCode, Json<Value>)> {
    let plan = generate_plan(&state, &profile)
        .await
        .map_err(|(status, message)| {
            (status, Json(json!({ "error": message })))
        })?;

    Ok(Json(PlanResponse {
        wellness_score: plan.wellness_score(&state.display_rules),
        sections: plan.sections(&state.display_rules),
        plan: Value::Object(plan.as_map().clone()),
    }))
}

pub fn routes(state: Arc<AppState>) -> Router {
    let compression_layer =
        CompressionLayer::new().br(true).deflate(true).gzip(true);

    Router::new()
        .route("/", get(profile_form_page))
        .route("/plan", post(submit_profile))
        .route("/api/plan", post(api_generate_plan))
        .route("/health", get(health_check))
        .layer(compression_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve() -> Result<()> {
    // Initialize logging with tracing
    let subscriber = Registry::default()
        .with(
            HierarchicalLayer::new(2)
                .with_targets(true)
                .with_bracketed_fields(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        );
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Starting health companion");

    let openai_client = maybe_create_openai_client(
        args.common.openai_api_key.clone(),
        args.common.openai_api_base.clone(),
    )
    .inspect_err(|e| error!("Invalid model configuration: {}", e))?;

    let state = crate::create_app_state(crate::AppConfig {
        openai_client,
        planner_settings: args.common.planner_settings(),
        plan_timeout: Duration::from_secs(args.plan_timeout_secs),
    });

    ensure_templates();

    let app = routes(state);
    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Received CTRL-C, shutting down");
            }
        })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
