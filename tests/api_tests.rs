use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use health_companion::openai::fake::FakeOpenAIClient;
use health_companion::openai::OpenAIClientTrait;
use health_companion::prompts::HEALTH_PLAN_SYSTEM_PROMPT;
use health_companion::AppState;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::sync::Once;
use tower::util::ServiceExt;
use tracing::debug;

// Initialize logging once for all tests
static INIT: Once = Once::new();

fn init_test_logging() {
    INIT.call_once(|| {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info,tower_http=debug".into()),
            )
            .with_test_writer()
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");

        debug!("Test logging initialized");
    });
}

const SAMPLE_PLAN: &str = r#"{
    "childProfile": {"name": "Aarav", "age": 10},
    "Wellness Score": 68,
    "dailyWellnessPlan": ["Wake up at 7:00", "30 minutes of outdoor play"],
    "nutritionAdvice": {
        "breakfast": "Oats and fruit",
        "snacks": ["Nuts", "Yogurt"]
    },
    "risk_assessment": "Low activity and high screen time"
}"#;

const FILLED_FORM: &str = "name=Aarav&age=10&gender=Male&height_cm=138&weight_kg=42\
&sleep_hours=7&screen_time_hours=4&physical_activity_level=Low\
&eating_habits=Prefers+junk+food&mood=Often+tired&symptoms=";

/// Create a test app backed by the given fake model
fn app_with_client(client: Option<Arc<FakeOpenAIClient>>) -> Router {
    let client = client.map(|c| c as Arc<dyn OpenAIClientTrait>);
    let app_state =
        Arc::new(AppState::new_for_testing_with_openai_client(client));
    health_companion::app::routes(app_state)
}

fn form_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/plan")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn json_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/plan")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn sample_profile_json() -> Value {
    json!({
        "name": "Aarav",
        "age": 10,
        "gender": "Male",
        "height_cm": 138.0,
        "weight_kg": 42.0,
        "sleep_hours": 7.0,
        "screen_time_hours": 4.0,
        "physical_activity_level": "Low",
        "eating_habits": "Prefers junk food, low vegetables",
        "mood": "Often tired"
    })
}

async fn body_text(response: axum::response::Response) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(body.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    init_test_logging();
    let router = app_with_client(None);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn test_not_found() {
    init_test_logging();
    let router = app_with_client(None);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/does-not-exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_form_page_has_defaults() {
    init_test_logging();
    let router = app_with_client(None);

    let response = router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Child profile"));
    assert!(html.contains(r#"name="age" value="10""#));
    assert!(html.contains(r#"min="1" max="18""#));
    assert!(html.contains(r#"<option value="Moderate">Moderate</option>"#));
    assert!(html.contains("Generate health plan"));
}

#[tokio::test]
async fn test_form_submission_renders_plan() {
    init_test_logging();
    let client = Arc::new(FakeOpenAIClient::new().with_response(SAMPLE_PLAN));
    let router = app_with_client(Some(client.clone()));

    let response = router.oneshot(form_request(FILLED_FORM)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Aarav’s personalized health plan"));
    assert!(html.contains("68/100"));
    assert!(html.contains("<h3>Daily Wellness Plan</h3>"));
    assert!(html.contains("<h3>Nutrition Advice</h3>"));
    assert!(html.contains("<h3>Risk Assessment</h3>"));
    assert!(html.contains("Oats and fruit"));
    assert!(html.contains("Yogurt"));
    assert!(!html.contains("<h3>Child Profile</h3>"));
    assert!(!html.contains("<h3>Wellness Score</h3>"));
    assert!(html.contains("Always consult a healthcare provider"));

    let requests = client.recorded_requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].json_response);
    assert_eq!(
        requests[0].system_prompt.as_deref(),
        Some(HEALTH_PLAN_SYSTEM_PROMPT)
    );
    let user_prompt = requests[0].user_prompt.clone().unwrap();
    assert!(user_prompt.contains("Height: 138.0 cm"));
    assert!(user_prompt.contains("Eating Habits: Prefers junk food"));
    assert!(user_prompt.contains("Symptoms: None"));
}

#[tokio::test]
async fn test_blank_name_is_rejected_without_calling_model() {
    init_test_logging();
    let client = Arc::new(FakeOpenAIClient::new());
    let router = app_with_client(Some(client.clone()));

    let body = FILLED_FORM.replace("name=Aarav", "name=");
    let response = router.oneshot(form_request(&body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    assert!(html.contains("Please enter the child"));
    // Entered values are kept
    assert!(html.contains("Often tired"));
    assert!(client.recorded_requests().is_empty());
}

#[tokio::test]
async fn test_missing_mood_is_rejected() {
    init_test_logging();
    let client = Arc::new(FakeOpenAIClient::new());
    let router = app_with_client(Some(client.clone()));

    let body = FILLED_FORM.replace("mood=Often+tired", "mood=");
    let response = router.oneshot(form_request(&body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    assert!(html.contains("Please fill in eating habits and mood."));
    assert!(client.recorded_requests().is_empty());
}

#[tokio::test]
async fn test_non_json_reply_shows_error_and_server_keeps_serving() {
    init_test_logging();
    let client = Arc::new(
        FakeOpenAIClient::new()
            .with_response("I'm sorry, I can only answer in prose.")
            .with_response(SAMPLE_PLAN),
    );
    let router = app_with_client(Some(client));

    let response = router
        .clone()
        .oneshot(form_request(FILLED_FORM))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let html = body_text(response).await;
    assert!(html.contains("Something went wrong"));
    assert!(html.contains("not valid JSON"));

    let response = router.oneshot(form_request(FILLED_FORM)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("68/100"));
}

#[tokio::test]
async fn test_upstream_failure_is_reported() {
    init_test_logging();
    let client =
        Arc::new(FakeOpenAIClient::new().with_error("connection refused"));
    let router = app_with_client(Some(client));

    let response = router.oneshot(form_request(FILLED_FORM)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let html = body_text(response).await;
    assert!(html.contains("Something went wrong: model request failed"));
    assert!(html.contains("connection refused"));
}

#[tokio::test]
async fn test_form_without_model_client() {
    init_test_logging();
    let router = app_with_client(None);

    let response = router.oneshot(form_request(FILLED_FORM)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(body_text(response).await.contains("not configured"));
}

#[tokio::test]
async fn test_api_plan_returns_sections_in_order() {
    init_test_logging();
    let client = Arc::new(FakeOpenAIClient::new().with_response(SAMPLE_PLAN));
    let router = app_with_client(Some(client));

    let response = router
        .oneshot(json_request(sample_profile_json()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["wellness_score"], json!(68));

    let titles: Vec<&str> = body["sections"]
        .as_array()
        .unwrap()
        .iter()
        .map(|section| section["title"].as_str().unwrap())
        .collect();
    assert_eq!(
        titles,
        vec!["Daily Wellness Plan", "Nutrition Advice", "Risk Assessment"]
    );
    assert_eq!(
        body["sections"][1]["markdown"],
        json!(
            "- **Breakfast:** Oats and fruit\n\n**Snacks**\n\n- Nuts\n- Yogurt"
        )
    );
    assert_eq!(body["plan"]["childProfile"]["name"], json!("Aarav"));
}

#[tokio::test]
async fn test_api_plan_parse_error() {
    init_test_logging();
    let client =
        Arc::new(FakeOpenAIClient::new().with_response("not json at all"));
    let router = app_with_client(Some(client));

    let response = router
        .oneshot(json_request(sample_profile_json()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Something went wrong: model reply is not valid JSON"));
}

#[tokio::test]
async fn test_plan_with_empty_list_items_renders() {
    init_test_logging();
    let reply = r#"{"dailyWellnessPlan": ["Wake at 7", "", "Walk"]}"#;
    let client = Arc::new(
        FakeOpenAIClient::new()
            .with_response(reply)
            .with_response(reply),
    );
    let router = app_with_client(Some(client));

    let response = router
        .clone()
        .oneshot(form_request(FILLED_FORM))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("<h3>Daily Wellness Plan</h3>"));
    assert!(html.contains("Wake at 7"));
    assert!(html.contains("Walk"));

    let response = router
        .oneshot(json_request(sample_profile_json()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(
        body["sections"][0]["markdown"],
        json!("- Wake at 7\n- \n- Walk")
    );
}

// Exercise the router over a real socket
#[tokio::test]
async fn test_with_real_server() {
    init_test_logging();
    use tokio::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let client = Arc::new(
        FakeOpenAIClient::new().with_response(r#"{"wellnessScore": "82%"}"#),
    );
    let router = app_with_client(Some(client));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let http = reqwest::Client::new();

    let response = http
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");

    let response = http
        .post(format!("http://{}/api/plan", addr))
        .json(&sample_profile_json())
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["wellness_score"], json!(82));
    assert_eq!(body["sections"], json!([]));
}
