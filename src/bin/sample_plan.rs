use anyhow::Result;
use clap::Parser;
use health_companion::cli::CommonArgs;
use health_companion::openai::real::maybe_create_openai_client;
use health_companion::plan::{DisplayRules, HealthPlanner};
use health_companion::profile::ChildHealthProfile;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Generate a plan for a built-in sample child and print it
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let client = maybe_create_openai_client(
        cli.common.openai_api_key.clone(),
        cli.common.openai_api_base.clone(),
    )?;
    let planner = HealthPlanner::new(client, cli.common.planner_settings());
    info!("Generating sample plan with {}", planner.settings().model);

    let plan = planner.generate(&ChildHealthProfile::sample()).await?;
    let rules = DisplayRules::default();

    println!("\n🩺 AI Health Companion Report\n");
    if let Some(score) = plan.wellness_score(&rules) {
        println!("Wellness Score: {}/100\n", score);
    }
    for section in plan.sections(&rules) {
        println!("{}:\n{}\n", section.title, section.markdown);
    }

    Ok(())
}
