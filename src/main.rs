use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use push_hooks::config::PipelineConfig;
use push_hooks::persistence::LocalStore;
use push_hooks::pipeline::PushPipeline;
use push_hooks::server::{AppState, build_router};
use push_hooks::webhooks::HttpWebhookTransport;

#[derive(Debug, Parser)]
#[command(version, about = "Push-event pipeline for a git hosting service")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, env = "PUSH_HOOKS_CONFIG", default_value = "push-hooks.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "push_hooks=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = PipelineConfig::load(&args.config)?;

    let webhooks = HttpWebhookTransport::new(config.webhooks.clone(), config.webhook_timeout())?;
    let store = LocalStore::open(&config.state_dir, webhooks)
        .with_context(|| format!("opening store in {}", config.state_dir.display()))?;
    let tracker = config.tracker.build(store.clone())?;
    let pipeline = PushPipeline::new(store, tracker, config.base_url.clone());

    let app_state = AppState::new(pipeline, &config.repos_dir, config.push_secret.as_bytes());
    let app = build_router(app_state);

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;
    tracing::info!(addr = %config.listen, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
