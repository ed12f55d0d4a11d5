use anyhow::Context;

use userbase::{config::AppConfig, telemetry, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init();

    let config = AppConfig::from_env().context("load configuration")?;
    let state = AppState::init(&config)
        .await
        .context("initialize user store")?;

    tracing::info!(
        session_ttl_secs = state.authority.keys().ttl().as_secs(),
        reset_window_mins = state.authority.reset_window().whole_minutes(),
        "user store ready"
    );

    Ok(())
}
