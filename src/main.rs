use anyhow::Context;

mod app;
mod auth;
mod config;
mod errors;
mod nutrition;
mod plans;
mod schedule;
mod serde_fmt;
mod state;

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "nutriplan=debug,axum=info,tower_http=info,sqlx=warn".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let app_state = state::AppState::init().await?;

    sqlx::migrate!("./migrations")
        .run(&app_state.db)
        .await
        .context("run database migrations")?;

    let plan = &app_state.config.plan;
    tracing::info!(
        scale_min = plan.scale_min,
        scale_max = plan.scale_max,
        duplicate_policy = ?plan.duplicate_policy,
        no_repeat_window_days = plan.no_repeat_window_days as u64,
        "plan generation configured"
    );

    app::serve(app::build_app(app_state)).await
}
