use anyhow::Context;

mod app;
mod config;
mod error;
mod report;
mod state;
mod store;
mod users;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "userdir=debug,axum=info,tower_http=info".to_string());
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

    // A bad template artifact is a deployment defect; refuse to start on one.
    report::template::compiled().context("report template failed to compile")?;

    let state = state::AppState::init().await?;
    let app = app::build_app(state);
    app::serve(app).await
}
