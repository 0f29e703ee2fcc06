use ai_llm_service::telemetry;
use tracing::{Level, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // A missing .env is fine; the process environment may carry everything.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(telemetry::env_filter("info", Level::DEBUG))
        .with(telemetry::layer())
        .init();

    if let Err(e) = api::start().await {
        error!(error = %e, "server exited with error");
        std::process::exit(1);
    }
}
