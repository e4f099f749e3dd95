use watch_check::server::run_mcp_server;
use watch_check::{Config, WatchCheck, diagnostics_for};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env();
    if config.tmdb_token.is_none() {
        tracing::warn!("TMDB_READ_TOKEN not set; only the iTunes catalog will be searched");
    }
    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set; every assessment will be the cautious fallback");
    }

    let diagnostics = diagnostics_for(&config, true);
    let pipeline = WatchCheck::from_config(&config, diagnostics);

    run_mcp_server(pipeline).await
}
