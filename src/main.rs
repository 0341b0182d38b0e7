use std::path::Path;
use std::sync::Arc;

use wellbot::config::BotConfig;
use wellbot::llm::{LlmConfig, create_provider};
use wellbot::pipeline::{ResponsePipeline, RuleTable};
use wellbot::server::chat_routes;
use wellbot::store::{HistorySink, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env()?;

    eprintln!("🌱 WellBot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.model);
    eprintln!("   Chat API: http://0.0.0.0:{}/chat", config.port);
    eprintln!(
        "   History API: http://0.0.0.0:{}/api/chat/history",
        config.port
    );

    // Rule table is loaded once, before the first request; a missing rule
    // file is non-fatal and leaves the generative fallback available.
    let rules = RuleTable::load(Path::new(&config.rules_path));
    eprintln!("   Rules: {} loaded from {}", rules.len(), config.rules_path);

    let llm = create_provider(&LlmConfig {
        backend: config.backend,
        api_key: config.api_key.clone(),
        model: config.model.clone(),
    })?;

    let history: Arc<dyn HistorySink> =
        Arc::new(LibSqlBackend::new_local(Path::new(&config.db_path)).await?);
    eprintln!("   Database: {}", config.db_path);

    let pipeline = Arc::new(
        ResponsePipeline::new(rules, llm, Arc::clone(&history))
            .with_generation_timeout(config.generation_timeout),
    );

    let app = chat_routes(pipeline, history);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "WellBot server started");
    axum::serve(listener, app).await?;

    Ok(())
}
