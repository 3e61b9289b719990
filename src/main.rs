use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use ask_csv::{
    charts::{render::PlottersRenderer, ChartDispatcher},
    config::Config,
    llm::provider::LLM,
    routes::create_router,
    utils::init_logger,
    AppState,
};

/// Ask questions about a CSV file through an LLM
#[derive(Parser, Debug)]
#[command(name = "ask-csv", version, about)]
struct Cli {
    /// Address to bind (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_env()?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let _log_guard = init_logger(&config.logging);
    info!("Configuration loaded: {:?}", config.server);
    info!("LLM: {:?}", config.llm);

    if config.llm.api_key().is_empty() {
        warn!(
            provider = %config.llm.provider,
            "No API key configured; questions will fail until one is set"
        );
    }

    tokio::fs::create_dir_all(&config.data.upload_dir).await?;

    let llm = Arc::new(LLM::new(&config.llm)?);
    let charts = ChartDispatcher::new(Arc::new(PlottersRenderer::default()));
    let state = AppState::new(config.clone(), llm, charts);

    // Create router
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
