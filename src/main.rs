use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use webinar_agent::config::StoreKind;
use webinar_agent::{create_router, AppState, Config};

#[derive(Debug, Parser)]
#[command(name = "webinar-agent", about = "Transcript and Q&A backend for live webinars")]
struct Args {
    /// Config file (TOML), without extension
    #[arg(long, default_value = "config/webinar-agent")]
    config: String,

    /// Override the bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the listen port
    #[arg(long)]
    port: Option<u16>,

    /// Keep everything in memory instead of the persistence gateway
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let store = args.memory.then_some(StoreKind::Memory);
    let mut cfg = Config::load_with_store(&args.config, store)
        .context("Failed to load configuration")?;

    if let Some(bind) = args.bind {
        cfg.server.bind = bind;
    }
    if let Some(port) = args.port {
        cfg.server.port = port;
    }

    info!("Webinar agent v{}", env!("CARGO_PKG_VERSION"));
    info!("Store: {:?}", cfg.store);
    if cfg.store == StoreKind::Memory {
        info!("Transcripts and webinars will not survive a restart");
    }

    let addr = format!("{}:{}", cfg.server.bind, cfg.server.port);
    let state = AppState::from_config(cfg).context("Failed to initialise services")?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await.context("HTTP server error")?;

    Ok(())
}
