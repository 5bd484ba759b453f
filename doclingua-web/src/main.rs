use clap::Parser;
use doclingua_mt::{MockMode, MockProvider, MtConfig, TranslatorState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod routes;

use routes::AppState;

/// HTTP service for structure-preserving document translation
#[derive(Parser, Debug)]
#[command(name = "doclingua-web", version, about)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "DOCLINGUA_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Directory of static files served at the root (e.g. an upload form)
    #[arg(long, env = "DOCLINGUA_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Largest accepted request body, in megabytes
    #[arg(long, env = "DOCLINGUA_MAX_UPLOAD_MB", default_value_t = 25)]
    max_upload_mb: usize,

    /// Use the mock provider instead of Gemini
    #[arg(long)]
    mock: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // Build the translator once; a failure is kept and reported per request
    let (config, translator) = match MtConfig::from_env() {
        Ok(config) if args.mock => {
            let provider = MockProvider::new(MockMode::Suffix(" [mock]".to_string()));
            let state = TranslatorState::with_provider(Arc::new(provider), config.timeout);
            (config, state)
        }
        Ok(config) => {
            let state = TranslatorState::from_config(&config);
            (config, state)
        }
        Err(e) => {
            warn!(error = %e, "Invalid translator configuration");
            (MtConfig::default(), TranslatorState::Unavailable(e.to_string()))
        }
    };

    let state = AppState {
        translator: Arc::new(translator),
        strategy: config.strategy,
        concurrency: config.concurrency,
    };

    info!("📄 Starting doclingua web server");

    let app = routes::app(state, args.static_dir.as_deref(), args.max_upload_mb * 1024 * 1024);

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    info!("🚀 Server running at http://{}", args.bind);

    axum::serve(listener, app).await?;

    Ok(())
}
