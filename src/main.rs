//! Agent Chat View server
//!
//! Entry point: loads configuration, initializes logging and serves the chat.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use agent_chat_view::config::{AppConfig, LogFormat, LoggingConfig};
use agent_chat_view::server::start_server;
use dotenvy::dotenv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging);

    tracing::info!(
        name: "config.loaded",
        host = %config.server.host,
        port = config.server.port,
        models = config.chat.models.len(),
        default_model = %config.chat.default_model_id(),
        "Configuration loaded"
    );

    start_server(Arc::new(config)).await
}

/// Initialize tracing (M-LOG-STRUCTURED). `RUST_LOG` wins over the
/// configured filter.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).init(),
    }
}
