//! Quarto server
//!
//! Usage: `quarto-server [CONFIG.toml]`
//!
//! Without a config file the server listens on 0.0.0.0:7331 and offers every
//! extension. `QUARTO_PORT` overrides the configured port. Log output is
//! controlled through `RUST_LOG`.

use quarto_net::{Server, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Quarto server");

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(config)) {
        tracing::error!("Server failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: ServerConfig) -> quarto_net::Result<()> {
    let server = Server::start(config).await?;
    tracing::info!(addr = %server.addr(), "Listening; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    server.shutdown();
    Ok(())
}

fn load_config() -> quarto_net::Result<ServerConfig> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!(path = %path, "Loading configuration");
            ServerConfig::load(path)?
        }
        None => ServerConfig::default(),
    };

    if let Ok(port) = std::env::var("QUARTO_PORT") {
        let port = port
            .parse()
            .map_err(|_| quarto_net::Error::InvalidConfig(format!("bad QUARTO_PORT: {port}")))?;
        config = config.with_port(port);
    }

    Ok(config)
}
