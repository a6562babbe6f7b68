//! IM API server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p im-api
//! ```
//!
//! Configuration is loaded from environment variables.

use im_common::{try_init_tracing, ImConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %e, "Server failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting IM API server...");

    let config = ImConfig::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!(
        env = ?config.app.env,
        port = config.api.port,
        "Configuration loaded"
    );

    im_api::run(config).await?;

    Ok(())
}
