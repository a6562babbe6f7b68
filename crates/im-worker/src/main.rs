//! IM push worker entry point
//!
//! Run with:
//! ```bash
//! cargo run -p im-worker
//! ```
//!
//! Joins the push consumer group and drains jobs until terminated.

use std::sync::Arc;

use im_cache::{DedupStore, PushStream, RedisPool};
use im_common::{try_init_tracing, ImConfig};
use im_db::PgDeviceTokenRepository;
use im_worker::{FcmClient, PushConsumer, PushProvider};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %e, "Worker failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting IM push worker...");

    let config = ImConfig::from_env()?;

    let db_config = im_db::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        ..Default::default()
    };
    let pool = im_db::create_pool(&db_config).await?;
    info!("PostgreSQL connection established");

    let redis_pool = RedisPool::from_config(&config.redis)?;
    let stream = PushStream::new(redis_pool.clone());
    stream.ensure_group().await?;
    info!("Push consumer group ready");

    let provider: Option<Arc<dyn PushProvider>> = match FcmClient::from_config(&config.push) {
        Ok(Some(client)) => {
            info!("FCM client initialized");
            Some(Arc::new(client))
        }
        Ok(None) => {
            warn!("FCM disabled: missing service account");
            None
        }
        Err(e) => {
            error!(error = %e, "FCM init failed");
            None
        }
    };

    let consumer = PushConsumer::new(
        stream,
        DedupStore::new(redis_pool),
        Arc::new(PgDeviceTokenRepository::new(pool)),
        provider,
        config.push.max_retries,
        config.push.backoff_base_ms,
    );

    info!(consumer = %consumer.consumer_id(), "im-worker started");
    consumer.run().await;

    Ok(())
}
