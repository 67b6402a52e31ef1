//! Image Prompt API - structured form data to image-generation prompts
//!
//! This service turns palette/theme/style form input into a JSON prompt
//! document and keeps uploaded reference images in a local,
//! content-addressed cache served under /refs.

mod config;
mod error;
mod guard;
mod server;
mod types;

use crate::config::Config;
use crate::error::Result;
use crate::server::{start_server, ServerState, SharedState};
use ref_image_store::{Janitor, RefStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("image_prompt_api=info".parse()?)
        .add_directive("ref_image_store=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting Image Prompt API...");

    let config = Config::from_env();
    info!("Port: {}", config.port);
    info!("Reference dir: {:?}", config.store.dir);
    info!("Max reference side: {} px", config.store.max_side);
    info!("Reference TTL: {} hours", config.store.ttl_hours);
    info!("Max reference storage: {} MB", config.store.max_storage_mb);
    info!(
        "Clean interval: {} minutes",
        config.store.clean_interval().as_secs() / 60
    );
    if let Some(origin) = &config.wp_origin {
        info!("Referer restricted to {}", origin);
    }

    let store = Arc::new(RefStore::new(&config.store));
    store.init().await?;

    // Started once; stopped on shutdown
    let cancel = CancellationToken::new();
    let janitor = Janitor::spawn(store.clone(), config.store.clean_interval(), cancel.clone());

    let state: SharedState = Arc::new(ServerState::new(store, &config));

    let served = start_server(state, &config, cancel.clone()).await;

    cancel.cancel();
    if let Err(e) = janitor.await {
        error!(error = %e, "Janitor task ended abnormally");
    }

    served?;
    info!("Image Prompt API stopped");
    Ok(())
}
