// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use tracing::info;

use secret_share::config::Config;
use secret_share::kubernetes::wait_for_share_crds;
use secret_share::reconcilers;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "secret_share=info".into()),
        )
        .init();

    info!("Starting secret-share operator");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: resync_interval={:?}, error_requeue={:?}",
        config.resync_interval, config.error_requeue
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    // Controllers cannot watch resources the API server does not serve yet
    info!("Waiting for Publisher and Consumer CRDs to become available...");
    wait_for_share_crds(&client).await?;

    info!("Starting reconcilers...");
    reconcilers::run(client, config).await?;

    info!("Operator stopped");
    Ok(())
}
