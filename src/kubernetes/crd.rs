// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CRD availability checking utilities

use crate::constants::crd::{POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS};
use crate::constants::{API_GROUP, API_VERSION};
use crate::error::Result;
use crate::types::{Consumer, Publisher};
use kube::{discovery::Discovery, Client, Resource};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Wait for the Publisher and Consumer CRDs to become available in the cluster.
/// This uses exponential backoff starting at POLL_INTERVAL_SECS seconds.
pub async fn wait_for_share_crds(client: &Client) -> Result<()> {
    let mut interval = POLL_INTERVAL_SECS;
    let wanted = [Publisher::kind(&()), Consumer::kind(&())];

    loop {
        match missing_kinds(client, &wanted).await {
            Ok(missing) if missing.is_empty() => {
                info!("Share CRDs ({}/{}) are available", API_GROUP, API_VERSION);
                return Ok(());
            }
            Ok(missing) => {
                info!(
                    "CRDs {:?} ({}/{}) not yet available, waiting {} seconds...",
                    missing, API_GROUP, API_VERSION, interval
                );
            }
            Err(e) => {
                warn!(
                    "Error checking for share CRDs: {}, retrying in {} seconds...",
                    e, interval
                );
            }
        }

        sleep(Duration::from_secs(interval)).await;

        // Exponential backoff with max cap
        interval = (interval * 2).min(POLL_MAX_INTERVAL_SECS);
    }
}

/// Kinds out of `wanted` that discovery does not report under our group and version
async fn missing_kinds<'a>(client: &Client, wanted: &[std::borrow::Cow<'a, str>]) -> Result<Vec<String>> {
    let discovery = Discovery::new(client.clone())
        .filter(&[API_GROUP])
        .run()
        .await?;

    let mut found = Vec::new();
    for group in discovery.groups() {
        if group.name() == API_GROUP {
            for (ar, _) in group.recommended_resources() {
                if ar.version == API_VERSION {
                    found.push(ar.kind);
                }
            }
        }
    }

    Ok(wanted
        .iter()
        .filter(|kind| !found.iter().any(|f| f == kind.as_ref()))
        .map(|kind| kind.to_string())
        .collect())
}
