// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Best-effort status writes.

use crate::constants::status::{RETRY_BASE_DELAY_MS, WRITE_ATTEMPTS};
use crate::error::Result;
use crate::types::ObjectKey;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Run a status write, retrying with doubling delay.
///
/// A write that keeps failing is logged and dropped. The reconcile outcome does
/// not depend on it, the next trigger writes the status again.
pub(crate) async fn write_status<F, Fut>(object: &ObjectKey, mut write: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

    for attempt in 1..=WRITE_ATTEMPTS {
        match write().await {
            Ok(()) => return,
            Err(e) if attempt < WRITE_ATTEMPTS => {
                debug!(
                    "Status write for {} failed (attempt {}): {}, retrying in {:?}",
                    object, attempt, e, delay
                );
                sleep(delay).await;
                delay *= 2;
            }
            Err(e) => {
                warn!(
                    "Dropping status update for {} after {} attempts: {}",
                    object, attempt, e
                );
            }
        }
    }
}
