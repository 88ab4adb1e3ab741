// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Publisher reconciler - reports whether a Publisher's source Secret exists.

use super::events::{publish, publisher_events};
use super::status::write_status;
use super::Context;
use crate::error::Result;
use crate::store::ObjectStore;
use crate::types::{ObjectKey, Publisher, PublisherState, PublisherStatus};
use kube::runtime::controller::Action;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Reconcile the Publisher at `key`.
///
/// Returns the state written to its status, or `None` when the Publisher no
/// longer exists. Only the status is ever written.
#[instrument(skip(store, key), fields(publisher = %key))]
pub async fn reconcile_publisher<S>(store: &S, key: &ObjectKey) -> Result<Option<PublisherState>>
where
    S: ObjectStore + ?Sized,
{
    let Some(publisher) = store.get_publisher(key).await? else {
        debug!("Publisher {} is gone, nothing to do", key);
        return Ok(None);
    };

    let source = publisher.source_key()?;
    let (state, message) = match store.get_secret(&source).await? {
        Some(_) => (PublisherState::Ready, None),
        None => {
            info!("Source secret {} of publisher {} not found", source, key);
            (
                PublisherState::SourceNotFound,
                Some(format!("Secret {} not found", source)),
            )
        }
    };

    let status = PublisherStatus {
        state: Some(state),
        message,
        observed_generation: publisher.metadata.generation,
    };
    if publisher.status.as_ref() != Some(&status) {
        write_status(key, || store.update_publisher_status(key, &status)).await;
    }

    Ok(Some(state))
}

pub(super) async fn reconcile(publisher: Arc<Publisher>, ctx: Arc<Context>) -> Result<Action> {
    let key = ObjectKey::of(publisher.as_ref())?;
    let previous = publisher.status.as_ref().and_then(|s| s.state);

    if let Some(state) = reconcile_publisher(&ctx.store, &key).await? {
        let events = publisher_events(previous, state, &publisher.source_key()?);
        publish(&ctx.recorder, publisher.as_ref(), events).await;
    }
    Ok(Action::requeue(ctx.config.resync_interval))
}
