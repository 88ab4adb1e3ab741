// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Consumer reconciler - copies a Publisher's Secret into the Consumer's namespace.
//!
//! Each reconcile runs an ordered chain of guards. The first one that fails
//! decides the Consumer's state and nothing gets copied:
//!
//! 1. the referenced Publisher exists, else `PublisherNotFound`
//! 2. the Publisher is `Ready`, else `PublisherNotReady`
//! 3. the Publisher allows the Consumer's namespace, else `NamespaceNotAllowed`
//! 4. the destination is free or already ours, else `DestinationConflict`
//!
//! After that the source is copied and the Consumer becomes `Ready`. Failures to
//! talk to the store are returned as errors and leave the status untouched.

use super::events::{consumer_events, publish};
use super::status::write_status;
use super::Context;
use crate::error::Result;
use crate::store::{ObjectStore, OperationResult};
use crate::sync::{
    check_conflict, matches_allowed_namespace, prune_stale_copies, replicate, Ownership,
};
use crate::types::{Consumer, ConsumerState, ConsumerStatus, ObjectKey, OwnerIdentity};
use kube::runtime::controller::Action;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// What a Consumer reconcile decided and did
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerOutcome {
    pub state: ConsumerState,
    pub message: String,
    /// Result of writing the copy, `None` when a guard stopped the reconcile
    pub copy: Option<OperationResult>,
    /// Stale copies deleted after a rename
    pub pruned: Vec<ObjectKey>,
}

impl ConsumerOutcome {
    fn new(state: ConsumerState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
            copy: None,
            pruned: Vec::new(),
        }
    }
}

/// Reconcile the Consumer at `key`.
///
/// Returns the outcome whose state was written to the status, or `None` when
/// the Consumer no longer exists.
#[instrument(skip(store, key), fields(consumer = %key))]
pub async fn reconcile_consumer<S>(store: &S, key: &ObjectKey) -> Result<Option<ConsumerOutcome>>
where
    S: ObjectStore + ?Sized,
{
    let Some(consumer) = store.get_consumer(key).await? else {
        debug!("Consumer {} is gone, nothing to do", key);
        return Ok(None);
    };

    let outcome = evaluate(store, &consumer).await?;
    info!("Consumer {} is {}: {}", key, outcome.state, outcome.message);

    let status = ConsumerStatus {
        state: Some(outcome.state),
        message: Some(outcome.message.clone()),
        observed_generation: consumer.metadata.generation,
    };
    if consumer.status.as_ref() != Some(&status) {
        write_status(key, || store.update_consumer_status(key, &status)).await;
    }

    Ok(Some(outcome))
}

async fn evaluate<S>(store: &S, consumer: &Consumer) -> Result<ConsumerOutcome>
where
    S: ObjectStore + ?Sized,
{
    let own = ObjectKey::of(consumer)?;
    let publisher_key = consumer.publisher_key();

    let Some(publisher) = store.get_publisher(&publisher_key).await? else {
        return Ok(ConsumerOutcome::new(
            ConsumerState::PublisherNotFound,
            format!("Publisher {} not found", publisher_key),
        ));
    };

    if !publisher.is_ready() {
        return Ok(ConsumerOutcome::new(
            ConsumerState::PublisherNotReady,
            format!("Publisher {} is not ready", publisher_key),
        ));
    }

    let source_key = publisher.source_key()?;
    let destination = consumer.destination(&source_key.name)?;
    if !matches_allowed_namespace(&own.namespace, &publisher.spec.allowed_namespaces)? {
        return Ok(ConsumerOutcome::new(
            ConsumerState::NamespaceNotAllowed,
            format!(
                "Publisher {} does not allow namespace {}",
                publisher_key, own.namespace
            ),
        ));
    }
    if destination.key.namespace != own.namespace {
        return Ok(ConsumerOutcome::new(
            ConsumerState::NamespaceNotAllowed,
            format!(
                "Copy has to stay in namespace {}, not {}",
                own.namespace, destination.key.namespace
            ),
        ));
    }

    let owner = OwnerIdentity::of(consumer)?;
    let existing = store.get_secret(&destination.key).await?;
    if let Ownership::Conflict { owner: foreign } = check_conflict(existing.as_ref(), &owner) {
        let held_by = foreign
            .map(|o| format!("controlled by {}", o))
            .unwrap_or_else(|| "not controlled by this consumer".to_string());
        return Ok(ConsumerOutcome::new(
            ConsumerState::DestinationConflict,
            format!("Secret {} already exists and is {}", destination.key, held_by),
        ));
    }

    // The Publisher's status may lag behind the Secret it points at
    let Some(source) = store.get_secret(&source_key).await? else {
        return Ok(ConsumerOutcome::new(
            ConsumerState::PublisherNotReady,
            format!("Secret {} of publisher {} disappeared", source_key, publisher_key),
        ));
    };

    let copy = replicate(store, &source, &destination, consumer).await?;
    let pruned = prune_stale_copies(store, &owner, &destination.key).await?;

    Ok(ConsumerOutcome {
        copy: Some(copy),
        pruned,
        ..ConsumerOutcome::new(
            ConsumerState::Ready,
            format!("Secret {} copied to {}", source_key, destination.key),
        )
    })
}

pub(super) async fn reconcile(consumer: Arc<Consumer>, ctx: Arc<Context>) -> Result<Action> {
    let key = ObjectKey::of(consumer.as_ref())?;
    let previous = consumer.status.as_ref().and_then(|s| s.state);

    if let Some(outcome) = reconcile_consumer(&ctx.store, &key).await? {
        let events = consumer_events(previous, &outcome);
        publish(&ctx.recorder, consumer.as_ref(), events).await;
    }
    Ok(Action::requeue(ctx.config.resync_interval))
}
