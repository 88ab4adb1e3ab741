// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes reconcilers that react to watch events.
//!
//! Two controllers run side by side, one for Publishers and one for Consumers.
//! Besides their own resource they watch Secrets (and the Consumer controller
//! also Publishers), mapping each change through a [`ChangeIndex`] built from
//! the controllers' caches. Reconcile outcomes are also published as
//! Kubernetes Events.

pub mod consumer;
mod events;
pub mod publisher;
mod status;

pub use consumer::{reconcile_consumer, ConsumerOutcome};
pub use publisher::reconcile_publisher;

use crate::config::Config;
use crate::constants::OPERATOR_NAME;
use crate::error::ShareError;
use crate::kubernetes::KubeStore;
use crate::sync::{ChangeEvent, ChangeIndex};
use crate::types::{Consumer, ObjectKey, Publisher};
use futures::StreamExt;
use kube_runtime::watcher::Config as WatcherConfig;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    runtime::{
        controller::Action,
        events::{Recorder, Reporter},
        reflector::ObjectRef,
        Controller,
    },
    Api, Client, Resource,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shared by every reconcile of both controllers
pub struct Context {
    pub store: KubeStore,
    pub config: Config,
    /// Publishes Kubernetes Events about Publishers and Consumers
    pub recorder: Recorder,
}

/// Run the Publisher and Consumer controllers until a shutdown signal arrives
pub async fn run(client: Client, config: Config) -> anyhow::Result<()> {
    let context = Arc::new(Context {
        store: KubeStore::new(client.clone()),
        config,
        recorder: Recorder::new(
            client.clone(),
            Reporter {
                controller: OPERATOR_NAME.to_string(),
                instance: None,
            },
        ),
    });

    let publishers: Api<Publisher> = Api::all(client.clone());
    let consumers: Api<Consumer> = Api::all(client.clone());
    let secrets: Api<Secret> = Api::all(client.clone());

    let publisher_controller = Controller::new(publishers.clone(), WatcherConfig::default());
    let consumer_controller = Controller::new(consumers, WatcherConfig::default());
    let publisher_cache = publisher_controller.store();
    let consumer_cache = consumer_controller.store();

    let publisher_loop = {
        let publisher_cache = publisher_cache.clone();
        publisher_controller
            .watches(secrets.clone(), WatcherConfig::default(), move |secret| {
                let Some(namespace) = secret.metadata.namespace.as_deref() else {
                    return Vec::new();
                };
                let index = ChangeIndex::for_secret_namespace(
                    namespace,
                    publisher_cache.state().iter().map(|p| p.as_ref()),
                    std::iter::empty(),
                );
                object_refs::<Publisher>(index.resolve_all(&ChangeEvent::for_secret(&secret)).publishers)
            })
            .shutdown_on_signal()
            .run(publisher::reconcile, error_policy, context.clone())
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled publisher: {:?}", o),
                    Err(e) => warn!("Publisher reconciliation error: {:?}", e),
                }
            })
    };

    let consumer_loop = {
        let by_secret = (publisher_cache.clone(), consumer_cache.clone());
        let by_publisher = consumer_cache.clone();
        consumer_controller
            .watches(secrets, WatcherConfig::default(), move |secret| {
                let Some(namespace) = secret.metadata.namespace.as_deref() else {
                    return Vec::new();
                };
                let (publisher_cache, consumer_cache) = &by_secret;
                let publishers = publisher_cache.state();
                let consumers = consumer_cache.state();
                let index = ChangeIndex::for_secret_namespace(
                    namespace,
                    publishers.iter().map(|p| p.as_ref()),
                    consumers.iter().map(|c| c.as_ref()),
                );
                object_refs::<Consumer>(index.resolve_all(&ChangeEvent::for_secret(&secret)).consumers)
            })
            .watches(publishers, WatcherConfig::default(), move |publisher| {
                let Ok(key) = ObjectKey::of(&publisher) else {
                    return Vec::new();
                };
                let consumers = by_publisher.state();
                let index = ChangeIndex::new(std::iter::empty(), consumers.iter().map(|c| c.as_ref()));
                object_refs::<Consumer>(index.resolve(&ChangeEvent::Publisher(key)).consumers)
            })
            .shutdown_on_signal()
            .run(consumer::reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled consumer: {:?}", o),
                    Err(e) => warn!("Consumer reconciliation error: {:?}", e),
                }
            })
    };

    info!("Publisher and consumer controllers started");
    tokio::join!(publisher_loop, consumer_loop);
    info!("Controllers shut down");

    Ok(())
}

fn object_refs<K>(keys: BTreeSet<ObjectKey>) -> Vec<ObjectRef<K>>
where
    K: Resource<DynamicType = ()>,
{
    keys.into_iter()
        .map(|key| ObjectRef::new(&key.name).within(&key.namespace))
        .collect()
}

fn error_policy<K>(object: Arc<K>, error: &ShareError, ctx: Arc<Context>) -> Action
where
    K: Resource<DynamicType = ()>,
{
    let key = ObjectKey::of(object.as_ref())
        .map(|key| key.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());
    error!("Reconciliation of {} {} failed: {}", K::kind(&()), key, error);
    Action::requeue(ctx.config.error_requeue)
}
