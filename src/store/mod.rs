// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The object store the reconcilers read from and write to.
//!
//! Reconcilers only ever see this trait, so they run the same against the
//! Kubernetes API ([`crate::kubernetes::KubeStore`]) and in memory ([`MemoryStore`]).

pub mod memory;

pub use memory::MemoryStore;

use crate::error::Result;
use crate::types::{Consumer, ConsumerStatus, ObjectKey, Publisher, PublisherStatus};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{ObjectMeta, Preconditions};

/// Outcome of [`ObjectStore::create_or_update_secret`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    Created,
    Updated,
    Unchanged,
}

/// Mutation applied to the current (or a fresh) Secret before it is persisted.
/// Returning an error aborts the write.
pub type SecretMutation<'a> = &'a (dyn Fn(&mut Secret) -> Result<()> + Send + Sync);

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_publisher(&self, key: &ObjectKey) -> Result<Option<Publisher>>;

    async fn get_consumer(&self, key: &ObjectKey) -> Result<Option<Consumer>>;

    async fn get_secret(&self, key: &ObjectKey) -> Result<Option<Secret>>;

    /// List Publishers, cluster wide when `namespace` is `None`
    async fn list_publishers(&self, namespace: Option<&str>) -> Result<Vec<Publisher>>;

    /// List Consumers, cluster wide when `namespace` is `None`
    async fn list_consumers(&self, namespace: Option<&str>) -> Result<Vec<Consumer>>;

    async fn list_secrets(&self, namespace: &str) -> Result<Vec<Secret>>;

    /// Create the Secret at `key` if absent, otherwise update it, persisting only
    /// when `mutate` actually changed something. Updates are conditional on the
    /// resource version that was read.
    async fn create_or_update_secret(
        &self,
        key: &ObjectKey,
        mutate: SecretMutation<'_>,
    ) -> Result<OperationResult>;

    /// Delete a Secret, a missing Secret is not an error.
    ///
    /// With `preconditions` the delete only happens while the Secret still has
    /// the given uid and resourceVersion. Returns `false` when it was refused
    /// because the Secret changed in the meantime.
    async fn delete_secret(&self, key: &ObjectKey, preconditions: Option<Preconditions>)
        -> Result<bool>;

    async fn update_publisher_status(&self, key: &ObjectKey, status: &PublisherStatus)
        -> Result<()>;

    async fn update_consumer_status(&self, key: &ObjectKey, status: &ConsumerStatus) -> Result<()>;
}

/// What a create-or-update has to persist after running the mutation
#[derive(Debug)]
pub(crate) enum Mutated {
    Create(Secret),
    Update(Secret),
    Unchanged,
}

pub(crate) fn mutate_secret(
    key: &ObjectKey,
    current: Option<&Secret>,
    mutate: SecretMutation<'_>,
) -> Result<Mutated> {
    let base = current.cloned().unwrap_or_else(|| Secret {
        metadata: ObjectMeta {
            name: Some(key.name.clone()),
            namespace: Some(key.namespace.clone()),
            ..Default::default()
        },
        ..Default::default()
    });

    let mut desired = base.clone();
    mutate(&mut desired)?;
    // identity is not up to the mutation
    desired.metadata.name = base.metadata.name.clone();
    desired.metadata.namespace = base.metadata.namespace.clone();

    Ok(match current {
        None => Mutated::Create(desired),
        Some(_) if desired == base => Mutated::Unchanged,
        Some(_) => Mutated::Update(desired),
    })
}
