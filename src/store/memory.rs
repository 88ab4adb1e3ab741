// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! In-process [`ObjectStore`] for tests and dry runs.

use super::{mutate_secret, Mutated, ObjectStore, OperationResult, SecretMutation};
use crate::error::{Result, ShareError};
use crate::types::{Consumer, ConsumerStatus, ObjectKey, Publisher, PublisherStatus};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{ObjectMeta, Preconditions};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Keeps objects in maps keyed by namespace and name.
///
/// The `insert_*` and `remove_*` methods play the part of users editing the
/// cluster and are not counted by [`MemoryStore::writes`]; every write made
/// through the [`ObjectStore`] trait is.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    publishers: BTreeMap<ObjectKey, Publisher>,
    consumers: BTreeMap<ObjectKey, Consumer>,
    secrets: BTreeMap<ObjectKey, Secret>,
    resource_version: u64,
    writes: usize,
    offline: bool,
}

impl Inner {
    fn check_online(&self) -> Result<()> {
        if self.offline {
            return Err(ShareError::StoreUnavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    fn next_version(&mut self) -> String {
        self.resource_version += 1;
        self.resource_version.to_string()
    }

    /// Stamp bookkeeping metadata the API server would normally own
    fn stamp(&mut self, meta: &mut ObjectMeta, previous: Option<&ObjectMeta>, bump_generation: bool) {
        meta.resource_version = Some(self.next_version());
        if meta.uid.is_none() {
            meta.uid = previous.and_then(|p| p.uid.clone()).or_else(|| {
                Some(format!(
                    "uid-{}-{}",
                    meta.namespace.clone().unwrap_or_default(),
                    meta.name.clone().unwrap_or_default()
                ))
            });
        }
        let previous_generation = previous.and_then(|p| p.generation);
        meta.generation = match previous_generation {
            Some(g) if bump_generation => Some(g + 1),
            Some(g) => Some(g),
            None => meta.generation.or(Some(1)),
        };
    }
}

fn in_namespace(key: &ObjectKey, namespace: Option<&str>) -> bool {
    namespace.map_or(true, |ns| key.namespace == ns)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create or replace a Publisher. Replacing bumps its generation.
    pub fn insert_publisher(&self, mut publisher: Publisher) -> Result<ObjectKey> {
        let key = ObjectKey::of(&publisher)?;
        let mut state = self.state();
        let previous = state.publishers.get(&key).map(|p| p.metadata.clone());
        state.stamp(&mut publisher.metadata, previous.as_ref(), true);
        state.publishers.insert(key.clone(), publisher);
        Ok(key)
    }

    /// Create or replace a Consumer. Replacing bumps its generation.
    pub fn insert_consumer(&self, mut consumer: Consumer) -> Result<ObjectKey> {
        let key = ObjectKey::of(&consumer)?;
        let mut state = self.state();
        let previous = state.consumers.get(&key).map(|c| c.metadata.clone());
        state.stamp(&mut consumer.metadata, previous.as_ref(), true);
        state.consumers.insert(key.clone(), consumer);
        Ok(key)
    }

    pub fn insert_secret(&self, mut secret: Secret) -> Result<ObjectKey> {
        let key = ObjectKey::of(&secret)?;
        let mut state = self.state();
        let previous = state.secrets.get(&key).map(|s| s.metadata.clone());
        state.stamp(&mut secret.metadata, previous.as_ref(), false);
        state.secrets.insert(key.clone(), secret);
        Ok(key)
    }

    pub fn remove_publisher(&self, key: &ObjectKey) -> Option<Publisher> {
        self.state().publishers.remove(key)
    }

    pub fn remove_consumer(&self, key: &ObjectKey) -> Option<Consumer> {
        self.state().consumers.remove(key)
    }

    pub fn remove_secret(&self, key: &ObjectKey) -> Option<Secret> {
        self.state().secrets.remove(key)
    }

    pub fn publisher(&self, key: &ObjectKey) -> Option<Publisher> {
        self.state().publishers.get(key).cloned()
    }

    pub fn consumer(&self, key: &ObjectKey) -> Option<Consumer> {
        self.state().consumers.get(key).cloned()
    }

    pub fn secret(&self, key: &ObjectKey) -> Option<Secret> {
        self.state().secrets.get(key).cloned()
    }

    /// Number of writes made through the [`ObjectStore`] trait
    pub fn writes(&self) -> usize {
        self.state().writes
    }

    /// While offline every [`ObjectStore`] call fails as a transient error
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_publisher(&self, key: &ObjectKey) -> Result<Option<Publisher>> {
        let state = self.state();
        state.check_online()?;
        Ok(state.publishers.get(key).cloned())
    }

    async fn get_consumer(&self, key: &ObjectKey) -> Result<Option<Consumer>> {
        let state = self.state();
        state.check_online()?;
        Ok(state.consumers.get(key).cloned())
    }

    async fn get_secret(&self, key: &ObjectKey) -> Result<Option<Secret>> {
        let state = self.state();
        state.check_online()?;
        Ok(state.secrets.get(key).cloned())
    }

    async fn list_publishers(&self, namespace: Option<&str>) -> Result<Vec<Publisher>> {
        let state = self.state();
        state.check_online()?;
        Ok(state
            .publishers
            .iter()
            .filter(|(key, _)| in_namespace(key, namespace))
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn list_consumers(&self, namespace: Option<&str>) -> Result<Vec<Consumer>> {
        let state = self.state();
        state.check_online()?;
        Ok(state
            .consumers
            .iter()
            .filter(|(key, _)| in_namespace(key, namespace))
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn list_secrets(&self, namespace: &str) -> Result<Vec<Secret>> {
        let state = self.state();
        state.check_online()?;
        Ok(state
            .secrets
            .iter()
            .filter(|(key, _)| key.namespace == namespace)
            .map(|(_, s)| s.clone())
            .collect())
    }

    async fn create_or_update_secret(
        &self,
        key: &ObjectKey,
        mutate: SecretMutation<'_>,
    ) -> Result<OperationResult> {
        let mut state = self.state();
        state.check_online()?;

        let current = state.secrets.get(key).cloned();
        let (mut secret, result) = match mutate_secret(key, current.as_ref(), mutate)? {
            Mutated::Unchanged => return Ok(OperationResult::Unchanged),
            Mutated::Create(secret) => (secret, OperationResult::Created),
            Mutated::Update(secret) => (secret, OperationResult::Updated),
        };

        let previous = current.map(|c| c.metadata);
        state.stamp(&mut secret.metadata, previous.as_ref(), false);
        state.secrets.insert(key.clone(), secret);
        state.writes += 1;
        Ok(result)
    }

    async fn delete_secret(
        &self,
        key: &ObjectKey,
        preconditions: Option<Preconditions>,
    ) -> Result<bool> {
        let mut state = self.state();
        state.check_online()?;
        let Some(current) = state.secrets.get(key) else {
            return Ok(true);
        };
        if let Some(expected) = preconditions {
            let meta = &current.metadata;
            let moved = |want: &Option<String>, have: &Option<String>| {
                want.is_some() && want != have
            };
            if moved(&expected.uid, &meta.uid)
                || moved(&expected.resource_version, &meta.resource_version)
            {
                return Ok(false);
            }
        }
        state.secrets.remove(key);
        state.writes += 1;
        Ok(true)
    }

    async fn update_publisher_status(
        &self,
        key: &ObjectKey,
        status: &PublisherStatus,
    ) -> Result<()> {
        let mut state = self.state();
        state.check_online()?;
        let version = state.next_version();
        let Some(publisher) = state.publishers.get_mut(key) else {
            return Err(ShareError::StoreUnavailable(format!("publisher {} is gone", key)));
        };
        publisher.status = Some(status.clone());
        publisher.metadata.resource_version = Some(version);
        state.writes += 1;
        Ok(())
    }

    async fn update_consumer_status(&self, key: &ObjectKey, status: &ConsumerStatus) -> Result<()> {
        let mut state = self.state();
        state.check_online()?;
        let version = state.next_version();
        let Some(consumer) = state.consumers.get_mut(key) else {
            return Err(ShareError::StoreUnavailable(format!("consumer {} is gone", key)));
        };
        consumer.status = Some(status.clone());
        consumer.metadata.resource_version = Some(version);
        state.writes += 1;
        Ok(())
    }
}
