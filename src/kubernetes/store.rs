// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! [`ObjectStore`] backed by the Kubernetes API

use crate::constants::OPERATOR_NAME;
use crate::error::Result;
use crate::store::{mutate_secret, Mutated, ObjectStore, OperationResult, SecretMutation};
use crate::types::{Consumer, ConsumerStatus, ObjectKey, Publisher, PublisherStatus};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::{DeleteParams, ListParams, Patch, PatchParams, PostParams, Preconditions},
    Api, Client,
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, instrument};

#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn namespaced<K>(&self, namespace: &str) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn scoped<K>(&self, namespace: Option<&str>) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(OPERATOR_NAME.to_string()),
            ..Default::default()
        }
    }
}

/// Merge patch for the `status` subresource. Unset fields are sent as `null`
/// so they get cleared.
fn status_patch<S: Serialize>(
    state: Option<S>,
    message: Option<&str>,
    observed_generation: Option<i64>,
) -> serde_json::Value {
    json!({
        "status": {
            "state": state,
            "message": message,
            "observedGeneration": observed_generation,
        }
    })
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get_publisher(&self, key: &ObjectKey) -> Result<Option<Publisher>> {
        Ok(self.namespaced::<Publisher>(&key.namespace).get_opt(&key.name).await?)
    }

    async fn get_consumer(&self, key: &ObjectKey) -> Result<Option<Consumer>> {
        Ok(self.namespaced::<Consumer>(&key.namespace).get_opt(&key.name).await?)
    }

    async fn get_secret(&self, key: &ObjectKey) -> Result<Option<Secret>> {
        Ok(self.namespaced::<Secret>(&key.namespace).get_opt(&key.name).await?)
    }

    async fn list_publishers(&self, namespace: Option<&str>) -> Result<Vec<Publisher>> {
        let list = self.scoped::<Publisher>(namespace).list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn list_consumers(&self, namespace: Option<&str>) -> Result<Vec<Consumer>> {
        let list = self.scoped::<Consumer>(namespace).list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn list_secrets(&self, namespace: &str) -> Result<Vec<Secret>> {
        let list = self.namespaced::<Secret>(namespace).list(&ListParams::default()).await?;
        Ok(list.items)
    }

    #[instrument(skip(self, mutate), fields(secret = %key))]
    async fn create_or_update_secret(
        &self,
        key: &ObjectKey,
        mutate: SecretMutation<'_>,
    ) -> Result<OperationResult> {
        let secrets = self.namespaced::<Secret>(&key.namespace);
        let current = secrets.get_opt(&key.name).await?;

        // replace() carries the resourceVersion that was read, so a concurrent
        // change surfaces as a 409 instead of being overwritten
        match mutate_secret(key, current.as_ref(), mutate)? {
            Mutated::Create(secret) => {
                secrets.create(&Self::post_params(), &secret).await?;
                info!("Created secret {}", key);
                Ok(OperationResult::Created)
            }
            Mutated::Update(secret) => {
                secrets.replace(&key.name, &Self::post_params(), &secret).await?;
                info!("Updated secret {}", key);
                Ok(OperationResult::Updated)
            }
            Mutated::Unchanged => {
                debug!("Secret {} is up to date", key);
                Ok(OperationResult::Unchanged)
            }
        }
    }

    async fn delete_secret(
        &self,
        key: &ObjectKey,
        preconditions: Option<Preconditions>,
    ) -> Result<bool> {
        let secrets = self.namespaced::<Secret>(&key.namespace);
        let params = DeleteParams {
            preconditions,
            ..Default::default()
        };
        match secrets.delete(&key.name, &params).await {
            Ok(_) => {
                info!("Deleted secret {}", key);
                Ok(true)
            }
            Err(kube::Error::Api(err)) if err.code == 404 => {
                debug!("Secret {} already gone", key);
                Ok(true)
            }
            Err(kube::Error::Api(err)) if err.code == 409 => {
                info!("Secret {} changed since it was read, not deleting it", key);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_publisher_status(
        &self,
        key: &ObjectKey,
        status: &PublisherStatus,
    ) -> Result<()> {
        let patch = status_patch(
            status.state,
            status.message.as_deref(),
            status.observed_generation,
        );
        self.namespaced::<Publisher>(&key.namespace)
            .patch_status(&key.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn update_consumer_status(&self, key: &ObjectKey, status: &ConsumerStatus) -> Result<()> {
        let patch = status_patch(
            status.state,
            status.message.as_deref(),
            status.observed_generation,
        );
        self.namespaced::<Consumer>(&key.namespace)
            .patch_status(&key.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}
