// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::Result;
use crate::types::identity::ObjectKey;
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares a Secret in the Publisher's namespace shareable with other namespaces.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[kube(group = "secretshare.io", version = "v1alpha1", kind = "Publisher")]
#[kube(namespaced)]
#[kube(status = "PublisherStatus")]
#[kube(printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.state"}"#)]
#[kube(printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#)]
#[serde(rename_all = "camelCase")]
pub struct PublisherSpec {
    /// Name of the shared Secret, in the Publisher's namespace
    #[serde(rename = "secretRef")]
    pub secret_reference: String,
    /// Namespaces allowed to consume the Secret, as plain names or regular
    /// expressions. Empty allows every namespace.
    #[serde(default)]
    pub allowed_namespaces: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, schemars::JsonSchema)]
pub enum PublisherState {
    Ready,
    SourceNotFound,
}

impl fmt::Display for PublisherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublisherState::Ready => write!(f, "Ready"),
            PublisherState::SourceNotFound => write!(f, "SourceNotFound"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublisherStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<PublisherState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl Publisher {
    /// Whether the last reconcile resolved the source Secret
    pub fn is_ready(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|s| s.state)
            .is_some_and(|state| state == PublisherState::Ready)
    }

    /// Key of the source Secret, which always lives next to the Publisher
    pub fn source_key(&self) -> Result<ObjectKey> {
        let key = ObjectKey::of(self)?;
        Ok(ObjectKey::new(key.namespace, &self.spec.secret_reference))
    }
}
