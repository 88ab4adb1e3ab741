// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::Result;
use crate::types::identity::ObjectKey;
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Requests a copy of a Publisher's Secret in the Consumer's namespace.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[kube(group = "secretshare.io", version = "v1alpha1", kind = "Consumer")]
#[kube(namespaced)]
#[kube(status = "ConsumerStatus")]
#[kube(printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.state"}"#)]
#[kube(printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerSpec {
    #[serde(rename = "publisherRef")]
    pub publisher_reference: PublisherReference,
    /// Overrides for the metadata of the copy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_identity: Option<CopyIdentity>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
pub struct PublisherReference {
    pub name: String,
    pub namespace: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct CopyIdentity {
    /// Name of the copy, defaults to the name of the source Secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Namespace of the copy, defaults to (and must equal) the Consumer's namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, schemars::JsonSchema)]
pub enum ConsumerState {
    Ready,
    PublisherNotFound,
    PublisherNotReady,
    NamespaceNotAllowed,
    DestinationConflict,
}

impl fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConsumerState::Ready => "Ready",
            ConsumerState::PublisherNotFound => "PublisherNotFound",
            ConsumerState::PublisherNotReady => "PublisherNotReady",
            ConsumerState::NamespaceNotAllowed => "NamespaceNotAllowed",
            ConsumerState::DestinationConflict => "DestinationConflict",
        };
        f.write_str(s)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ConsumerState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// Where a copy is written and the metadata merged into it.
#[derive(Clone, Debug, PartialEq)]
pub struct Destination {
    pub key: ObjectKey,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl Consumer {
    pub fn publisher_key(&self) -> ObjectKey {
        let reference = &self.spec.publisher_reference;
        ObjectKey::new(&reference.namespace, &reference.name)
    }

    /// Resolve the copy's identity for a source Secret called `source_name`
    pub fn destination(&self, source_name: &str) -> Result<Destination> {
        let own = ObjectKey::of(self)?;
        let identity = self.spec.copy_identity.clone().unwrap_or_default();

        Ok(Destination {
            key: ObjectKey::new(
                identity.namespace.unwrap_or(own.namespace),
                identity.name.unwrap_or_else(|| source_name.to_string()),
            ),
            labels: identity.labels,
            annotations: identity.annotations,
        })
    }
}
