// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::{Result, ShareError};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use std::fmt;

/// Namespace-qualified name of an object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a namespaced resource, failing when the namespace is unset
    pub fn of<K>(obj: &K) -> Result<Self>
    where
        K: Resource,
        K::DynamicType: Default,
    {
        let name = obj.meta().name.clone().ok_or_else(|| {
            ShareError::MissingMetadata(format!("{} without a name", K::kind(&Default::default())))
        })?;
        let namespace = obj.namespace().ok_or_else(|| {
            ShareError::MissingMetadata(format!(
                "{} {} without a namespace",
                K::kind(&Default::default()),
                name
            ))
        })?;
        Ok(Self { namespace, name })
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Identity of a controlling owner.
///
/// Two owners are the same only when API group, kind, namespace and name all
/// match. An owner reference carries no namespace of its own, it always lives in
/// the namespace of the object it is attached to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OwnerIdentity {
    pub group: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl OwnerIdentity {
    pub fn of<K>(obj: &K) -> Result<Self>
    where
        K: Resource,
        K::DynamicType: Default,
    {
        let dt = K::DynamicType::default();
        let key = ObjectKey::of(obj)?;
        Ok(Self {
            group: K::group(&dt).into_owned(),
            kind: K::kind(&dt).into_owned(),
            namespace: key.namespace,
            name: key.name,
        })
    }

    pub fn from_owner_reference(owner: &OwnerReference, namespace: &str) -> Self {
        let group = owner
            .api_version
            .rsplit_once('/')
            .map(|(group, _)| group.to_string())
            .unwrap_or_default();
        Self {
            group,
            kind: owner.kind.clone(),
            namespace: namespace.to_string(),
            name: owner.name.clone(),
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, &self.name)
    }
}

impl fmt::Display for OwnerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} {}/{}", self.kind, self.group, self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Secret;
    use kube::api::ObjectMeta;

    fn owner_ref(api_version: &str, kind: &str, name: &str) -> OwnerReference {
        OwnerReference {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            uid: "uid".to_string(),
            controller: Some(true),
            block_owner_deletion: None,
        }
    }

    #[test]
    fn test_object_key_of_namespaced_secret() {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some("s".to_string()),
                namespace: Some("ns1".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let key = ObjectKey::of(&secret).unwrap();
        assert_eq!(key, ObjectKey::new("ns1", "s"));
        assert_eq!(key.to_string(), "ns1/s");
    }

    #[test]
    fn test_object_key_requires_namespace() {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some("s".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        assert!(matches!(
            ObjectKey::of(&secret),
            Err(ShareError::MissingMetadata(_))
        ));
    }

    #[test]
    fn test_owner_identity_splits_group_from_api_version() {
        let owner = OwnerIdentity::from_owner_reference(
            &owner_ref("secretshare.io/v1alpha1", "Consumer", "req"),
            "ns2",
        );

        assert_eq!(owner.group, "secretshare.io");
        assert_eq!(owner.kind, "Consumer");
        assert_eq!(owner.key(), ObjectKey::new("ns2", "req"));
    }

    #[test]
    fn test_owner_identity_core_group_is_empty() {
        let owner = OwnerIdentity::from_owner_reference(&owner_ref("v1", "ConfigMap", "cm"), "ns");
        assert_eq!(owner.group, "");
    }
}
