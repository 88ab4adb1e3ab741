// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reverse lookups from a changed object to the Publishers and Consumers that
//! depend on it.
//!
//! The index is a view computed from a snapshot of the live objects (a
//! reflector store, or a listing of the [`ObjectStore`]). It is rebuilt for
//! every lookup batch and never treated as a source of truth.

use crate::constants::API_GROUP;
use crate::error::Result;
use crate::store::ObjectStore;
use crate::sync::conflict::controlling_owner;
use crate::types::{Consumer, ObjectKey, Publisher};
use k8s_openapi::api::core::v1::Secret;
use kube::Resource;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// A change observed by a watch, tagged by what kind of object changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A Secret that may be the source of one or more Publishers
    Secret(ObjectKey),
    Publisher(ObjectKey),
    Consumer(ObjectKey),
    /// A Secret controlled by a Consumer
    SecretCopy { copy: ObjectKey, owner: ObjectKey },
}

impl ChangeEvent {
    /// Every event a change to `secret` stands for.
    ///
    /// Any Secret may be a source; one controlled by a Consumer is also a copy.
    pub fn for_secret(secret: &Secret) -> Vec<ChangeEvent> {
        let Ok(key) = ObjectKey::of(secret) else {
            return Vec::new();
        };

        let mut events = vec![ChangeEvent::Secret(key.clone())];
        if let Some(owner) = controlling_owner(secret) {
            if owner.group == API_GROUP && owner.kind == Consumer::kind(&()) {
                events.push(ChangeEvent::SecretCopy {
                    copy: key,
                    owner: owner.key(),
                });
            }
        }
        events
    }
}

/// Objects that have to be reconciled again after a change
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Affected {
    pub publishers: BTreeSet<ObjectKey>,
    pub consumers: BTreeSet<ObjectKey>,
}

impl Affected {
    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty() && self.consumers.is_empty()
    }
}

#[derive(Debug, Default, Clone)]
pub struct ChangeIndex {
    /// namespace -> secret name -> Publishers referencing it
    by_secret_reference: BTreeMap<String, BTreeMap<String, BTreeSet<ObjectKey>>>,
    /// Publisher -> Consumers referencing it
    by_publisher_reference: BTreeMap<ObjectKey, BTreeSet<ObjectKey>>,
}

impl ChangeIndex {
    pub fn new<'a>(
        publishers: impl IntoIterator<Item = &'a Publisher>,
        consumers: impl IntoIterator<Item = &'a Consumer>,
    ) -> Self {
        let mut index = ChangeIndex::default();

        for publisher in publishers {
            let Ok(key) = ObjectKey::of(publisher) else {
                debug!("Skipping Publisher without namespace in change index");
                continue;
            };
            index
                .by_secret_reference
                .entry(key.namespace.clone())
                .or_default()
                .entry(publisher.spec.secret_reference.clone())
                .or_default()
                .insert(key);
        }

        for consumer in consumers {
            let Ok(key) = ObjectKey::of(consumer) else {
                debug!("Skipping Consumer without namespace in change index");
                continue;
            };
            index
                .by_publisher_reference
                .entry(consumer.publisher_key())
                .or_default()
                .insert(key);
        }

        index
    }

    /// Build an index covering only what a Secret change in `namespace` can
    /// reach: Publishers in that namespace and the Consumers referencing them.
    pub fn for_secret_namespace<'a>(
        namespace: &str,
        publishers: impl IntoIterator<Item = &'a Publisher>,
        consumers: impl IntoIterator<Item = &'a Consumer>,
    ) -> Self {
        Self::new(
            publishers
                .into_iter()
                .filter(|publisher| publisher.metadata.namespace.as_deref() == Some(namespace)),
            consumers
                .into_iter()
                .filter(|consumer| consumer.spec.publisher_reference.namespace == namespace),
        )
    }

    /// Build the index from a full listing of the store
    pub async fn from_store<S>(store: &S) -> Result<Self>
    where
        S: ObjectStore + ?Sized,
    {
        let publishers = store.list_publishers(None).await?;
        let consumers = store.list_consumers(None).await?;
        Ok(Self::new(&publishers, &consumers))
    }

    pub fn publishers_for_secret(&self, secret: &ObjectKey) -> impl Iterator<Item = &ObjectKey> {
        self.by_secret_reference
            .get(&secret.namespace)
            .and_then(|by_name| by_name.get(&secret.name))
            .into_iter()
            .flatten()
    }

    pub fn consumers_for_publisher(&self, publisher: &ObjectKey) -> impl Iterator<Item = &ObjectKey> {
        self.by_publisher_reference
            .get(publisher)
            .into_iter()
            .flatten()
    }

    /// Resolve one change to the objects depending on it
    pub fn resolve(&self, event: &ChangeEvent) -> Affected {
        let mut affected = Affected::default();
        self.collect(event, &mut affected);
        affected
    }

    /// Resolve a batch of changes, deduplicating the result
    pub fn resolve_all<'a>(&self, events: impl IntoIterator<Item = &'a ChangeEvent>) -> Affected {
        let mut affected = Affected::default();
        for event in events {
            self.collect(event, &mut affected);
        }
        affected
    }

    fn collect(&self, event: &ChangeEvent, affected: &mut Affected) {
        match event {
            ChangeEvent::Secret(secret) => {
                for publisher in self.publishers_for_secret(secret) {
                    affected.publishers.insert(publisher.clone());
                    affected
                        .consumers
                        .extend(self.consumers_for_publisher(publisher).cloned());
                }
            }
            ChangeEvent::Publisher(publisher) => {
                affected
                    .consumers
                    .extend(self.consumers_for_publisher(publisher).cloned());
            }
            ChangeEvent::Consumer(consumer) => {
                affected.consumers.insert(consumer.clone());
            }
            ChangeEvent::SecretCopy { owner, .. } => {
                affected.consumers.insert(owner.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::sync::conflict::set_controlling_owner;
    use crate::types::{ConsumerSpec, PublisherReference, PublisherSpec};
    use kube::api::ObjectMeta;

    fn make_publisher(namespace: &str, name: &str, secret: &str) -> Publisher {
        let mut publisher = Publisher::new(
            name,
            PublisherSpec {
                secret_reference: secret.to_string(),
                allowed_namespaces: vec![],
            },
        );
        publisher.metadata.namespace = Some(namespace.to_string());
        publisher
    }

    fn make_consumer(namespace: &str, name: &str, publisher: (&str, &str)) -> Consumer {
        let mut consumer = Consumer::new(
            name,
            ConsumerSpec {
                publisher_reference: PublisherReference {
                    namespace: publisher.0.to_string(),
                    name: publisher.1.to_string(),
                },
                copy_identity: None,
            },
        );
        consumer.metadata.namespace = Some(namespace.to_string());
        consumer.metadata.uid = Some(format!("uid-{}", name));
        consumer
    }

    fn make_secret(namespace: &str, name: &str) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn keys(pairs: &[(&str, &str)]) -> BTreeSet<ObjectKey> {
        pairs.iter().map(|(ns, name)| ObjectKey::new(*ns, *name)).collect()
    }

    fn fixture() -> ChangeIndex {
        let publishers = vec![
            make_publisher("ns1", "pub", "s"),
            make_publisher("ns1", "pub-again", "s"),
            make_publisher("ns1", "other", "t"),
            make_publisher("ns9", "pub", "s"),
        ];
        let consumers = vec![
            make_consumer("ns2", "req", ("ns1", "pub")),
            make_consumer("ns3", "req", ("ns1", "pub-again")),
            make_consumer("ns4", "req", ("ns1", "other")),
            make_consumer("ns5", "req", ("ns9", "pub")),
        ];
        ChangeIndex::new(&publishers, &consumers)
    }

    #[test]
    fn test_secret_change_reaches_publishers_and_their_consumers() {
        let affected = fixture().resolve(&ChangeEvent::Secret(ObjectKey::new("ns1", "s")));

        assert_eq!(affected.publishers, keys(&[("ns1", "pub"), ("ns1", "pub-again")]));
        assert_eq!(affected.consumers, keys(&[("ns2", "req"), ("ns3", "req")]));
    }

    #[test]
    fn test_secret_lookup_is_namespace_scoped() {
        let affected = fixture().resolve(&ChangeEvent::Secret(ObjectKey::new("ns9", "s")));

        assert_eq!(affected.publishers, keys(&[("ns9", "pub")]));
        assert_eq!(affected.consumers, keys(&[("ns5", "req")]));
    }

    #[test]
    fn test_unreferenced_secret_affects_nothing() {
        let affected = fixture().resolve(&ChangeEvent::Secret(ObjectKey::new("ns1", "unused")));
        assert!(affected.is_empty());
    }

    #[test]
    fn test_publisher_change_reaches_consumers_only() {
        let affected = fixture().resolve(&ChangeEvent::Publisher(ObjectKey::new("ns1", "other")));

        assert!(affected.publishers.is_empty());
        assert_eq!(affected.consumers, keys(&[("ns4", "req")]));
    }

    #[test]
    fn test_consumer_change_reaches_itself() {
        let affected = fixture().resolve(&ChangeEvent::Consumer(ObjectKey::new("ns7", "lonely")));
        assert_eq!(affected.consumers, keys(&[("ns7", "lonely")]));
    }

    #[test]
    fn test_copy_change_reaches_owner() {
        let consumer = make_consumer("ns2", "req", ("ns1", "pub"));
        let mut copy = make_secret("ns2", "s");
        set_controlling_owner(&mut copy, &consumer).unwrap();

        let events = ChangeEvent::for_secret(&copy);
        assert_eq!(
            events,
            vec![
                ChangeEvent::Secret(ObjectKey::new("ns2", "s")),
                ChangeEvent::SecretCopy {
                    copy: ObjectKey::new("ns2", "s"),
                    owner: ObjectKey::new("ns2", "req"),
                },
            ]
        );

        let affected = fixture().resolve_all(&events);
        assert_eq!(affected.consumers, keys(&[("ns2", "req")]));
    }

    #[test]
    fn test_plain_secret_is_only_a_source_event() {
        let events = ChangeEvent::for_secret(&make_secret("ns1", "s"));
        assert_eq!(events, vec![ChangeEvent::Secret(ObjectKey::new("ns1", "s"))]);
    }

    #[tokio::test]
    async fn test_from_store_matches_live_objects() {
        let store = MemoryStore::new();
        store.insert_publisher(make_publisher("ns1", "pub", "s")).unwrap();
        store
            .insert_consumer(make_consumer("ns2", "req", ("ns1", "pub")))
            .unwrap();

        let index = ChangeIndex::from_store(&store).await.unwrap();
        let affected = index.resolve(&ChangeEvent::Secret(ObjectKey::new("ns1", "s")));
        assert_eq!(affected.consumers, keys(&[("ns2", "req")]));

        store.remove_publisher(&ObjectKey::new("ns1", "pub"));
        let index = ChangeIndex::from_store(&store).await.unwrap();
        assert!(index
            .resolve(&ChangeEvent::Secret(ObjectKey::new("ns1", "s")))
            .is_empty());
    }

    #[test]
    fn test_namespace_scoped_index_resolves_like_full_index() {
        let publishers = vec![
            make_publisher("ns1", "pub", "s"),
            make_publisher("ns9", "pub", "s"),
        ];
        let consumers = vec![
            make_consumer("ns2", "req", ("ns1", "pub")),
            make_consumer("ns5", "req", ("ns9", "pub")),
        ];

        let scoped = ChangeIndex::for_secret_namespace("ns1", &publishers, &consumers);
        let secret = ChangeEvent::Secret(ObjectKey::new("ns1", "s"));

        assert_eq!(scoped.resolve(&secret), ChangeIndex::new(&publishers, &consumers).resolve(&secret));
        assert_eq!(scoped.publishers_for_secret(&ObjectKey::new("ns9", "s")).count(), 0);
        assert_eq!(
            scoped.consumers_for_publisher(&ObjectKey::new("ns9", "pub")).count(),
            0
        );
    }
}
