// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Writing and cleaning up the copies a Consumer controls.

use crate::constants::annotations;
use crate::error::{Result, ShareError};
use crate::store::{ObjectStore, OperationResult};
use crate::sync::conflict::{check_conflict, controlling_owner, set_controlling_owner, Ownership};
use crate::types::{Consumer, Destination, ObjectKey, OwnerIdentity};
use k8s_openapi::api::core::v1::Secret;
use kube::api::Preconditions;
use kube::ResourceExt;
use tracing::{debug, info, instrument};

/// Create or update the copy of `source` at `destination`, controlled by `consumer`.
///
/// The copy's data follows the source. Labels and annotations from the
/// destination are merged into whatever the copy already carries. The write is
/// refused if, by the time it happens, the destination is controlled by anyone
/// else, so a concurrent writer can never be clobbered.
#[instrument(
    skip(store, source, destination, consumer),
    fields(destination = %destination.key, consumer = %consumer.name_any())
)]
pub async fn replicate<S>(
    store: &S,
    source: &Secret,
    destination: &Destination,
    consumer: &Consumer,
) -> Result<OperationResult>
where
    S: ObjectStore + ?Sized,
{
    let owner = OwnerIdentity::of(consumer)?;
    let generated_from = owner.key().to_string();

    let mutate = |copy: &mut Secret| -> Result<()> {
        if is_persisted(copy) && check_conflict(Some(&*copy), &owner) != Ownership::Clear {
            return Err(ShareError::OwnershipChanged(destination.key.to_string()));
        }

        copy.data = source.data.clone();
        if copy.type_.is_none() {
            copy.type_ = source.type_.clone();
        }

        if !destination.labels.is_empty() {
            copy.metadata
                .labels
                .get_or_insert_with(Default::default)
                .extend(destination.labels.clone());
        }
        let copy_annotations = copy.metadata.annotations.get_or_insert_with(Default::default);
        copy_annotations.extend(destination.annotations.clone());
        copy_annotations.insert(annotations::GENERATED_FROM.to_string(), generated_from.clone());

        set_controlling_owner(copy, consumer)
    };

    let result = store.create_or_update_secret(&destination.key, &mutate).await?;
    match result {
        OperationResult::Unchanged => debug!("Copy {} already up to date", destination.key),
        _ => info!("Copy {} {:?}", destination.key, result),
    }
    Ok(result)
}

/// Delete copies controlled by `owner` other than `keep`.
///
/// This is what makes a change of the copy's name a rename instead of a
/// duplicate. Returns the keys that were deleted.
#[instrument(skip(store), fields(owner = %owner, keep = %keep))]
pub async fn prune_stale_copies<S>(
    store: &S,
    owner: &OwnerIdentity,
    keep: &ObjectKey,
) -> Result<Vec<ObjectKey>>
where
    S: ObjectStore + ?Sized,
{
    let mut pruned = Vec::new();

    for secret in store.list_secrets(&owner.namespace).await? {
        if controlling_owner(&secret).as_ref() != Some(owner) {
            continue;
        }
        let key = ObjectKey::of(&secret)?;
        if &key == keep {
            continue;
        }

        // the listing may be stale, only delete the version that was checked
        let preconditions = Preconditions {
            resource_version: secret.metadata.resource_version.clone(),
            uid: secret.metadata.uid.clone(),
        };
        if store.delete_secret(&key, Some(preconditions)).await? {
            info!("Deleted stale copy {}", key);
            pruned.push(key);
        } else {
            info!("Stale copy {} changed since it was listed, leaving it", key);
        }
    }

    Ok(pruned)
}

/// Whether the Secret was read back from the store rather than freshly built
fn is_persisted(secret: &Secret) -> bool {
    secret.metadata.resource_version.is_some()
}
