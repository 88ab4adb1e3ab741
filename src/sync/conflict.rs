// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Controlling-owner bookkeeping and the no-clobber check for copies.

use crate::error::{Result, ShareError};
use crate::types::{Consumer, OwnerIdentity};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};

/// Whether a destination may be written by a Consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ownership {
    /// Nothing there yet, or the Consumer already controls it
    Clear,
    /// Something else is there, with its controlling owner if it has one
    Conflict { owner: Option<OwnerIdentity> },
}

/// The controlling owner of a Secret, if any
pub fn controlling_owner(secret: &Secret) -> Option<OwnerIdentity> {
    let namespace = secret.namespace().unwrap_or_default();
    secret
        .owner_references()
        .iter()
        .find(|owner| owner.controller == Some(true))
        .map(|owner| OwnerIdentity::from_owner_reference(owner, &namespace))
}

/// Make `consumer` the controlling owner of `secret`.
///
/// A matching controller reference is left as is. A different one is replaced
/// in place, and other owner references keep their position.
pub fn set_controlling_owner(secret: &mut Secret, consumer: &Consumer) -> Result<()> {
    let uid = consumer.uid().ok_or_else(|| {
        ShareError::MissingMetadata(format!("Consumer {} has no uid", consumer.name_any()))
    })?;

    let reference = OwnerReference {
        api_version: Consumer::api_version(&()).into_owned(),
        kind: Consumer::kind(&()).into_owned(),
        name: consumer.name_any(),
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    };

    let owners = secret.metadata.owner_references.get_or_insert_with(Vec::new);
    match owners.iter().position(|owner| owner.controller == Some(true)) {
        Some(index) => {
            if owners[index] != reference {
                owners[index] = reference;
            }
            // at most one controller
            let mut seen = false;
            owners.retain(|owner| {
                let controller = owner.controller == Some(true);
                let keep = !(controller && seen);
                seen |= controller;
                keep
            });
        }
        None => owners.push(reference),
    }
    Ok(())
}

/// Check whether `requesting_owner` may write over `existing`.
///
/// Only a Secret whose controlling owner is exactly the requesting Consumer
/// (same API group, kind, namespace and name) is safe to update. Unowned and
/// foreign Secrets are never adopted.
pub fn check_conflict(existing: Option<&Secret>, requesting_owner: &OwnerIdentity) -> Ownership {
    let Some(secret) = existing else {
        return Ownership::Clear;
    };

    match controlling_owner(secret) {
        Some(owner) if &owner == requesting_owner => Ownership::Clear,
        owner => Ownership::Conflict { owner },
    }
}
