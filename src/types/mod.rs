// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resources and the identity records the reconcilers pass around.

pub mod consumer;
pub mod identity;
pub mod publisher;

pub use consumer::{
    Consumer, ConsumerSpec, ConsumerState, ConsumerStatus, CopyIdentity, Destination,
    PublisherReference,
};
pub use identity::{ObjectKey, OwnerIdentity};
pub use publisher::{Publisher, PublisherSpec, PublisherState, PublisherStatus};
