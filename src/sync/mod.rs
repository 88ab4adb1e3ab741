// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Building blocks of secret sharing: access checks, ownership, copying, and
//! change propagation.

pub mod conflict;
pub mod index;
pub mod matcher;
pub mod replicate;

pub use conflict::{check_conflict, controlling_owner, set_controlling_owner, Ownership};
pub use index::{Affected, ChangeEvent, ChangeIndex};
pub use matcher::matches_allowed_namespace;
pub use replicate::{prune_stale_copies, replicate};
