// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Allow-list evaluation for Publisher namespaces.

use crate::error::{Result, ShareError};
use regex::Regex;

/// Check whether `namespace` is allowed by a Publisher's allow-list.
///
/// An empty list allows every namespace. Otherwise each entry is a regular
/// expression that has to match the whole namespace name, so a plain name only
/// matches itself. Every entry is compiled before any is evaluated: a malformed
/// entry is reported no matter where it sits in the list.
pub fn matches_allowed_namespace(namespace: &str, allowed_namespaces: &[String]) -> Result<bool> {
    if allowed_namespaces.is_empty() {
        return Ok(true);
    }

    let patterns = allowed_namespaces
        .iter()
        .map(|pattern| compile(pattern))
        .collect::<Result<Vec<_>>>()?;

    Ok(patterns.iter().any(|pattern| pattern.is_match(namespace)))
}

fn compile(pattern: &str) -> Result<Regex> {
    let invalid = |source| ShareError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    };

    // Validate on its own first, wrapping an unbalanced pattern could make it parse
    Regex::new(pattern).map_err(invalid)?;
    // `(?x)` and the newline end a trailing verbose-mode comment; in either
    // mode the newline is then insignificant whitespace
    Regex::new(&format!("^(?:{}(?x)\n)$", pattern)).map_err(invalid)
}
