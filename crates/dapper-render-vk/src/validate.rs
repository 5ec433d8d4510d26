// SPDX-License-Identifier: CEPL-1.0
//! Requirement checks for extensions and layers.
//!
//! Matching is by exact name. A category passes only if every requirement
//! is present; there is no partial acceptance.

use std::collections::BTreeSet;

use tracing::trace;

use crate::error::{BootstrapError, CapabilityKind};

/// Every name in `required` that is not in `available`, in `required` order.
pub fn missing<'a>(required: &'a [String], available: &[String]) -> Vec<&'a str> {
    let available: BTreeSet<&str> = available.iter().map(String::as_str).collect();
    required
        .iter()
        .map(String::as_str)
        .filter(|name| !available.contains(name))
        .collect()
}

/// Fails with every missing name if `required` is not a subset of `available`.
pub fn require_all(
    kind: CapabilityKind,
    required: &[String],
    available: &[String],
) -> Result<(), BootstrapError> {
    for name in available {
        trace!("found {kind}: {name}");
    }
    for name in required {
        trace!("required {kind}: {name}");
    }

    let missing = missing(required, available);
    if missing.is_empty() {
        for name in required {
            trace!("validated {kind}: {name}");
        }
        return Ok(());
    }

    Err(BootstrapError::MissingCapability {
        kind,
        missing: missing.into_iter().map(str::to_owned).collect(),
        available: available.to_vec(),
    })
}
