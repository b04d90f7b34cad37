// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orphan sweep.
//!
//! Containers carrying the managed label and the worker name prefix that
//! this process does not track are leftovers from a previous run. The
//! sweep runs at startup (before any command is consumed) and again at
//! shutdown, force-removing them — including workers tracked in memory,
//! which by then have been cancelled.

use crate::runtime::{ContainerRuntime, RuntimeError};

/// Remove every managed container whose name starts with
/// `<container_prefix>-`. Returns the removed names.
pub async fn orphan_sweep<R: ContainerRuntime>(
    runtime: &R,
    container_prefix: &str,
) -> Result<Vec<String>, RuntimeError> {
    let prefix = format!("{container_prefix}-");
    let mut removed = Vec::new();

    for name in runtime.list_managed().await? {
        if !name.starts_with(&prefix) {
            continue;
        }
        match runtime.remove(&name).await {
            Ok(()) => {
                tracing::info!(container = %name, "removed orphan container");
                removed.push(name);
            }
            Err(err) => {
                tracing::warn!(container = %name, error = %err, "orphan removal failed");
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
#[path = "sweep_tests.rs"]
mod tests;
