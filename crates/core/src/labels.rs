// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container label keys.
//!
//! Every worker container carries these labels; the event listener and the
//! orphan sweep key off them.

/// Marks a container as managed by this subsystem.
pub const MANAGED: &str = "wharf.managed";

/// Logical worker id.
pub const WORKER_ID: &str = "wharf.worker_id";

/// Agent family (`claude`, `factory`). Also stamped on built images.
pub const AGENT_KIND: &str = "wharf.agent_kind";

/// Current task id, refreshed by the wrapper per message; empty when idle.
pub const TASK_ID: &str = "wharf.task_id";

/// Caller family used for response routing.
pub const WORKER_TYPE: &str = "wharf.worker_type";
