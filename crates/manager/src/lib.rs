// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wharf-manager: the single authority over worker containers on its host.
//!
//! The manager consumes the command stream, materializes workers as Docker
//! containers built from capability-derived images, watches the runtime's
//! event feed for crashes, and runs the reapers that enforce idle-pause,
//! TTL expiry, and image garbage collection.
//!
//! Multiple manager instances coexist: the command stream is a consumer
//! group (each command lands on exactly one manager) and container names
//! are unique per worker, so `create` is idempotent by name.

pub mod config;
pub mod consumer;
pub mod events;
pub mod image;
pub mod lifecycle;
pub mod manager;
pub mod reaper;
pub mod runtime;
pub mod sweep;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::ManagerConfig;
pub use consumer::CommandConsumer;
pub use events::RuntimeEventListener;
pub use image::ImageStore;
pub use manager::{ManagerError, WorkerManager, WorkerStatus};
pub use runtime::{ContainerRuntime, DockerCli, RuntimeError};
