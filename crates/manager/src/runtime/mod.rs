// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container runtime abstraction.
//!
//! The manager drives a single-host container runtime through this trait.
//! The production implementation shells out to the `docker` CLI
//! ([`DockerCli`]); tests use an in-memory fake.

mod docker;

pub use docker::DockerCli;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Errors from runtime operations.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("{op} failed: {message}")]
    CommandFailed { op: &'static str, message: String },

    #[error("{op} timed out after {timeout:?}")]
    Timeout { op: &'static str, timeout: Duration },

    #[error("runtime io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Observed container state, mapped from the runtime's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Exited,
    Dead,
    Unknown,
}

/// Everything needed to start a worker container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSpec {
    pub name: String,
    pub image: String,
    pub env: Vec<(String, String)>,
    pub labels: Vec<(String, String)>,
    /// `(host_path, container_path, read_only)` bind mounts.
    pub mounts: Vec<(String, String, bool)>,
    /// Named network; host networking when `None`.
    pub network: Option<String>,
}

/// Captured output of an exec inside a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// One event from the runtime's event feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEvent {
    /// Runtime action, e.g. `die`.
    pub action: String,
    /// Actor attributes: labels plus `name` and `exitCode`.
    pub attributes: HashMap<String, String>,
}

impl ContainerEvent {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn exit_code(&self) -> Option<i64> {
        self.attribute("exitCode").and_then(|c| c.parse().ok())
    }
}

/// Single-host container runtime operations used by the manager.
#[async_trait]
pub trait ContainerRuntime: Send + Sync + 'static {
    /// Start a detached container. Fails on name conflict.
    async fn run(&self, spec: &RunSpec) -> Result<(), RuntimeError>;

    /// Force-remove a container. Absent containers are not an error.
    async fn remove(&self, name: &str) -> Result<(), RuntimeError>;

    async fn pause(&self, name: &str) -> Result<(), RuntimeError>;

    async fn unpause(&self, name: &str) -> Result<(), RuntimeError>;

    async fn state(&self, name: &str) -> Result<ContainerState, RuntimeError>;

    /// Exec a command inside a running container, with optional stdin and
    /// a hard timeout (the exec process is killed on expiry).
    async fn exec(
        &self,
        name: &str,
        argv: &[String],
        stdin: Option<&str>,
        timeout: Duration,
    ) -> Result<ExecOutput, RuntimeError>;

    /// Last `tail` lines of a container's logs (stdout + stderr).
    async fn logs(&self, name: &str, tail: u32) -> Result<String, RuntimeError>;

    /// Names of all containers (running or not) carrying the managed label.
    async fn list_managed(&self) -> Result<Vec<String>, RuntimeError>;

    async fn image_exists(&self, tag: &str) -> Result<bool, RuntimeError>;

    /// Build an image from in-memory Dockerfile content.
    async fn build_image(&self, tag: &str, dockerfile: &str) -> Result<(), RuntimeError>;

    /// All local image tags under the given repository prefix.
    async fn list_images(&self, repository: &str) -> Result<Vec<String>, RuntimeError>;

    async fn remove_image(&self, tag: &str) -> Result<(), RuntimeError>;

    /// Stream container-die events into `tx` until cancelled.
    async fn watch_events(
        &self,
        tx: mpsc::Sender<ContainerEvent>,
        cancel: CancellationToken,
    ) -> Result<(), RuntimeError>;
}
