// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory container runtime for tests.
//!
//! Records every call and simulates a minimal container table so the
//! manager's state machine can be exercised without Docker.

use super::{ContainerEvent, ContainerRuntime, ContainerState, ExecOutput, RunSpec, RuntimeError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A recorded call against the fake runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeCall {
    Run(String),
    Remove(String),
    Pause(String),
    Unpause(String),
    Exec { name: String, argv: Vec<String> },
    BuildImage(String),
    RemoveImage(String),
}

#[derive(Default)]
struct FakeState {
    containers: HashMap<String, ContainerState>,
    specs: HashMap<String, RunSpec>,
    images: HashSet<String>,
    calls: Vec<RuntimeCall>,
    logs: HashMap<String, String>,
    exec_results: Vec<ExecOutput>,
    fail_next_run: Option<String>,
    fail_next_build: Option<String>,
}

#[derive(Clone, Default)]
pub struct FakeRuntime {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.state.lock().calls.clone()
    }

    pub fn build_count(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, RuntimeCall::BuildImage(_)))
            .count()
    }

    pub fn container_state(&self, name: &str) -> Option<ContainerState> {
        self.state.lock().containers.get(name).copied()
    }

    pub fn container_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().containers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn spec_for(&self, name: &str) -> Option<RunSpec> {
        self.state.lock().specs.get(name).cloned()
    }

    pub fn seed_image(&self, tag: &str) {
        self.state.lock().images.insert(tag.to_string());
    }

    /// Register a container the manager does not know about (an orphan).
    pub fn seed_container(&self, name: &str, state: ContainerState) {
        self.state.lock().containers.insert(name.to_string(), state);
    }

    pub fn seed_logs(&self, name: &str, text: &str) {
        self.state.lock().logs.insert(name.to_string(), text.to_string());
    }

    /// Queue the result returned by the next `exec` call (FIFO).
    pub fn push_exec_result(&self, output: ExecOutput) {
        self.state.lock().exec_results.push(output);
    }

    pub fn fail_next_run(&self, message: &str) {
        self.state.lock().fail_next_run = Some(message.to_string());
    }

    pub fn fail_next_build(&self, message: &str) {
        self.state.lock().fail_next_build = Some(message.to_string());
    }

    pub fn image_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.state.lock().images.iter().cloned().collect();
        tags.sort();
        tags
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn run(&self, spec: &RunSpec) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        state.calls.push(RuntimeCall::Run(spec.name.clone()));
        if let Some(message) = state.fail_next_run.take() {
            return Err(RuntimeError::CommandFailed { op: "docker run", message });
        }
        if state.containers.contains_key(&spec.name) {
            return Err(RuntimeError::CommandFailed {
                op: "docker run",
                message: format!("Conflict. The container name \"{}\" is already in use", spec.name),
            });
        }
        state.containers.insert(spec.name.clone(), ContainerState::Running);
        state.specs.insert(spec.name.clone(), spec.clone());
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        state.calls.push(RuntimeCall::Remove(name.to_string()));
        state.containers.remove(name);
        Ok(())
    }

    async fn pause(&self, name: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        state.calls.push(RuntimeCall::Pause(name.to_string()));
        match state.containers.get_mut(name) {
            Some(s @ ContainerState::Running) => {
                *s = ContainerState::Paused;
                Ok(())
            }
            Some(_) => Err(RuntimeError::CommandFailed {
                op: "docker pause",
                message: "container is not running".to_string(),
            }),
            None => Err(RuntimeError::NotFound(name.to_string())),
        }
    }

    async fn unpause(&self, name: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        state.calls.push(RuntimeCall::Unpause(name.to_string()));
        match state.containers.get_mut(name) {
            Some(s @ ContainerState::Paused) => {
                *s = ContainerState::Running;
                Ok(())
            }
            Some(_) => Err(RuntimeError::CommandFailed {
                op: "docker unpause",
                message: "container is not paused".to_string(),
            }),
            None => Err(RuntimeError::NotFound(name.to_string())),
        }
    }

    async fn state(&self, name: &str) -> Result<ContainerState, RuntimeError> {
        self.state
            .lock()
            .containers
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))
    }

    async fn exec(
        &self,
        name: &str,
        argv: &[String],
        _stdin: Option<&str>,
        _timeout: Duration,
    ) -> Result<ExecOutput, RuntimeError> {
        let mut state = self.state.lock();
        state
            .calls
            .push(RuntimeCall::Exec { name: name.to_string(), argv: argv.to_vec() });
        if !state.containers.contains_key(name) {
            return Err(RuntimeError::NotFound(name.to_string()));
        }
        if state.exec_results.is_empty() {
            Ok(ExecOutput { exit_code: 0, stdout: String::new(), stderr: String::new() })
        } else {
            Ok(state.exec_results.remove(0))
        }
    }

    async fn logs(&self, name: &str, _tail: u32) -> Result<String, RuntimeError> {
        let state = self.state.lock();
        if !state.containers.contains_key(name) {
            return Err(RuntimeError::NotFound(name.to_string()));
        }
        Ok(state.logs.get(name).cloned().unwrap_or_default())
    }

    async fn list_managed(&self) -> Result<Vec<String>, RuntimeError> {
        Ok(self.container_names())
    }

    async fn image_exists(&self, tag: &str) -> Result<bool, RuntimeError> {
        Ok(self.state.lock().images.contains(tag))
    }

    async fn build_image(&self, tag: &str, _dockerfile: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        state.calls.push(RuntimeCall::BuildImage(tag.to_string()));
        if let Some(message) = state.fail_next_build.take() {
            return Err(RuntimeError::CommandFailed { op: "docker build", message });
        }
        state.images.insert(tag.to_string());
        Ok(())
    }

    async fn list_images(&self, repository: &str) -> Result<Vec<String>, RuntimeError> {
        let prefix = format!("{repository}:");
        let mut tags: Vec<String> = self
            .state
            .lock()
            .images
            .iter()
            .filter(|t| t.starts_with(&prefix))
            .cloned()
            .collect();
        tags.sort();
        Ok(tags)
    }

    async fn remove_image(&self, tag: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        state.calls.push(RuntimeCall::RemoveImage(tag.to_string()));
        state.images.remove(tag);
        Ok(())
    }

    async fn watch_events(
        &self,
        _tx: mpsc::Sender<ContainerEvent>,
        cancel: CancellationToken,
    ) -> Result<(), RuntimeError> {
        cancel.cancelled().await;
        Ok(())
    }
}
