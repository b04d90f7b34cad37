// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker lifecycle authority.
//!
//! `WorkerManager` owns every state transition in the worker state
//! machine. The registry is in-memory: commands are partitioned across
//! manager instances by the consumer group, and container names are
//! unique, so no cross-instance record sharing is needed. Containers
//! found without a record (after a restart) are adopted on `create` or
//! swept as orphans.
//!
//! Lock discipline: the registry mutex is never held across an await.

use crate::config::ManagerConfig;
use crate::image::ImageStore;
use crate::runtime::{ContainerRuntime, ContainerState, ExecOutput, RunSpec, RuntimeError};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use wharf_core::{
    envcontract, labels, streams, tools, Clock, ConfigError, StreamNames, WorkerConfig, WorkerId,
    WorkerState, WorkerType,
};

/// Shell fragment used by `send_file`: writes stdin to `$0`, creating
/// parent directories. The target path travels as an argument, never
/// spliced into the script.
const WRITE_FILE_SCRIPT: &str = r#"mkdir -p "$(dirname "$0")" && cat > "$0""#;

/// Errors from manager operations, surfaced as structured command
/// failures on the response stream.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("invalid worker config: {0}")]
    Config(#[from] ConfigError),

    #[error("worker not found: {0}")]
    NotFound(WorkerId),

    #[error("worker {worker_id} is {state}")]
    InvalidState { worker_id: WorkerId, state: WorkerState },

    #[error("host session mount requested but no host session directory is configured")]
    MissingSessionDir,

    #[error("image build failed: {0}")]
    ImageBuild(String),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Per-worker bookkeeping.
#[derive(Debug, Clone)]
pub struct WorkerRecord {
    pub state: WorkerState,
    pub worker_type: WorkerType,
    pub container: String,
    pub image_tag: String,
    pub ttl: Duration,
    pub created_at: Instant,
    pub created_wall: DateTime<Utc>,
    pub last_activity: Instant,
    pub last_activity_wall: DateTime<Utc>,
}

/// Status snapshot returned to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerStatus {
    pub state: WorkerState,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

pub struct WorkerManager<R, C> {
    runtime: Arc<R>,
    images: ImageStore<R, C>,
    cfg: Arc<ManagerConfig>,
    clock: C,
    names: StreamNames,
    workers: Mutex<HashMap<WorkerId, WorkerRecord>>,
}

impl<R: ContainerRuntime, C: Clock> WorkerManager<R, C> {
    pub fn new(
        runtime: Arc<R>,
        images: ImageStore<R, C>,
        cfg: Arc<ManagerConfig>,
        clock: C,
    ) -> Self {
        let names = cfg.stream_names();
        Self { runtime, images, cfg, clock, names, workers: Mutex::new(HashMap::new()) }
    }

    pub fn runtime(&self) -> &Arc<R> {
        &self.runtime
    }

    pub fn stream_names(&self) -> &StreamNames {
        &self.names
    }

    // -- operations --

    /// Create and start a worker. Idempotent by name: a repeated create
    /// for a non-terminal worker returns the existing id without touching
    /// the runtime.
    pub async fn create(&self, config: WorkerConfig) -> Result<WorkerId, ManagerError> {
        config.validate()?;

        // A session mount needs a resolvable host directory, and auth is
        // part of the contract: reject before any state is touched rather
        // than start a credential-less container.
        let session_dir = config
            .host_claude_dir
            .clone()
            .or_else(|| self.cfg.host_claude_dir.clone());
        if config.wants_session_mount() && session_dir.is_none() {
            return Err(ManagerError::MissingSessionDir);
        }

        let worker_id = WorkerId::new(config.name.clone());
        let container = streams::container_name(&self.cfg.container_prefix, &worker_id);

        {
            let mut workers = self.workers.lock();
            if let Some(record) = workers.get(&worker_id) {
                if !record.state.is_terminal() {
                    tracing::debug!(%worker_id, "create is a no-op, worker already live");
                    return Ok(worker_id);
                }
            }
            let now = self.clock.now();
            workers.insert(
                worker_id.clone(),
                WorkerRecord {
                    state: WorkerState::Creating,
                    worker_type: config.worker_type,
                    container: container.clone(),
                    image_tag: String::new(),
                    ttl: config.ttl(),
                    created_at: now,
                    created_wall: Utc::now(),
                    last_activity: now,
                    last_activity_wall: Utc::now(),
                },
            );
        }

        let base_image = self.cfg.base_image(config.agent_type).to_string();
        let tag = match self
            .images
            .ensure(config.agent_type, &config.capabilities, &base_image)
            .await
        {
            Ok(tag) => tag,
            Err(err) => {
                self.set_state(&worker_id, WorkerState::Failed);
                return Err(ManagerError::ImageBuild(err.to_string()));
            }
        };
        let _ = self.with_record(&worker_id, |record| record.image_tag = tag.clone());

        let spec = self.run_spec(&worker_id, &container, &tag, &config, session_dir.as_deref());
        match self.runtime.run(&spec).await {
            Ok(()) => {
                self.set_state(&worker_id, WorkerState::Running);
                tracing::info!(%worker_id, image = %tag, %container, "worker created");
                Ok(worker_id)
            }
            Err(err) if err.to_string().contains("already in use") => {
                self.adopt_existing(&worker_id, &container, &spec).await
            }
            Err(err) => {
                // Invariant: zero containers with this name after a failed
                // create.
                let _ = self.runtime.remove(&container).await;
                self.set_state(&worker_id, WorkerState::Failed);
                tracing::error!(%worker_id, error = %err, "worker creation failed");
                Err(ManagerError::Runtime(err))
            }
        }
    }

    /// A container with this worker's name already exists (create retried
    /// across a manager restart). Adopt it when alive; replace it when
    /// dead.
    async fn adopt_existing(
        &self,
        worker_id: &WorkerId,
        container: &str,
        spec: &RunSpec,
    ) -> Result<WorkerId, ManagerError> {
        let state = self.runtime.state(container).await.unwrap_or(ContainerState::Unknown);
        match state {
            ContainerState::Running => {
                self.set_state(worker_id, WorkerState::Running);
                tracing::info!(%worker_id, "adopted running container");
                Ok(worker_id.clone())
            }
            ContainerState::Paused => {
                self.set_state(worker_id, WorkerState::Running);
                self.set_state(worker_id, WorkerState::Paused);
                tracing::info!(%worker_id, "adopted paused container");
                Ok(worker_id.clone())
            }
            _ => {
                self.runtime.remove(container).await?;
                match self.runtime.run(spec).await {
                    Ok(()) => {
                        self.set_state(worker_id, WorkerState::Running);
                        tracing::info!(%worker_id, "replaced dead container");
                        Ok(worker_id.clone())
                    }
                    Err(err) => {
                        let _ = self.runtime.remove(container).await;
                        self.set_state(worker_id, WorkerState::Failed);
                        Err(ManagerError::Runtime(err))
                    }
                }
            }
        }
    }

    /// Destroy a worker's container. No-op when the worker is unknown or
    /// already gone.
    pub async fn delete(&self, worker_id: &WorkerId) -> Result<(), ManagerError> {
        let container = self
            .with_record(worker_id, |record| record.container.clone())
            .unwrap_or_else(|| streams::container_name(&self.cfg.container_prefix, worker_id));

        // Mark stopped before removal so the die event from `rm -f` is
        // not misread as a crash.
        self.set_state(worker_id, WorkerState::Stopped);
        self.runtime.remove(&container).await?;
        tracing::info!(%worker_id, "worker deleted");
        Ok(())
    }

    pub async fn pause(&self, worker_id: &WorkerId) -> Result<(), ManagerError> {
        let container = self.container_in_state(worker_id, WorkerState::Running)?;
        self.runtime.pause(&container).await?;
        self.set_state(worker_id, WorkerState::Paused);
        tracing::info!(%worker_id, "worker paused");
        Ok(())
    }

    pub async fn resume(&self, worker_id: &WorkerId) -> Result<(), ManagerError> {
        let container = self.container_in_state(worker_id, WorkerState::Paused)?;
        self.runtime.unpause(&container).await?;
        self.set_state(worker_id, WorkerState::Running);
        self.observe_activity(worker_id);
        tracing::info!(%worker_id, "worker resumed");
        Ok(())
    }

    pub fn status(&self, worker_id: &WorkerId) -> Result<WorkerStatus, ManagerError> {
        let workers = self.workers.lock();
        let record = workers.get(worker_id).ok_or_else(|| {
            ManagerError::NotFound(worker_id.clone())
        })?;
        Ok(WorkerStatus {
            state: record.state,
            created_at: record.created_wall,
            last_activity_at: record.last_activity_wall,
        })
    }

    /// Run a shell command inside the worker. A paused worker is resumed
    /// first (incoming work is the resume trigger).
    pub async fn send_command(
        &self,
        worker_id: &WorkerId,
        shell_command: &str,
        timeout: Option<Duration>,
    ) -> Result<ExecOutput, ManagerError> {
        let container = self.live_container(worker_id).await?;
        let timeout = timeout.unwrap_or(self.cfg.exec_timeout);
        let argv =
            vec!["sh".to_string(), "-c".to_string(), shell_command.to_string()];
        let output = self.runtime.exec(&container, &argv, None, timeout).await?;
        self.observe_activity(worker_id);
        Ok(output)
    }

    /// Write a file inside the worker, piping the content over stdin.
    pub async fn send_file(
        &self,
        worker_id: &WorkerId,
        path: &str,
        content: &str,
    ) -> Result<(), ManagerError> {
        let container = self.live_container(worker_id).await?;
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            WRITE_FILE_SCRIPT.to_string(),
            path.to_string(),
        ];
        let output =
            self.runtime.exec(&container, &argv, Some(content), self.cfg.exec_timeout).await?;
        if output.exit_code != 0 {
            return Err(ManagerError::Runtime(RuntimeError::CommandFailed {
                op: "send_file",
                message: output.stderr.trim().to_string(),
            }));
        }
        self.observe_activity(worker_id);
        Ok(())
    }

    pub async fn get_logs(&self, worker_id: &WorkerId, tail: u32) -> Result<String, ManagerError> {
        let container = self
            .with_record(worker_id, |record| record.container.clone())
            .ok_or_else(|| ManagerError::NotFound(worker_id.clone()))?;
        Ok(self.runtime.logs(&container, tail).await?)
    }

    // -- observations --

    /// Refresh a worker's activity stamp. Fed by the lifecycle watcher;
    /// the manager is the sole activity authority.
    pub fn observe_activity(&self, worker_id: &WorkerId) {
        let now = self.clock.now();
        let mut workers = self.workers.lock();
        if let Some(record) = workers.get_mut(worker_id) {
            record.last_activity = now;
            record.last_activity_wall = Utc::now();
        }
    }

    /// Record a container exit seen on the runtime event feed. Returns
    /// the new state when this transitioned the worker; `None` when the
    /// worker is unknown or already terminal (deletion, expiry).
    pub fn on_container_exit(&self, worker_id: &WorkerId, exit_code: i64) -> Option<WorkerState> {
        let mut workers = self.workers.lock();
        let record = workers.get_mut(worker_id)?;
        if record.state.is_terminal() {
            return None;
        }
        let next =
            if exit_code == 0 { WorkerState::Stopped } else { WorkerState::Failed };
        record.state = next;
        Some(next)
    }

    pub fn worker_type_of(&self, worker_id: &WorkerId) -> Option<WorkerType> {
        self.with_record(worker_id, |record| record.worker_type)
    }

    // -- reaper entry points --

    /// Pause every running worker idle for longer than `threshold`.
    /// Returns the paused ids.
    pub async fn pause_idle(&self, threshold: Duration) -> Vec<WorkerId> {
        let now = self.clock.now();
        let candidates: Vec<(WorkerId, String)> = {
            let workers = self.workers.lock();
            workers
                .iter()
                .filter(|(_, r)| {
                    r.state == WorkerState::Running
                        && now.duration_since(r.last_activity) > threshold
                })
                .map(|(id, r)| (id.clone(), r.container.clone()))
                .collect()
        };

        let mut paused = Vec::new();
        for (worker_id, container) in candidates {
            match self.runtime.pause(&container).await {
                Ok(()) => {
                    self.set_state(&worker_id, WorkerState::Paused);
                    tracing::info!(%worker_id, "idle worker paused");
                    paused.push(worker_id);
                }
                Err(err) => {
                    tracing::warn!(%worker_id, error = %err, "idle pause failed");
                }
            }
        }
        paused
    }

    /// Destroy every worker whose age exceeds its TTL, regardless of
    /// state. Returns the expired ids.
    pub async fn reap_expired(&self) -> Vec<WorkerId> {
        let now = self.clock.now();
        let candidates: Vec<(WorkerId, String)> = {
            let workers = self.workers.lock();
            workers
                .iter()
                .filter(|(_, r)| {
                    !r.state.is_terminal() && now.duration_since(r.created_at) > r.ttl
                })
                .map(|(id, r)| (id.clone(), r.container.clone()))
                .collect()
        };

        let mut expired = Vec::new();
        for (worker_id, container) in candidates {
            // Mark first so the die event is not attributed to a crash.
            self.set_state(&worker_id, WorkerState::Expired);
            if let Err(err) = self.runtime.remove(&container).await {
                tracing::warn!(%worker_id, error = %err, "expired container removal failed");
            }
            tracing::info!(%worker_id, "worker expired");
            expired.push(worker_id);
        }
        expired
    }

    /// Image tags of all non-terminal workers (GC must never remove
    /// these).
    pub fn live_image_tags(&self) -> HashSet<String> {
        let workers = self.workers.lock();
        workers
            .values()
            .filter(|r| !r.state.is_terminal() && !r.image_tag.is_empty())
            .map(|r| r.image_tag.clone())
            .collect()
    }

    /// Garbage-collect cold cached images. Returns the removed tags.
    pub async fn gc_images(&self, retention: Duration) -> Result<Vec<String>, ManagerError> {
        let live = self.live_image_tags();
        Ok(self.images.gc(retention, &live).await?)
    }

    // -- internals --

    fn with_record<T>(
        &self,
        worker_id: &WorkerId,
        f: impl FnOnce(&mut WorkerRecord) -> T,
    ) -> Option<T> {
        let mut workers = self.workers.lock();
        workers.get_mut(worker_id).map(f)
    }

    fn set_state(&self, worker_id: &WorkerId, next: WorkerState) {
        let mut workers = self.workers.lock();
        if let Some(record) = workers.get_mut(worker_id) {
            if record.state != next && !record.state.can_transition_to(next) {
                tracing::debug!(
                    %worker_id,
                    from = %record.state,
                    to = %next,
                    "suppressing invalid state transition"
                );
                return;
            }
            record.state = next;
        }
    }

    fn container_in_state(
        &self,
        worker_id: &WorkerId,
        expected: WorkerState,
    ) -> Result<String, ManagerError> {
        let workers = self.workers.lock();
        let record = workers.get(worker_id).ok_or_else(|| {
            ManagerError::NotFound(worker_id.clone())
        })?;
        if record.state != expected {
            return Err(ManagerError::InvalidState {
                worker_id: worker_id.clone(),
                state: record.state,
            });
        }
        Ok(record.container.clone())
    }

    /// Resolve a worker's container for incoming work, resuming it when
    /// paused.
    async fn live_container(&self, worker_id: &WorkerId) -> Result<String, ManagerError> {
        let (state, container) = {
            let workers = self.workers.lock();
            let record = workers.get(worker_id).ok_or_else(|| {
                ManagerError::NotFound(worker_id.clone())
            })?;
            (record.state, record.container.clone())
        };
        match state {
            WorkerState::Running => Ok(container),
            WorkerState::Paused => {
                self.resume(worker_id).await?;
                Ok(container)
            }
            state => Err(ManagerError::InvalidState { worker_id: worker_id.clone(), state }),
        }
    }

    fn run_spec(
        &self,
        worker_id: &WorkerId,
        container: &str,
        image_tag: &str,
        config: &WorkerConfig,
        session_dir: Option<&std::path::Path>,
    ) -> RunSpec {
        let mut env: Vec<(String, String)> = vec![
            (envcontract::WORKER_ID.into(), worker_id.to_string()),
            (envcontract::REDIS_URL.into(), self.cfg.redis_url.clone()),
            (envcontract::AGENT_TYPE.into(), config.agent_type.to_string()),
            (envcontract::INPUT_STREAM.into(), self.names.input(worker_id)),
            (envcontract::OUTPUT_STREAM.into(), self.names.output(worker_id)),
            (envcontract::CONSUMER_GROUP.into(), self.names.input_group(worker_id)),
            (envcontract::CONSUMER_NAME.into(), worker_id.to_string()),
        ];
        if !config.allowed_tools.is_empty() {
            env.push((envcontract::ALLOWED_TOOLS.into(), tools::join(&config.allowed_tools)));
        }
        if !config.instructions.is_empty() {
            env.push((envcontract::INSTRUCTIONS.into(), config.instructions.clone()));
        }
        if config.auth_mode == wharf_core::config::AuthMode::ApiKey {
            if let Some(key) = &self.cfg.api_key {
                env.push((envcontract::ANTHROPIC_API_KEY.into(), key.clone()));
            }
        }
        // Caller-provided env last, so it can override the defaults.
        for (key, value) in &config.env_vars {
            env.push((key.clone(), value.clone()));
        }

        let labels = vec![
            (labels::MANAGED.into(), "true".into()),
            (labels::WORKER_ID.into(), worker_id.to_string()),
            (labels::AGENT_KIND.into(), config.agent_type.to_string()),
            (labels::TASK_ID.into(), String::new()),
            (labels::WORKER_TYPE.into(), config.worker_type.to_string()),
        ];

        let mut mounts = Vec::new();
        if config.wants_session_mount() {
            // create() has already rejected configs with no resolvable dir.
            if let Some(dir) = session_dir {
                mounts.push((
                    dir.display().to_string(),
                    "/home/worker/.claude".to_string(),
                    true,
                ));
            }
        }
        if config.capabilities.iter().any(|c| c.needs_docker_socket()) {
            mounts.push((
                "/var/run/docker.sock".to_string(),
                "/var/run/docker.sock".to_string(),
                false,
            ));
        }

        RunSpec {
            name: container.to_string(),
            image: image_tag.to_string(),
            env,
            labels,
            mounts,
            network: self.cfg.network.clone(),
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
