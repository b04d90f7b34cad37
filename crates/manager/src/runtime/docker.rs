// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker CLI runtime adapter.
//!
//! Container lifecycle goes through the `docker` binary with
//! `tokio::process` — fully async, no blocking client to pool. The event
//! feed is a long-lived `docker events` child whose JSON lines are parsed
//! into [`ContainerEvent`]s.

use super::{ContainerEvent, ContainerRuntime, ContainerState, ExecOutput, RunSpec, RuntimeError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wharf_core::labels;

/// Runtime adapter backed by the `docker` CLI.
#[derive(Debug, Clone, Default)]
pub struct DockerCli;

impl DockerCli {
    pub fn new() -> Self {
        Self
    }
}

/// Run a docker CLI command and return stdout on success.
async fn run_docker(op: &'static str, args: &[&str]) -> Result<String, RuntimeError> {
    let output = tokio::process::Command::new("docker").args(args).output().await?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(RuntimeError::CommandFailed { op, message: stderr })
    }
}

fn is_not_found(message: &str) -> bool {
    message.contains("No such container") || message.contains("No such object")
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn run(&self, spec: &RunSpec) -> Result<(), RuntimeError> {
        let mut args: Vec<String> =
            vec!["run".into(), "-d".into(), "--name".into(), spec.name.clone()];

        match &spec.network {
            Some(network) => {
                args.push("--network".into());
                args.push(network.clone());
            }
            None => {
                args.push("--network".into());
                args.push("host".into());
            }
        }

        for (key, value) in &spec.env {
            args.push("-e".into());
            args.push(format!("{key}={value}"));
        }
        for (key, value) in &spec.labels {
            args.push("-l".into());
            args.push(format!("{key}={value}"));
        }
        for (host, container, read_only) in &spec.mounts {
            args.push("-v".into());
            if *read_only {
                args.push(format!("{host}:{container}:ro"));
            } else {
                args.push(format!("{host}:{container}"));
            }
        }

        args.push(spec.image.clone());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        run_docker("docker run", &arg_refs).await?;
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), RuntimeError> {
        match run_docker("docker rm", &["rm", "-f", name]).await {
            Ok(_) => Ok(()),
            Err(RuntimeError::CommandFailed { message, .. }) if is_not_found(&message) => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn pause(&self, name: &str) -> Result<(), RuntimeError> {
        run_docker("docker pause", &["pause", name]).await.map(|_| ())
    }

    async fn unpause(&self, name: &str) -> Result<(), RuntimeError> {
        run_docker("docker unpause", &["unpause", name]).await.map(|_| ())
    }

    async fn state(&self, name: &str) -> Result<ContainerState, RuntimeError> {
        let status = match run_docker(
            "docker inspect",
            &["inspect", "--format", "{{.State.Status}}", name],
        )
        .await
        {
            Ok(status) => status,
            Err(RuntimeError::CommandFailed { message, .. }) if is_not_found(&message) => {
                return Err(RuntimeError::NotFound(name.to_string()));
            }
            Err(err) => return Err(err),
        };

        Ok(match status.as_str() {
            "created" => ContainerState::Created,
            "running" => ContainerState::Running,
            "paused" => ContainerState::Paused,
            "exited" => ContainerState::Exited,
            "dead" => ContainerState::Dead,
            _ => ContainerState::Unknown,
        })
    }

    async fn exec(
        &self,
        name: &str,
        argv: &[String],
        stdin: Option<&str>,
        timeout: Duration,
    ) -> Result<ExecOutput, RuntimeError> {
        let mut cmd = tokio::process::Command::new("docker");
        cmd.arg("exec");
        if stdin.is_some() {
            cmd.arg("-i");
        }
        cmd.arg(name).args(argv);
        cmd.stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn()?;

        if let (Some(input), Some(mut handle)) = (stdin, child.stdin.take()) {
            handle.write_all(input.as_bytes()).await?;
            handle.shutdown().await?;
            drop(handle);
        }

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                // wait_with_output consumed the child; kill_on_drop has
                // already reaped it at this point.
                return Err(RuntimeError::Timeout { op: "docker exec", timeout });
            }
        };

        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn logs(&self, name: &str, tail: u32) -> Result<String, RuntimeError> {
        let tail = tail.to_string();
        let output = tokio::process::Command::new("docker")
            .args(["logs", "--tail", tail.as_str(), name])
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if is_not_found(&stderr) {
                return Err(RuntimeError::NotFound(name.to_string()));
            }
            return Err(RuntimeError::CommandFailed { op: "docker logs", message: stderr });
        }

        // docker logs multiplexes the container's stdout and stderr.
        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }

    async fn list_managed(&self) -> Result<Vec<String>, RuntimeError> {
        let filter = format!("label={}=true", labels::MANAGED);
        let stdout = run_docker(
            "docker ps",
            &["ps", "-a", "--filter", filter.as_str(), "--format", "{{.Names}}"],
        )
        .await?;
        Ok(stdout.lines().map(str::to_string).filter(|l| !l.is_empty()).collect())
    }

    async fn image_exists(&self, tag: &str) -> Result<bool, RuntimeError> {
        match run_docker("docker image inspect", &["image", "inspect", tag]).await {
            Ok(_) => Ok(true),
            Err(RuntimeError::CommandFailed { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn build_image(&self, tag: &str, dockerfile: &str) -> Result<(), RuntimeError> {
        let mut child = tokio::process::Command::new("docker")
            .args(["build", "-t", tag, "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut handle) = child.stdin.take() {
            handle.write_all(dockerfile.as_bytes()).await?;
            handle.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(RuntimeError::CommandFailed { op: "docker build", message: stderr });
        }
        Ok(())
    }

    async fn list_images(&self, repository: &str) -> Result<Vec<String>, RuntimeError> {
        let filter = format!("reference={repository}:*");
        let stdout = run_docker(
            "docker images",
            &[
                "images",
                "--filter",
                filter.as_str(),
                "--format",
                "{{.Repository}}:{{.Tag}}",
            ],
        )
        .await?;
        Ok(stdout.lines().map(str::to_string).filter(|l| !l.is_empty()).collect())
    }

    async fn remove_image(&self, tag: &str) -> Result<(), RuntimeError> {
        run_docker("docker rmi", &["rmi", tag]).await.map(|_| ())
    }

    async fn watch_events(
        &self,
        tx: mpsc::Sender<ContainerEvent>,
        cancel: CancellationToken,
    ) -> Result<(), RuntimeError> {
        let mut child = tokio::process::Command::new("docker")
            .args([
                "events",
                "--filter",
                "type=container",
                "--filter",
                "event=die",
                "--format",
                "{{json .}}",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child.stdout.take().ok_or_else(|| RuntimeError::CommandFailed {
            op: "docker events",
            message: "no stdout pipe".to_string(),
        })?;
        let mut lines = BufReader::new(stdout).lines();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = child.kill().await;
                    return Ok(());
                }
                line = lines.next_line() => match line? {
                    Some(line) => {
                        if let Some(event) = parse_event_line(&line) {
                            if tx.send(event).await.is_err() {
                                let _ = child.kill().await;
                                return Ok(());
                            }
                        }
                    }
                    None => {
                        return Err(RuntimeError::CommandFailed {
                            op: "docker events",
                            message: "event stream closed".to_string(),
                        });
                    }
                },
            }
        }
    }
}

/// Parse one `docker events --format '{{json .}}'` line.
fn parse_event_line(line: &str) -> Option<ContainerEvent> {
    let value: serde_json::Value = serde_json::from_str(line.trim()).ok()?;
    let action = value.get("Action")?.as_str()?.to_string();
    let mut attributes = HashMap::new();
    if let Some(attrs) = value
        .get("Actor")
        .and_then(|actor| actor.get("Attributes"))
        .and_then(|attrs| attrs.as_object())
    {
        for (key, val) in attrs {
            if let Some(text) = val.as_str() {
                attributes.insert(key.clone(), text.to_string());
            }
        }
    }
    Some(ContainerEvent { action, attributes })
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;
