// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wrapper configuration from the `WORKER_*` environment contract.
//!
//! The manager composes these variables when it starts the container; a
//! missing required variable is a fatal startup error (exit code 1).

use std::time::Duration;
use thiserror::Error;
use wharf_core::{envcontract as env, AgentKind, StreamNames, WorkerId};

#[derive(Debug, Clone)]
pub struct WrapperConfig {
    pub worker_id: WorkerId,
    pub redis_url: String,
    pub agent_type: AgentKind,
    pub input_stream: String,
    pub output_stream: String,
    pub consumer_group: String,
    pub consumer_name: String,
    /// Block timeout for input stream reads.
    pub poll_interval: Duration,
    /// Hard per-task limit on agent subprocess runtime.
    pub subprocess_timeout: Duration,
    /// TTL on the persisted session id.
    pub session_ttl: Duration,
}

/// Errors reading the environment contract.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    #[error("missing required env var {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

fn required(var: &'static str) -> Result<String, EnvError> {
    std::env::var(var).ok().filter(|v| !v.is_empty()).ok_or(EnvError::Missing(var))
}

fn optional_u64(var: &'static str, default: u64) -> Result<u64, EnvError> {
    match std::env::var(var) {
        Ok(raw) if !raw.is_empty() => {
            raw.parse().map_err(|_| EnvError::Invalid { var, value: raw })
        }
        _ => Ok(default),
    }
}

impl WrapperConfig {
    pub fn from_env() -> Result<Self, EnvError> {
        let agent_raw = required(env::AGENT_TYPE)?;
        let agent_type: AgentKind = agent_raw
            .parse()
            .map_err(|_| EnvError::Invalid { var: env::AGENT_TYPE, value: agent_raw })?;

        Ok(Self {
            worker_id: WorkerId::new(required(env::WORKER_ID)?),
            redis_url: required(env::REDIS_URL)?,
            agent_type,
            input_stream: required(env::INPUT_STREAM)?,
            output_stream: required(env::OUTPUT_STREAM)?,
            consumer_group: required(env::CONSUMER_GROUP)?,
            consumer_name: required(env::CONSUMER_NAME)?,
            poll_interval: Duration::from_millis(optional_u64(env::POLL_INTERVAL_MS, 500)?),
            subprocess_timeout: Duration::from_secs(optional_u64(
                env::SUBPROCESS_TIMEOUT_SECONDS,
                300,
            )?),
            session_ttl: Duration::from_secs(optional_u64(env::SESSION_TTL_SECONDS, 3_600)?),
        })
    }

    /// Stream/key naming scheme, recovered from the input stream name
    /// (`<prefix>:<worker_id>:input`) so the wrapper needs no extra
    /// prefix variable. Falls back to the default prefix.
    pub fn stream_names(&self) -> StreamNames {
        let suffix = format!(":{}:input", self.worker_id);
        match self.input_stream.strip_suffix(&suffix) {
            Some(prefix) if !prefix.is_empty() => StreamNames::new(prefix),
            _ => StreamNames::default(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
