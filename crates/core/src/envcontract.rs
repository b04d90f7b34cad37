// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment variable contract between the manager and the in-container
//! wrapper. The manager composes these when starting a worker container;
//! the wrapper reads them at startup and treats missing required ones as a
//! fatal configuration error (exit code 1).

pub const WORKER_ID: &str = "WORKER_ID";
pub const REDIS_URL: &str = "WORKER_REDIS_URL";
pub const AGENT_TYPE: &str = "WORKER_AGENT_TYPE";
pub const INPUT_STREAM: &str = "WORKER_INPUT_STREAM";
pub const OUTPUT_STREAM: &str = "WORKER_OUTPUT_STREAM";
pub const CONSUMER_GROUP: &str = "WORKER_CONSUMER_GROUP";
pub const CONSUMER_NAME: &str = "WORKER_CONSUMER_NAME";

// Optional tuning and context.
pub const SUBPROCESS_TIMEOUT_SECONDS: &str = "WORKER_SUBPROCESS_TIMEOUT_SECONDS";
pub const POLL_INTERVAL_MS: &str = "WORKER_POLL_INTERVAL_MS";
pub const SESSION_TTL_SECONDS: &str = "WORKER_SESSION_TTL_SECONDS";
pub const ALLOWED_TOOLS: &str = "WORKER_ALLOWED_TOOLS";
pub const INSTRUCTIONS: &str = "WORKER_INSTRUCTIONS";

/// Injected for `auth_mode = api_key`.
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
