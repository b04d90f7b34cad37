// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wharf-spawner: principal→worker mapping and the single-call
//! "send this message to this principal's agent" API.
//!
//! Front-ends (a chat bot, a CLI) hand this layer a principal id and a
//! message; the spawner resolves or creates a long-lived worker for that
//! principal over the command bus, runs the agent CLI inside it with the
//! stored session id, round-trips the new session id, and returns the
//! reply text. If the worker was reaped between turns a fresh one is
//! created transparently — visible only as the agent "forgetting".

pub mod client;
pub mod service;
pub mod spawner;

pub use client::CommandClient;
pub use service::{MessageReply, MessageRequest, SpawnerService};
pub use spawner::{AgentSpawner, SpawnerConfig, SpawnerError};
