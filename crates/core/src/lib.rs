// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wharf-core: domain types and wire contracts for the Wharf worker
//! orchestration subsystem.
//!
//! Everything that crosses a process boundary lives here: worker identity
//! and state, the command/response protocol on the command bus, lifecycle
//! events, the capability→image derivation, and the stream/key naming
//! scheme. The manager, wrapper, and spawner crates all depend on this one
//! and on nothing of each other.

pub mod agent;
pub mod capability;
pub mod clock;
pub mod config;
pub mod envcontract;
pub mod event;
pub mod image;
pub mod labels;
pub mod protocol;
pub mod streams;
pub mod tools;
pub mod worker;

pub use agent::AgentKind;
pub use capability::Capability;
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{AuthMode, ConfigError, WorkerConfig, WorkerType};
pub use event::{CrashRecord, LifecycleEvent, LifecyclePhase, RawOutput, TaskMessage};
pub use image::{capability_hash, dockerfile, image_tag};
pub use protocol::{Command, Response};
pub use streams::{StreamNames, COMMAND_GROUP};
pub use tools::ToolGroup;
pub use worker::{WorkerId, WorkerState};
