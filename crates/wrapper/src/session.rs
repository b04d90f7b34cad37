// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session id persistence.
//!
//! The agent's conversational context is keyed by an opaque session id
//! stored under `worker:session:<worker_id>` with a TTL refreshed on
//! every access. Families that manage their own ids (Claude) never get a
//! pre-generated one: the first turn runs without a session and the id is
//! captured from the agent's output afterwards.

use std::time::Duration;
use uuid::Uuid;
use wharf_broker::{Broker, BrokerError};

pub struct SessionStore {
    broker: Broker,
    key: String,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(broker: Broker, key: impl Into<String>, ttl: Duration) -> Self {
        Self { broker, key: key.into(), ttl }
    }

    /// Current session id, refreshing the TTL when one exists.
    pub async fn get(&self) -> Result<Option<String>, BrokerError> {
        let session = self.broker.get(&self.key).await?;
        if session.is_some() {
            self.broker.expire(&self.key, self.ttl.as_secs() as i64).await?;
        }
        Ok(session)
    }

    /// Resolve the session for a task. With `create_new` a fresh id is
    /// allocated on absence via set-if-not-exists (first writer wins, the
    /// loser re-reads); without it absence stays `None`.
    pub async fn get_or_create(&self, create_new: bool) -> Result<Option<String>, BrokerError> {
        if let Some(session) = self.get().await? {
            return Ok(Some(session));
        }
        if !create_new {
            return Ok(None);
        }

        let candidate = Uuid::new_v4().to_string();
        let session = if self.broker.set_nx(&self.key, &candidate).await? {
            candidate
        } else {
            // Lost the race; take the winner's id.
            self.broker.get(&self.key).await?.unwrap_or(candidate)
        };
        self.broker.expire(&self.key, self.ttl.as_secs() as i64).await?;
        Ok(Some(session))
    }

    /// Persist an agent-allocated session id.
    pub async fn save(&self, session_id: &str) -> Result<(), BrokerError> {
        self.broker.set_with_ttl(&self.key, session_id, self.ttl.as_secs()).await
    }
}
