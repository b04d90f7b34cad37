// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The broker client.
//!
//! Wraps a `redis::aio::ConnectionManager` (auto-reconnecting, cheap to
//! clone) and exposes exactly the operations the subsystem uses. Writes
//! and point reads go through a bounded retry; blocking stream reads do
//! not (their timeouts are part of normal operation).

use crate::entry::{StreamEntry, DATA_FIELD};
use crate::retry::RetryBudget;
use crate::{BrokerError, DecodeError};
use redis::aio::ConnectionManager;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;

/// Handle to the broker. Clone freely; all clones share one connection.
#[derive(Clone)]
pub struct Broker {
    conn: ConnectionManager,
}

impl Broker {
    /// Connect to the broker at `url` (`redis://host:port/db`).
    pub async fn connect(url: &str) -> Result<Self, BrokerError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    async fn with_retry<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, BrokerError>
    where
        F: FnMut(ConnectionManager) -> Fut,
        Fut: Future<Output = redis::RedisResult<T>>,
    {
        let mut budget = RetryBudget::default();
        loop {
            match op(self.conn.clone()).await {
                Ok(value) => return Ok(value),
                Err(err) => match budget.next_delay() {
                    Some(delay) => {
                        tracing::warn!(
                            op = label,
                            error = %err,
                            attempt = budget.attempts_used(),
                            "broker call failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(BrokerError::Redis(err)),
                },
            }
        }
    }

    // -- streams --

    /// Append `value` to `stream` as a `data`-field JSON blob. Returns the
    /// broker-assigned entry id.
    pub async fn publish<T: Serialize>(
        &self,
        stream: &str,
        value: &T,
    ) -> Result<String, BrokerError> {
        let payload = serde_json::to_string(value).map_err(DecodeError::Json)?;
        self.with_retry("xadd", |mut conn| {
            let stream = stream.to_string();
            let payload = payload.clone();
            async move { conn.xadd(stream, "*", &[(DATA_FIELD, payload)]).await }
        })
        .await
    }

    /// Create the consumer group at stream start, creating the stream if
    /// missing. An already-existing group is not an error.
    pub async fn ensure_group(&self, stream: &str, group: &str) -> Result<(), BrokerError> {
        let result: redis::RedisResult<()> = {
            let mut conn = self.conn.clone();
            conn.xgroup_create_mkstream(stream, group, "0").await
        };
        match result {
            Ok(()) => Ok(()),
            Err(err) if err.to_string().contains("BUSYGROUP") => Ok(()),
            Err(err) => Err(BrokerError::Redis(err)),
        }
    }

    /// Block-read up to `count` new entries for `consumer` in `group`.
    /// Returns an empty vec on block timeout.
    pub async fn read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: usize,
        block_ms: usize,
    ) -> Result<Vec<StreamEntry>, BrokerError> {
        let opts = StreamReadOptions::default()
            .group(group, consumer)
            .count(count)
            .block(block_ms);
        let mut conn = self.conn.clone();
        let reply: Option<StreamReadReply> =
            conn.xread_options(&[stream], &[">"], &opts).await?;
        Ok(flatten_read_reply(reply))
    }

    /// Block-read entries appended after `last_id` without a group.
    pub async fn read_after(
        &self,
        stream: &str,
        last_id: &str,
        count: usize,
        block_ms: usize,
    ) -> Result<Vec<StreamEntry>, BrokerError> {
        let opts = StreamReadOptions::default().count(count).block(block_ms);
        let mut conn = self.conn.clone();
        let reply: Option<StreamReadReply> =
            conn.xread_options(&[stream], &[last_id], &opts).await?;
        Ok(flatten_read_reply(reply))
    }

    /// Id of the newest entry on `stream`, or `None` for an empty or
    /// missing stream. Used to anchor response tailing before publishing
    /// a request.
    pub async fn last_entry_id(&self, stream: &str) -> Result<Option<String>, BrokerError> {
        self.with_retry("xrevrange", |mut conn| {
            let stream = stream.to_string();
            async move {
                let reply: redis::streams::StreamRangeReply =
                    conn.xrevrange_count(stream, "+", "-", 1).await?;
                Ok(reply.ids.into_iter().next().map(|entry| entry.id))
            }
        })
        .await
    }

    /// Acknowledge one entry for the group.
    pub async fn ack(&self, stream: &str, group: &str, id: &str) -> Result<(), BrokerError> {
        self.with_retry("xack", |mut conn| {
            let stream = stream.to_string();
            let group = group.to_string();
            let id = id.to_string();
            async move { conn.xack(stream, group, &[id]).await }
        })
        .await
    }

    // -- keys --

    pub async fn get(&self, key: &str) -> Result<Option<String>, BrokerError> {
        self.with_retry("get", |mut conn| {
            let key = key.to_string();
            async move { conn.get(key).await }
        })
        .await
    }

    /// Set `key` without expiry.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), BrokerError> {
        self.with_retry("set", |mut conn| {
            let key = key.to_string();
            let value = value.to_string();
            async move { conn.set(key, value).await }
        })
        .await
    }

    /// Set `key` with a TTL in seconds.
    pub async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<(), BrokerError> {
        self.with_retry("set_ex", |mut conn| {
            let key = key.to_string();
            let value = value.to_string();
            async move { conn.set_ex(key, value, ttl_seconds).await }
        })
        .await
    }

    /// Set `key` only when absent (first writer wins). Returns whether
    /// this call wrote the value.
    pub async fn set_nx(&self, key: &str, value: &str) -> Result<bool, BrokerError> {
        self.with_retry("set_nx", |mut conn| {
            let key = key.to_string();
            let value = value.to_string();
            async move { conn.set_nx(key, value).await }
        })
        .await
    }

    /// Refresh a key's TTL.
    pub async fn expire(&self, key: &str, ttl_seconds: i64) -> Result<(), BrokerError> {
        self.with_retry("expire", |mut conn| {
            let key = key.to_string();
            async move { conn.expire(key, ttl_seconds).await }
        })
        .await
    }

    pub async fn del(&self, key: &str) -> Result<(), BrokerError> {
        self.with_retry("del", |mut conn| {
            let key = key.to_string();
            async move { conn.del(key).await }
        })
        .await
    }

    /// All keys matching `pattern`, via cursored SCAN.
    pub async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, BrokerError> {
        let mut conn = self.conn.clone();
        let mut iter = conn.scan_match::<_, String>(pattern).await?;
        let mut keys = Vec::new();
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        Ok(keys)
    }

    // -- hashes --

    /// Set fields on a hash.
    pub async fn hset(&self, key: &str, fields: &[(String, String)]) -> Result<(), BrokerError> {
        let fields = fields.to_vec();
        self.with_retry("hset", |mut conn| {
            let key = key.to_string();
            let fields = fields.clone();
            async move { conn.hset_multiple(key, &fields).await }
        })
        .await
    }

    pub async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, BrokerError> {
        self.with_retry("hget", |mut conn| {
            let key = key.to_string();
            let field = field.to_string();
            async move { conn.hget(key, field).await }
        })
        .await
    }

    pub async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, BrokerError> {
        self.with_retry("hgetall", |mut conn| {
            let key = key.to_string();
            async move { conn.hgetall(key).await }
        })
        .await
    }
}

/// Flatten a (possibly nil) XREAD reply into owned entries.
fn flatten_read_reply(reply: Option<StreamReadReply>) -> Vec<StreamEntry> {
    let Some(reply) = reply else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for key in reply.keys {
        for id in key.ids {
            let mut fields: Vec<(String, String)> = Vec::with_capacity(id.map.len());
            for (field, value) in id.map {
                match redis::from_redis_value::<String>(&value) {
                    Ok(text) => fields.push((field, text)),
                    Err(err) => {
                        tracing::warn!(
                            entry = %id.id,
                            %field,
                            error = %err,
                            "dropping non-text stream field"
                        );
                    }
                }
            }
            out.push(StreamEntry::new(id.id, fields));
        }
    }
    out
}
