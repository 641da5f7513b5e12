use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::interval;

use crate::metrics::TRACKED_KEYS;

// Rate limit entry - tracks attempts per bucket/key
#[derive(Debug, Clone)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: Instant,
}

/// What a store says about a single attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl RateLimitDecision {
    pub fn allowed() -> Self {
        Self {
            success: true,
            error: None,
            retry_after: None,
        }
    }

    pub fn denied(error: impl Into<String>, retry_after: u64) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            retry_after: Some(retry_after),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("rate limit store unreachable: {0}")]
    Unreachable(String),
    #[error("rate limit store returned status {0}")]
    Status(u16),
    #[error("rate limit store sent an invalid response: {0}")]
    InvalidResponse(String),
    #[error("rate limit store timed out after {0:?}")]
    Timeout(Duration),
}

/// Named-bucket check-and-increment counter.
///
/// Implementations must make the check and the increment atomic per key:
/// two concurrent attempts may not both observe "under the limit".
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn check_and_increment(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<RateLimitDecision, StoreError>;

    fn name(&self) -> &'static str;
}

// Store key is a hash of bucket + identity, raw client addresses never land in the map
pub fn make_store_key(bucket: &str, key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bucket);
    hasher.update(":");
    hasher.update(key);
    format!("{:x}", hasher.finalize())
}

pub const DEFAULT_DENIED_MESSAGE: &str = "Too many login attempts. Please try again later.";

// Seconds left in the window, rounded up, never zero
fn retry_after_secs(window: Duration, elapsed: Duration) -> u64 {
    let remaining = window.saturating_sub(elapsed);
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    secs.max(1)
}

/// Fixed-window counter held in process memory.
pub struct MemoryRateLimitStore {
    entries: DashMap<String, RateLimitEntry>,
    limit: u32,
    window: Duration,
}

impl MemoryRateLimitStore {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            limit,
            window,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn check_at(&self, bucket: &str, key: &str, now: Instant) -> RateLimitDecision {
        // entry() holds the shard lock until the guard drops
        let mut entry = self
            .entries
            .entry(make_store_key(bucket, key))
            .or_insert(RateLimitEntry {
                count: 0,
                window_start: now,
            });

        let elapsed = now.saturating_duration_since(entry.window_start);

        // window expired..? reset it
        if elapsed > self.window {
            entry.count = 1;
            entry.window_start = now;
            return RateLimitDecision::allowed();
        }

        if entry.count < self.limit {
            entry.count += 1;
            return RateLimitDecision::allowed();
        }

        RateLimitDecision::denied(
            DEFAULT_DENIED_MESSAGE,
            retry_after_secs(self.window, elapsed),
        )
    }

    // Drops every record whose window has run out. Returns how many were removed.
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let before = self.entries.len();
        let window = self.window;
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.window_start) <= window);
        let removed = before.saturating_sub(self.entries.len());
        TRACKED_KEYS.set(self.entries.len() as f64);
        removed
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn check_and_increment(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<RateLimitDecision, StoreError> {
        let decision = self.check_at(bucket, key, Instant::now());
        TRACKED_KEYS.set(self.entries.len() as f64);
        Ok(decision)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[derive(Serialize)]
struct CheckRequest<'a> {
    bucket: &'a str,
    key: String,
}

/// Counter service reached over HTTP. Speaks `POST {base}/check`.
pub struct RemoteRateLimitStore {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteRateLimitStore {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        // add http:// if not present
        let base_url = if base_url.starts_with("http") {
            base_url.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", base_url.trim_end_matches('/'))
        };
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RateLimitStore for RemoteRateLimitStore {
    async fn check_and_increment(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<RateLimitDecision, StoreError> {
        let body = CheckRequest {
            bucket,
            key: make_store_key(bucket, key),
        };

        let res = self
            .client
            .post(format!("{}/check", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let status = res.status();
        // 429 still carries a decision body
        if !status.is_success() && status.as_u16() != 429 {
            return Err(StoreError::Status(status.as_u16()));
        }

        res.json::<RateLimitDecision>()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

// Background sweeper for the in-memory store
pub async fn sweeper(store: Arc<MemoryRateLimitStore>, sweep_interval: Duration) {
    let mut interval = interval(sweep_interval);

    tracing::info!(interval = ?sweep_interval, "rate limit sweeper started");

    loop {
        interval.tick().await;
        let removed = store.sweep_expired(Instant::now());
        if removed > 0 {
            tracing::debug!(removed, remaining = store.len(), "swept expired rate limit records");
        }
    }
}
