//! Tumbling-window rate limiting keyed by `origin_token` (spec §4.5).
//!
//! A tumbling window renews its `window_start` only when the previous
//! window has fully elapsed — unlike a sliding window, a burst late in one
//! window does not extend into a rolling history, so the counter is exact
//! per fixed-width interval rather than a weighted estimate.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::F;

/// Result of [`RateLimiter::check`], matching the server's
/// `X-RateLimit-*` response headers one-to-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckResult {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStats {
    pub total_tokens: usize,
    pub total_requests: u64,
}

struct Entry {
    count: u32,
    window_start: i64,
}

/// In-memory, per-process tumbling-window limiter. One entry per
/// `origin_token`.
pub struct RateLimiter {
    max_requests: u32,
    window_seconds: i64,
    entries: Mutex<HashMap<F, Entry>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_seconds: i64) -> Self {
        Self { max_requests, window_seconds, entries: Mutex::new(HashMap::new()) }
    }

    /// `check(token) -> {allowed, remaining, reset_at}` per spec §4.5.
    pub fn check(&self, origin_token: F, now: i64) -> CheckResult {
        let mut entries = self.entries.lock().expect("rate limiter mutex poisoned");
        let entry = entries.entry(origin_token).or_insert(Entry { count: 0, window_start: now });

        if entry.count == 0 || now - entry.window_start >= self.window_seconds {
            entry.window_start = now;
            entry.count = 1;
            return CheckResult {
                allowed: true,
                remaining: self.max_requests.saturating_sub(1),
                reset_at: now + self.window_seconds,
            };
        }

        if entry.count >= self.max_requests {
            return CheckResult {
                allowed: false,
                remaining: 0,
                reset_at: entry.window_start + self.window_seconds,
            };
        }

        entry.count += 1;
        CheckResult {
            allowed: true,
            remaining: self.max_requests.saturating_sub(entry.count),
            reset_at: entry.window_start + self.window_seconds,
        }
    }

    /// Delete entries whose window has fully elapsed. Runs on a periodic
    /// timer (default 60s, spec §4.5) that must not keep the process alive
    /// on its own — see [`spawn_pruner`].
    pub fn prune(&self, now: i64) {
        let mut entries = self.entries.lock().expect("rate limiter mutex poisoned");
        entries.retain(|_, e| now - e.window_start < self.window_seconds);
    }

    pub fn stats(&self) -> RateLimitStats {
        let entries = self.entries.lock().expect("rate limiter mutex poisoned");
        RateLimitStats {
            total_tokens: entries.len(),
            total_requests: entries.values().map(|e| e.count as u64).sum(),
        }
    }
}

/// A handle to a background pruning task. Dropping it (or calling
/// [`PruneTaskHandle::stop`] explicitly) cancels the task so the timer
/// never keeps the process alive on its own.
pub struct PruneTaskHandle {
    task: tokio::task::JoinHandle<()>,
}

impl PruneTaskHandle {
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for PruneTaskHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn a task that prunes `limiter` every `interval`, using `clock` to
/// decide which entries are stale.
pub fn spawn_pruner(
    limiter: std::sync::Arc<RateLimiter>,
    clock: std::sync::Arc<dyn crate::clock::Clock>,
    interval: Duration,
) -> PruneTaskHandle {
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            limiter.prune(clock.now());
        }
    });
    PruneTaskHandle { task }
}
