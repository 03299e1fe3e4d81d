//! Injectable clock (spec §6 Clock collaborator interface).
//!
//! Every timing-sensitive check in this crate (expiry, rate-limit
//! windows, proof-verification drift) takes a `&dyn Clock` rather than
//! calling `SystemTime::now()` directly, so tests can drive exact
//! boundaries deterministically.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// `now() -> unix seconds`.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the Unix epoch")
            .as_secs() as i64
    }
}

/// A clock whose value is set explicitly, for deterministic tests. Uses
/// an atomic so it can be shared (e.g. across an axum `State`) and
/// advanced mid-test without `&mut`.
#[derive(Debug)]
pub struct FixedClock(AtomicI64);

impl FixedClock {
    pub fn new(now: i64) -> Self {
        Self(AtomicI64::new(now))
    }

    pub fn set(&self, now: i64) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, delta: i64) {
        self.0.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let clock = FixedClock::new(1000);
        assert_eq!(clock.now(), 1000);
        clock.advance(60);
        assert_eq!(clock.now(), 1060);
        clock.set(0);
        assert_eq!(clock.now(), 0);
    }

    #[test]
    fn system_clock_is_recent() {
        let clock = SystemClock;
        assert!(clock.now() > 1_700_000_000);
    }
}
