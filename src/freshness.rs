//! Proof freshness enforcement
//!
//! A proof is accepted only within a short window after the timestamp it
//! claims, measured against the ledger's trusted clock. This bounds replay
//! without any nonce tracking on the verifier side.
//!
//! # Threat Model
//!
//! An attacker who captures a proof can replay it:
//! - Only until the window closes (10 seconds by default)
//! - Only for the same service it was scoped to
//!
//! Timestamps ahead of the trusted clock are rejected outright; there is no
//! skew allowance because holders read time from the same ledger.

use chrono::Duration;

use crate::metadata::Timestamp;

/// Default window after the claimed timestamp during which a proof is accepted
pub const DEFAULT_FRESHNESS_MS: i64 = 10_000;

/// Result of a freshness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessResult {
    /// `claimed <= now <= claimed + window`
    Fresh,
    /// Claimed timestamp is later than the trusted clock
    FromFuture { ahead_ms: i64 },
    /// Window has elapsed
    Stale { age_ms: i64 },
}

/// Accepted age range for a proof's claimed timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessWindow {
    max_age: Duration,
}

impl FreshnessWindow {
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    pub fn from_millis(ms: i64) -> Self {
        Self::new(Duration::milliseconds(ms))
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Check a claimed timestamp against the trusted current time
    pub fn check(&self, claimed: Timestamp, now: Timestamp) -> FreshnessResult {
        if claimed > now {
            return FreshnessResult::FromFuture {
                ahead_ms: (claimed - now).num_milliseconds(),
            };
        }

        let age = now - claimed;
        if age > self.max_age {
            FreshnessResult::Stale {
                age_ms: age.num_milliseconds(),
            }
        } else {
            FreshnessResult::Fresh
        }
    }

    pub fn is_fresh(&self, claimed: Timestamp, now: Timestamp) -> bool {
        self.check(claimed, now) == FreshnessResult::Fresh
    }
}

impl Default for FreshnessWindow {
    fn default() -> Self {
        Self::from_millis(DEFAULT_FRESHNESS_MS)
    }
}
