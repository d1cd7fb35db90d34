// packages/engine/src/interception/guard.rs
//! One-shot guard per locator pair
//!
//! Exchanging the same pair twice silently reverts the first exchange. The
//! guard turns an accidental second registration into a detected
//! `AlreadyExchanged` outcome. Pairs are unordered: (a, b) and (b, a) claim
//! the same flag.
//!
//! `claim_with` and `release_with` run the exchange while holding the pair's
//! map entry, so the flag and the tables change together: two callers racing
//! on one pair are serialized and the flag always matches the tables.

use crate::interception::model::{ExchangeResult, OperationLocator};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Unordered locator pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    low: OperationLocator,
    high: OperationLocator,
}

impl PairKey {
    pub fn new(a: &OperationLocator, b: &OperationLocator) -> Self {
        if a <= b {
            Self {
                low: a.clone(),
                high: b.clone(),
            }
        } else {
            Self {
                low: b.clone(),
                high: a.clone(),
            }
        }
    }
}

/// Concurrent set of claimed pairs
pub struct SwizzleGuard {
    /// Claimed pair -> claim sequence number
    claimed: DashMap<PairKey, u64>,

    /// Next claim sequence number
    sequence: AtomicU64,
}

impl SwizzleGuard {
    pub fn new() -> Self {
        Self {
            claimed: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Run `exchange` unless the pair is claimed; claim it if the exchange succeeds
    pub fn claim_with<F>(&self, a: &OperationLocator, b: &OperationLocator, exchange: F) -> ExchangeResult
    where
        F: FnOnce() -> ExchangeResult,
    {
        match self.claimed.entry(PairKey::new(a, b)) {
            Entry::Occupied(_) => ExchangeResult::AlreadyExchanged,
            Entry::Vacant(slot) => {
                let result = exchange();
                if result.is_success() {
                    let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
                    debug!("Claimed swizzle pair {} <-> {} (#{})", a, b, seq);
                    slot.insert(seq);
                }
                result
            }
        }
    }

    /// Run `exchange` only if the pair is claimed; release it if the exchange succeeds
    pub fn release_with<F>(&self, a: &OperationLocator, b: &OperationLocator, exchange: F) -> ExchangeResult
    where
        F: FnOnce() -> ExchangeResult,
    {
        match self.claimed.entry(PairKey::new(a, b)) {
            Entry::Vacant(_) => ExchangeResult::NotExchanged,
            Entry::Occupied(slot) => {
                let result = exchange();
                if result.is_success() {
                    debug!("Released swizzle pair {} <-> {}", a, b);
                    slot.remove();
                }
                result
            }
        }
    }

    pub fn is_claimed(&self, a: &OperationLocator, b: &OperationLocator) -> bool {
        self.claimed.contains_key(&PairKey::new(a, b))
    }

    /// Number of pairs currently claimed
    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

impl Default for SwizzleGuard {
    fn default() -> Self {
        Self::new()
    }
}
