//! Reputation tracking
//!
//! Per-fingerprint reputation in [-100, +100], starting at 0. Scores decay
//! linearly toward zero at one point per ten minutes of idleness; decay is
//! applied lazily from caller-supplied timestamps, so the table never reads
//! a clock. Under capacity pressure the least-recently-updated entry in the
//! affected shard is evicted.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::fingerprint::Fingerprint;

/// Maximum tracked reputations across the table.
pub const MAX_REPUTATIONS: usize = 100_000;

/// Reputation at or above which stage 1 may clear a request outright.
pub const SCORE_MAX: f64 = 100.0;
pub const SCORE_MIN: f64 = -100.0;

/// Decay rate: one point toward zero per this many idle seconds.
const DECAY_INTERVAL_SECS: f64 = 600.0;

const SHARDS: usize = 16;
const SHARD_CAPACITY: usize = MAX_REPUTATIONS / SHARDS;

#[derive(Debug, Clone, Copy)]
struct ReputationEntry {
    score: f64,
    last_update: f64,
}

impl ReputationEntry {
    /// Apply idle decay toward zero up to `now`.
    fn decayed(&self, now: f64) -> f64 {
        let idle = (now - self.last_update).max(0.0);
        let decay = idle / DECAY_INTERVAL_SECS;
        if self.score > 0.0 {
            (self.score - decay).max(0.0)
        } else {
            (self.score + decay).min(0.0)
        }
    }
}

#[derive(Default)]
struct ReputationShard {
    entries: FxHashMap<Fingerprint, ReputationEntry>,
}

impl ReputationShard {
    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by(|a, b| a.1.last_update.total_cmp(&b.1.last_update))
            .map(|(fp, _)| *fp);
        if let Some(fp) = oldest {
            self.entries.remove(&fp);
        }
    }
}

/// Sharded reputation table. Updates are read-modify-write under the shard
/// mutex.
pub struct ReputationTable {
    shards: Vec<Mutex<ReputationShard>>,
}

impl ReputationTable {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARDS)
                .map(|_| Mutex::new(ReputationShard::default()))
                .collect(),
        }
    }

    /// Current score for a fingerprint with decay applied. Unknown
    /// fingerprints are neutral (0).
    pub fn score(&self, fp: Fingerprint, now: f64) -> f64 {
        let shard = self.shards[shard_of(fp)].lock();
        shard.entries.get(&fp).map(|e| e.decayed(now)).unwrap_or(0.0)
    }

    /// Adjust a fingerprint's reputation by `delta`, clamped to
    /// [-100, +100]. Decay is settled before the adjustment lands.
    pub fn adjust(&self, fp: Fingerprint, delta: f64, now: f64) -> f64 {
        let mut shard = self.shards[shard_of(fp)].lock();
        if !shard.entries.contains_key(&fp) && shard.entries.len() >= SHARD_CAPACITY {
            shard.evict_oldest();
        }
        let entry = shard.entries.entry(fp).or_insert(ReputationEntry {
            score: 0.0,
            last_update: now,
        });
        let score = (entry.decayed(now) + delta).clamp(SCORE_MIN, SCORE_MAX);
        *entry = ReputationEntry {
            score,
            last_update: now,
        };
        score
    }

    /// Number of tracked fingerprints.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ReputationTable {
    fn default() -> Self {
        Self::new()
    }
}

fn shard_of(fp: Fingerprint) -> usize {
    fp.as_bytes()[1] as usize % SHARDS
}
