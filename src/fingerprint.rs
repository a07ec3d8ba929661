//! Fingerprinting and per-client history
//!
//! A fingerprint is a SHA-256 digest of the request's non-volatile identity
//! fields. It has no semantics beyond identity and is never reversed. The
//! [`HistoryStore`] keeps a bounded sliding window of [`HistoryEntry`]
//! records per fingerprint, trimmed on every append.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, VecDeque};

use crate::request::{HistoryEntry, Request};

/// Maximum entries retained per fingerprint.
pub const MAX_HISTORY: usize = 200;

/// Maximum age of a history entry, in seconds.
pub const RETENTION_WINDOW: f64 = 3600.0;

/// Shard count for the history and address maps. Power of two.
const SHARDS: usize = 16;

/// Distinct user agents remembered per source address.
const ADDRESS_UA_LIMIT: usize = 32;

/// Stable identity for one client: SHA-256 of address, user agent, and
/// session id after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, full digest.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for byte in self.0 {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }

    fn shard(&self) -> usize {
        self.0[0] as usize % SHARDS
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short form for logs; full digest via to_hex()
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Derive the fingerprint for a request. Stateless and deterministic.
///
/// Volatile fields (headers other than user-agent, body, timestamp) are
/// excluded so the same client is stably identified across requests.
pub fn fingerprint(req: &Request) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(req.source_address.trim().to_ascii_lowercase().as_bytes());
    hasher.update([0u8]);
    hasher.update(req.user_agent.trim().to_ascii_lowercase().as_bytes());
    hasher.update([0u8]);
    hasher.update(req.session_id.as_bytes());
    Fingerprint(hasher.finalize().into())
}

#[derive(Default)]
struct HistoryShard {
    windows: FxHashMap<Fingerprint, VecDeque<HistoryEntry>>,
}

#[derive(Default)]
struct AddressShard {
    /// source address -> (distinct UA hashes, newest timestamp)
    agents: FxHashMap<String, (BTreeSet<u64>, f64)>,
}

/// Sharded, bounded per-fingerprint history.
///
/// One writer per fingerprint at a time (the shard mutex); readers take a
/// consistent snapshot under the same mutex and release it before returning.
/// Snapshots are the only thing detectors ever see.
pub struct HistoryStore {
    shards: Vec<Mutex<HistoryShard>>,
    addresses: Vec<Mutex<AddressShard>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARDS).map(|_| Mutex::new(HistoryShard::default())).collect(),
            addresses: (0..SHARDS)
                .map(|_| Mutex::new(AddressShard::default()))
                .collect(),
        }
    }

    /// Append an entry, trimming the window by count and age first.
    /// Constant-time amortized.
    pub fn append(&self, fp: Fingerprint, entry: HistoryEntry) {
        let mut shard = self.shards[fp.shard()].lock();
        let window = shard.windows.entry(fp).or_default();

        let now = entry.timestamp;
        while let Some(front) = window.front() {
            if now - front.timestamp > RETENTION_WINDOW {
                window.pop_front();
            } else {
                break;
            }
        }
        window.push_back(entry);
        while window.len() > MAX_HISTORY {
            window.pop_front();
        }
    }

    /// Copy the current window for a fingerprint, oldest first.
    ///
    /// Entries older than the retention window relative to `now` are evicted
    /// before the copy is taken; an emptied window is garbage-collected.
    pub fn snapshot(&self, fp: Fingerprint, now: f64) -> Vec<HistoryEntry> {
        let mut shard = self.shards[fp.shard()].lock();
        let Some(window) = shard.windows.get_mut(&fp) else {
            return Vec::new();
        };
        while let Some(front) = window.front() {
            if now - front.timestamp > RETENTION_WINDOW {
                window.pop_front();
            } else {
                break;
            }
        }
        if window.is_empty() {
            shard.windows.remove(&fp);
            return Vec::new();
        }
        window.iter().cloned().collect()
    }

    /// Record a (address, user agent) observation and return how many
    /// distinct agents this address has used recently. Feeds the
    /// fingerprint-rotation detector.
    pub fn observe_agent(&self, address: &str, user_agent: &str, now: f64) -> usize {
        let shard_idx = address_shard(address);
        let mut shard = self.addresses[shard_idx].lock();
        let slot = shard
            .agents
            .entry(address.trim().to_ascii_lowercase())
            .or_insert_with(|| (BTreeSet::new(), now));
        if slot.0.len() < ADDRESS_UA_LIMIT {
            slot.0.insert(ua_hash(user_agent));
        }
        slot.1 = now;
        slot.0.len()
    }

    /// Drop address sketches idle past the retention window.
    pub fn sweep_addresses(&self, now: f64) {
        for shard in &self.addresses {
            shard
                .lock()
                .agents
                .retain(|_, (_, last)| now - *last <= RETENTION_WINDOW);
        }
    }

    /// Number of tracked fingerprints, across shards.
    pub fn tracked_fingerprints(&self) -> usize {
        self.shards.iter().map(|s| s.lock().windows.len()).sum()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn ua_hash(user_agent: &str) -> u64 {
    use std::hash::Hasher;
    let mut hasher = rustc_hash::FxHasher::default();
    hasher.write(user_agent.trim().to_ascii_lowercase().as_bytes());
    hasher.finish()
}

fn address_shard(address: &str) -> usize {
    use std::hash::Hasher;
    let mut hasher = rustc_hash::FxHasher::default();
    hasher.write(address.as_bytes());
    hasher.finish() as usize % SHARDS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_at(ts: f64, endpoint: &str) -> Request {
        Request::builder(endpoint)
            .timestamp(ts)
            .source_address("198.51.100.7")
            .user_agent("TestClient/1.0")
            .build()
    }

    fn entry_at(ts: f64, endpoint: &str) -> HistoryEntry {
        HistoryEntry::from_request(&request_at(ts, endpoint))
    }

    #[test]
    fn fingerprint_normalizes_identity_fields() {
        let a = fingerprint(&request_at(1.0, "/a"));
        let b = fingerprint(
            &Request::builder("/other")
                .timestamp(99.0)
                .source_address("198.51.100.7 ")
                .user_agent("testclient/1.0")
                .body("different body")
                .build(),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_differs_on_session() {
        let a = fingerprint(&request_at(1.0, "/a"));
        let b = fingerprint(
            &Request::builder("/a")
                .source_address("198.51.100.7")
                .user_agent("TestClient/1.0")
                .session_id("sess-1")
                .build(),
        );
        assert_ne!(a, b);
    }

    #[test]
    fn history_bounded_by_count() {
        let store = HistoryStore::new();
        let fp = fingerprint(&request_at(0.0, "/a"));
        for i in 0..(MAX_HISTORY + 50) {
            store.append(fp, entry_at(i as f64, "/a"));
        }
        let snap = store.snapshot(fp, (MAX_HISTORY + 50) as f64);
        assert_eq!(snap.len(), MAX_HISTORY);
    }

    #[test]
    fn history_bounded_by_retention() {
        let store = HistoryStore::new();
        let fp = fingerprint(&request_at(0.0, "/a"));
        store.append(fp, entry_at(0.0, "/a"));
        store.append(fp, entry_at(10.0, "/a"));
        store.append(fp, entry_at(RETENTION_WINDOW + 100.0, "/a"));

        let snap = store.snapshot(fp, RETENTION_WINDOW + 100.0);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].timestamp, RETENTION_WINDOW + 100.0);
    }

    #[test]
    fn empty_window_is_collected() {
        let store = HistoryStore::new();
        let fp = fingerprint(&request_at(0.0, "/a"));
        store.append(fp, entry_at(0.0, "/a"));
        assert_eq!(store.tracked_fingerprints(), 1);

        let snap = store.snapshot(fp, RETENTION_WINDOW * 3.0);
        assert!(snap.is_empty());
        assert_eq!(store.tracked_fingerprints(), 0);
    }

    #[test]
    fn snapshot_preserves_insertion_order() {
        let store = HistoryStore::new();
        let fp = fingerprint(&request_at(0.0, "/a"));
        for i in 0..10 {
            store.append(fp, entry_at(i as f64, "/a"));
        }
        let snap = store.snapshot(fp, 10.0);
        let stamps: Vec<f64> = snap.iter().map(|e| e.timestamp).collect();
        let mut sorted = stamps.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(stamps, sorted);
    }

    #[test]
    fn address_agent_counting() {
        let store = HistoryStore::new();
        assert_eq!(store.observe_agent("203.0.113.4", "ua-one", 1.0), 1);
        assert_eq!(store.observe_agent("203.0.113.4", "ua-two", 2.0), 2);
        // Same agent, case-folded: no growth
        assert_eq!(store.observe_agent("203.0.113.4", "UA-TWO", 3.0), 2);
        // Different address is independent
        assert_eq!(store.observe_agent("203.0.113.5", "ua-one", 4.0), 1);
    }
}
