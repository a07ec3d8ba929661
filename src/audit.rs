//! Audit log
//!
//! Exactly one record per verdict, appended atomically with verdict
//! emission: the sequence counter lives under the same mutex as the sink
//! call, so an id is consumed only when its record landed. Appended ids
//! are strictly increasing (and gapless) per orchestrator instance.
//!
//! The sink is pluggable. The default is a bounded in-memory ring that a
//! collaborator drains; unbounded queues are forbidden.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::AuditAppendFailure;
use crate::scorer::{RiskLevel, VerdictAction};

/// One audit record, the shape delivered to the sink.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub audit_id: u64,
    pub timestamp: f64,
    /// Full fingerprint hex
    pub fingerprint: String,
    pub action: VerdictAction,
    pub level: RiskLevel,
    pub risk_score: f64,
    pub scenario_name: Option<String>,
    pub tracking_token: Option<String>,
}

/// Append-only destination for audit records. Required delivery semantics:
/// at-least-once, ordered by `audit_id`.
pub trait AuditSink: Send + Sync {
    fn append(&self, record: &AuditRecord) -> Result<(), AuditAppendFailure>;
}

/// Default capacity of the in-memory ring.
pub const DEFAULT_AUDIT_CAPACITY: usize = 65_536;

/// Bounded in-memory ring sink. Overflow evicts the oldest undrained
/// record; a slow drain loses the tail, never memory.
pub struct MemoryAuditSink {
    ring: Mutex<VecDeque<AuditRecord>>,
    capacity: usize,
}

impl MemoryAuditSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    /// Take everything currently buffered, oldest first.
    pub fn drain(&self) -> Vec<AuditRecord> {
        self.ring.lock().drain(..).collect()
    }

    /// Copy of the buffered records without draining.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.ring.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ring.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_CAPACITY)
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, record: &AuditRecord) -> Result<(), AuditAppendFailure> {
        let mut ring = self.ring.lock();
        if ring.len() >= self.capacity {
            ring.pop_front();
        }
        ring.push_back(record.clone());
        Ok(())
    }
}

/// Sequenced front of the audit sink.
pub struct AuditLog {
    sink: Arc<dyn AuditSink>,
    seq: Mutex<u64>,
}

impl AuditLog {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            seq: Mutex::new(0),
        }
    }

    /// Assign the next id and append. The id advances only on success, so
    /// a failed append burns nothing and the appended sequence stays
    /// gapless.
    pub fn append(&self, mut record: AuditRecord) -> Result<u64, AuditAppendFailure> {
        let mut seq = self.seq.lock();
        let id = *seq + 1;
        record.audit_id = id;
        self.sink.append(&record)?;
        *seq = id;
        Ok(id)
    }

    /// Highest id appended so far.
    pub fn last_id(&self) -> u64 {
        *self.seq.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ts: f64) -> AuditRecord {
        AuditRecord {
            audit_id: 0,
            timestamp: ts,
            fingerprint: "deadbeef".to_string(),
            action: VerdictAction::Allow,
            level: RiskLevel::Low,
            risk_score: 0.0,
            scenario_name: None,
            tracking_token: None,
        }
    }

    struct RefusingSink;

    impl AuditSink for RefusingSink {
        fn append(&self, _record: &AuditRecord) -> Result<(), AuditAppendFailure> {
            Err(AuditAppendFailure {
                reason: "sink closed".to_string(),
            })
        }
    }

    #[test]
    fn ids_are_sequential() {
        let sink = Arc::new(MemoryAuditSink::default());
        let log = AuditLog::new(sink.clone());
        for expected in 1..=5u64 {
            assert_eq!(log.append(record(expected as f64)).unwrap(), expected);
        }
        let ids: Vec<u64> = sink.records().iter().map(|r| r.audit_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn failed_append_burns_no_id() {
        let log = AuditLog::new(Arc::new(RefusingSink));
        assert!(log.append(record(1.0)).is_err());
        assert_eq!(log.last_id(), 0);
    }

    #[test]
    fn ring_is_bounded() {
        let sink = MemoryAuditSink::new(10);
        for i in 0..25 {
            sink.append(&record(i as f64)).unwrap();
        }
        assert_eq!(sink.len(), 10);
        // Oldest were evicted
        assert_eq!(sink.records()[0].timestamp, 15.0);
    }

    #[test]
    fn drain_empties_the_ring() {
        let sink = MemoryAuditSink::default();
        sink.append(&record(1.0)).unwrap();
        sink.append(&record(2.0)).unwrap();
        assert_eq!(sink.drain().len(), 2);
        assert!(sink.is_empty());
    }
}
