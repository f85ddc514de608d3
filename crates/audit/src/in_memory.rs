//! In-memory audit log for tests/dev.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::{AuditAck, AuditError, AuditKey, AuditRecord, AuditSink};

#[derive(Debug, Default)]
struct LogState {
    records: Vec<AuditRecord>,
    keys: HashSet<AuditKey>,
}

/// Append-only log deduplicating on [`AuditKey`].
///
/// - No IO
/// - Duplicate appends acknowledge without writing
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    state: Mutex<LogState>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records in append order.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.state
            .lock()
            .map(|s| s.records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for InMemoryAuditLog {
    fn append(&self, record: &AuditRecord) -> Result<AuditAck, AuditError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| AuditError::Unavailable("audit log lock poisoned".to_string()))?;

        if !state.keys.insert(record.key()) {
            return Ok(AuditAck::Duplicate);
        }
        state.records.push(record.clone());
        Ok(AuditAck::Recorded)
    }
}
