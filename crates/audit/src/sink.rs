use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::AuditRecord;

/// Acknowledgement from an audit sink.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAck {
    /// First time this key was seen.
    Recorded,
    /// Key already present; nothing was written.
    Duplicate,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    #[error("audit backend unavailable: {0}")]
    Unavailable(String),

    #[error("audit backend rejected record: {0}")]
    Rejected(String),

    #[error("audit delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("audit worker disconnected")]
    Disconnected,
}

/// Change-log capability consumed from the host's audit system.
///
/// Implementations must be idempotent per [`AuditKey`](crate::AuditKey): a
/// record reported as failed may still have landed, and the host may replay
/// it.
pub trait AuditSink: Send + Sync {
    fn append(&self, record: &AuditRecord) -> Result<AuditAck, AuditError>;

    /// Deliver every record of one execution. Returns one result per record,
    /// in order.
    fn append_batch(&self, records: &[AuditRecord]) -> Vec<Result<AuditAck, AuditError>> {
        records.iter().map(|record| self.append(record)).collect()
    }
}

impl<S: AuditSink + ?Sized> AuditSink for std::sync::Arc<S> {
    fn append(&self, record: &AuditRecord) -> Result<AuditAck, AuditError> {
        (**self).append(record)
    }

    fn append_batch(&self, records: &[AuditRecord]) -> Vec<Result<AuditAck, AuditError>> {
        (**self).append_batch(records)
    }
}
