//! Audit/notification bridge.
//!
//! Turns an [`ExecutionResult`] into audit records and an actor-facing
//! summary. Audit failures never undo moves; they surface as warnings.

use std::sync::Arc;

use tracing::{debug, warn};

use autoorganize_audit::{AuditAck, AuditError, AuditKey, AuditOutcome, AuditRecord, AuditSink};
use autoorganize_core::ActorId;

use crate::executor::{ExecutionCounts, ExecutionResult, OperationStatus};
use crate::messages::{self, Messages};

/// One record that could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditWarning {
    pub key: AuditKey,
    pub error: AuditError,
}

impl core::fmt::Display for AuditWarning {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "audit record {} not delivered: {}", self.key, self.error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeReport {
    pub summary: String,
    pub counts: ExecutionCounts,
    pub recorded: usize,
    pub duplicates: usize,
    pub warnings: Vec<AuditWarning>,
}

pub struct AuditBridge {
    sink: Option<Arc<dyn AuditSink>>,
    messages: Messages,
}

impl core::fmt::Debug for AuditBridge {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuditBridge")
            .field("audit", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

impl AuditBridge {
    pub fn new(sink: Arc<dyn AuditSink>, messages: Messages) -> Self {
        Self {
            sink: Some(sink),
            messages,
        }
    }

    /// Bridge that only renders summaries.
    pub fn without_audit(messages: Messages) -> Self {
        Self {
            sink: None,
            messages,
        }
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    /// Forward every applied or rejected operation to the audit sink and
    /// summarize.
    ///
    /// All records of one execution go out as a single batch and each is
    /// delivered once; a failed record becomes a warning and is not retried
    /// here. Records are keyed by execution id and operation sequence, so
    /// calling this twice for the same result writes nothing new.
    pub fn record(&self, result: &ExecutionResult, actor: ActorId) -> BridgeReport {
        let mut recorded = 0;
        let mut duplicates = 0;
        let mut warnings = Vec::new();

        if let Some(sink) = &self.sink {
            let records = audit_records(result, actor);
            let acks = sink.append_batch(&records);

            for (record, ack) in records.iter().zip(acks) {
                match ack {
                    Ok(AuditAck::Recorded) => recorded += 1,
                    Ok(AuditAck::Duplicate) => duplicates += 1,
                    Err(error) => {
                        warn!(key = %record.key(), error = %error, "audit delivery failed; move kept");
                        warnings.push(AuditWarning {
                            key: record.key(),
                            error,
                        });
                    }
                }
            }
        }

        let counts = result.counts();
        let mut summary = self.summarize(result);
        if !warnings.is_empty() {
            summary.push(' ');
            summary.push_str(&messages::render(
                &self.messages.audit_warning,
                &[("count", warnings.len().to_string())],
            ));
        }

        debug!(
            execution_id = %result.execution_id,
            recorded,
            duplicates,
            warnings = warnings.len(),
            "execution audited"
        );

        BridgeReport {
            summary,
            counts,
            recorded,
            duplicates,
            warnings,
        }
    }

    /// Actor-facing text for one execution.
    pub fn summarize(&self, result: &ExecutionResult) -> String {
        let counts = result.counts();
        if result.outcomes.is_empty() && result.unresolved.is_empty() {
            return messages::render(
                &self.messages.nothing_to_organize,
                &[("source", result.source.to_string())],
            );
        }
        messages::render(
            &self.messages.summary,
            &[
                ("source", result.source.to_string()),
                ("applied", counts.applied.to_string()),
                ("items", counts.items_moved.to_string()),
                ("rejected", counts.rejected.to_string()),
                ("unresolved", counts.unresolved.to_string()),
            ],
        )
    }
}

/// One record per executed operation. Abandoned operations never ran and are
/// not recorded.
fn audit_records(result: &ExecutionResult, actor: ActorId) -> Vec<AuditRecord> {
    result
        .outcomes
        .iter()
        .filter_map(|outcome| {
            let audited = match outcome.status {
                OperationStatus::Applied => AuditOutcome::Applied,
                OperationStatus::Rejected(_) => AuditOutcome::Rejected,
                OperationStatus::Abandoned(_) => return None,
            };
            let op = &outcome.operation;
            Some(AuditRecord::new(
                AuditKey {
                    execution: result.execution_id,
                    sequence: op.sequence,
                },
                actor,
                outcome.at,
                op.source.clone(),
                op.destination.clone(),
                op.item.clone(),
                op.quantity,
                audited,
            ))
        })
        .collect()
}
