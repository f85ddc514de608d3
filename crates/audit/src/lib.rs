//! Audit trail for executed item transfers.
//!
//! ## Delivery
//!
//! Records are delivered **at-least-once**. Every record carries an
//! [`AuditKey`] that identifies the logical move, so a sink that sees the same
//! key twice must treat the second append as a no-op.

pub mod in_memory;
pub mod record;
pub mod sink;
pub mod threaded;

pub use in_memory::InMemoryAuditLog;
pub use record::{AuditKey, AuditOutcome, AuditRecord};
pub use sink::{AuditAck, AuditError, AuditSink};
pub use threaded::ThreadedAuditSink;
