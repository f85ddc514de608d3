//! Organization engine: plan, execute and audit item moves between
//! registered containers.
//!
//! ```text
//! trigger (interact / command)
//!   ↓
//! Registry resolves source + ownership
//!   ↓
//! Classifier tags each stack → Planner builds an ordered MovePlan
//!   ↓
//! Executor applies moves one by one (partial success)
//!   ↓
//! Bridge sends one batch of audit records per execution and renders a summary
//! ```
//!
//! All of this runs under one lock per [`Organizer`], so executions from
//! different triggers never interleave.

pub mod bridge;
pub mod config;
pub mod distance;
pub mod executor;
pub mod host;
pub mod messages;
pub mod organizer;
pub mod plan;
pub mod planner;

pub use bridge::{AuditBridge, AuditWarning, BridgeReport};
pub use config::{ConfigError, OrganizeConfig};
pub use distance::{BlockDistance, DistanceMetric, Ranking, RegistrationProximity};
pub use executor::{
    ExecutionCounts, ExecutionResult, Executor, OperationOutcome, OperationStatus, RejectReason,
};
pub use host::{AlwaysPresent, HostWorld};
pub use messages::Messages;
pub use organizer::{Organizer, TriggerResponse};
pub use plan::{MoveOperation, MovePlan, UnresolvedItem, UnresolvedReason};
pub use planner::{Planner, PlannerOptions};
