use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use autoorganize_core::{ActorId, ExecutionId, LocationKey};
use autoorganize_inventory::ItemType;

/// Identity of one logical move: the execution plus the operation's position
/// in its plan.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AuditKey {
    pub execution: ExecutionId,
    pub sequence: u32,
}

impl core::fmt::Display for AuditKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}#{}", self.execution, self.sequence)
    }
}

/// Transfers are all-or-nothing, so an operation either moved its full
/// quantity or nothing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Applied,
    /// Refused at execution time; no items changed hands.
    Rejected,
}

/// Immutable log entry of one item transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    key: AuditKey,
    actor: ActorId,
    timestamp: DateTime<Utc>,
    source: LocationKey,
    destination: LocationKey,
    item: ItemType,
    quantity: u32,
    outcome: AuditOutcome,
}

impl AuditRecord {
    pub fn new(
        key: AuditKey,
        actor: ActorId,
        timestamp: DateTime<Utc>,
        source: LocationKey,
        destination: LocationKey,
        item: ItemType,
        quantity: u32,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            key,
            actor,
            timestamp,
            source,
            destination,
            item,
            quantity,
            outcome,
        }
    }

    pub fn key(&self) -> AuditKey {
        self.key
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn source(&self) -> &LocationKey {
        &self.source
    }

    pub fn destination(&self) -> &LocationKey {
        &self.destination
    }

    pub fn item(&self) -> &ItemType {
        &self.item
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn outcome(&self) -> AuditOutcome {
        self.outcome
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
