//! Engine error model.

use thiserror::Error;

use crate::{ActorId, LocationKey};

/// Result type used across the engine.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Engine-level error.
///
/// These are the failures that abort an operation *before* any contents are
/// mutated (registration, rule loading, planning). Per-move failures during
/// execution are reported as outcomes, not errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrganizeError {
    /// No container is registered at the location.
    #[error("no container registered at {0}")]
    NotFound(LocationKey),

    /// The location is already registered to another owner.
    #[error("container at {location} is already registered to {existing_owner:?}")]
    DuplicateRegistration {
        location: LocationKey,
        existing_owner: Option<ActorId>,
    },

    /// Two rules declare an identical predicate.
    #[error("rule {second} repeats the predicate of rule {first} ({predicate})")]
    RuleConflict {
        first: usize,
        second: usize,
        predicate: String,
    },

    /// The actor may not open the container.
    #[error("{actor} cannot access container at {location}")]
    AccessDenied {
        actor: ActorId,
        location: LocationKey,
    },

    /// A value failed validation (e.g. zero capacity, oversized stack).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Engine state lock was poisoned by a panicking holder.
    #[error("engine state lock poisoned")]
    Poisoned,
}

impl OrganizeError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(location: &LocationKey) -> Self {
        Self::NotFound(location.clone())
    }

    pub fn access_denied(actor: ActorId, location: &LocationKey) -> Self {
        Self::AccessDenied {
            actor,
            location: location.clone(),
        }
    }

    /// Short machine-friendly label used in logs and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            OrganizeError::NotFound(_) => "not_found",
            OrganizeError::DuplicateRegistration { .. } => "duplicate_registration",
            OrganizeError::RuleConflict { .. } => "rule_conflict",
            OrganizeError::AccessDenied { .. } => "access_denied",
            OrganizeError::Validation(_) => "validation",
            OrganizeError::Poisoned => "poisoned",
        }
    }
}
