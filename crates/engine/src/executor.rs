//! Move executor.
//!
//! Applies a [`MovePlan`] against live contents, one operation at a time.
//! Each operation is atomic (both containers change or neither does); the
//! plan as a whole is not, so partial success is the normal failure mode and
//! every operation ends up with an outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use autoorganize_core::{ActorId, ExecutionId, LocationKey};
use autoorganize_inventory::{ContainerRegistry, TransferError};

use crate::host::HostWorld;
use crate::plan::{MoveOperation, MovePlan, UnresolvedItem, UnresolvedReason};

/// Why one operation was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// Destination no longer has room (contents changed since planning).
    CapacityExceeded { room: u64, requested: u32 },
    /// Access to source or destination was revoked since planning.
    AccessDenied,
    /// Source holds less than planned (contents changed since planning).
    SourceShortfall { available: u64, requested: u32 },
    /// Destination was destroyed or unregistered.
    DestinationMissing,
    SameContainer,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::CapacityExceeded { .. } => "capacity exceeded",
            RejectReason::AccessDenied => "access denied",
            RejectReason::SourceShortfall { .. } => "source shortfall",
            RejectReason::DestinationMissing => "destination missing",
            RejectReason::SameContainer => "same container",
        }
    }
}

impl From<TransferError> for RejectReason {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::NotFound(_) => RejectReason::DestinationMissing,
            TransferError::SameContainer(_) => RejectReason::SameContainer,
            TransferError::SourceShortfall {
                available,
                requested,
            } => RejectReason::SourceShortfall {
                available,
                requested,
            },
            TransferError::CapacityExceeded { room, requested } => {
                RejectReason::CapacityExceeded { room, requested }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum OperationStatus {
    Applied,
    Rejected(RejectReason),
    /// Skipped because the execution was cancelled before reaching it.
    Abandoned(UnresolvedReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub operation: MoveOperation,
    pub status: OperationStatus,
    pub at: DateTime<Utc>,
}

impl OperationOutcome {
    pub fn is_applied(&self) -> bool {
        self.status == OperationStatus::Applied
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionCounts {
    pub applied: usize,
    pub rejected: usize,
    pub unresolved: usize,
    /// Total quantity moved by applied operations.
    pub items_moved: u64,
}

impl ExecutionCounts {
    pub fn add(&mut self, other: ExecutionCounts) {
        self.applied += other.applied;
        self.rejected += other.rejected;
        self.unresolved += other.unresolved;
        self.items_moved += other.items_moved;
    }
}

/// Everything that happened during one execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub execution_id: ExecutionId,
    pub actor: ActorId,
    pub source: LocationKey,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One entry per plan operation, in plan order.
    pub outcomes: Vec<OperationOutcome>,
    /// Unresolved plan items followed by abandoned operations.
    pub unresolved: Vec<UnresolvedItem>,
}

impl ExecutionResult {
    pub fn counts(&self) -> ExecutionCounts {
        let mut counts = ExecutionCounts {
            unresolved: self.unresolved.len(),
            ..ExecutionCounts::default()
        };
        for outcome in &self.outcomes {
            match outcome.status {
                OperationStatus::Applied => {
                    counts.applied += 1;
                    counts.items_moved += u64::from(outcome.operation.quantity);
                }
                OperationStatus::Rejected(_) => counts.rejected += 1,
                OperationStatus::Abandoned(_) => {}
            }
        }
        counts
    }

    pub fn applied(&self) -> impl Iterator<Item = &OperationOutcome> + '_ {
        self.outcomes.iter().filter(|o| o.is_applied())
    }

    pub fn was_cancelled(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| matches!(o.status, OperationStatus::Abandoned(_)))
    }
}

/// Applies plans through [`ContainerRegistry::transfer`].
pub struct Executor<'w> {
    world: &'w dyn HostWorld,
}

impl<'w> Executor<'w> {
    pub fn new(world: &'w dyn HostWorld) -> Self {
        Self { world }
    }

    /// Execute `plan` under a fresh execution id.
    pub fn execute(&self, registry: &mut ContainerRegistry, plan: &MovePlan) -> ExecutionResult {
        self.execute_as(ExecutionId::new(), registry, plan)
    }

    /// Execute `plan` under a caller-chosen execution id.
    ///
    /// Re-running a plan that already ran finds the source short and rejects
    /// the operations instead of moving items twice.
    pub fn execute_as(
        &self,
        execution_id: ExecutionId,
        registry: &mut ContainerRegistry,
        plan: &MovePlan,
    ) -> ExecutionResult {
        let started_at = Utc::now();
        let actor = plan.actor;
        let mut outcomes = Vec::with_capacity(plan.operations.len());
        let mut unresolved = plan.unresolved.clone();
        let mut cancelled: Option<UnresolvedReason> = None;

        for op in &plan.operations {
            if cancelled.is_none() {
                cancelled = self.cancellation(registry, plan);
                if let Some(reason) = cancelled {
                    warn!(
                        %execution_id,
                        source = %plan.source,
                        reason = reason.as_str(),
                        remaining = plan.operations.len() - outcomes.len(),
                        "execution cancelled"
                    );
                }
            }

            let status = match cancelled {
                Some(reason) => {
                    unresolved.push(UnresolvedItem {
                        item: op.item.clone(),
                        tag: op.tag.clone(),
                        quantity: op.quantity,
                        category: op.category.clone(),
                        reason,
                    });
                    OperationStatus::Abandoned(reason)
                }
                None => self.apply(registry, plan, op),
            };

            match &status {
                OperationStatus::Applied => debug!(
                    %execution_id,
                    sequence = op.sequence,
                    destination = %op.destination,
                    item = %op.item,
                    quantity = op.quantity,
                    "move applied"
                ),
                OperationStatus::Rejected(reason) => warn!(
                    %execution_id,
                    sequence = op.sequence,
                    destination = %op.destination,
                    item = %op.item,
                    reason = reason.as_str(),
                    "move rejected"
                ),
                OperationStatus::Abandoned(_) => {}
            }

            outcomes.push(OperationOutcome {
                operation: op.clone(),
                status,
                at: Utc::now(),
            });
        }

        let result = ExecutionResult {
            execution_id,
            actor,
            source: plan.source.clone(),
            started_at,
            finished_at: Utc::now(),
            outcomes,
            unresolved,
        };

        let counts = result.counts();
        info!(
            %execution_id,
            %actor,
            source = %result.source,
            applied = counts.applied,
            rejected = counts.rejected,
            unresolved = counts.unresolved,
            "execution finished"
        );
        result
    }

    fn cancellation(&self, registry: &ContainerRegistry, plan: &MovePlan) -> Option<UnresolvedReason> {
        if !self.world.actor_online(plan.actor) {
            return Some(UnresolvedReason::ActorOffline);
        }
        if !self.world.container_present(&plan.source) || !registry.contains(&plan.source) {
            return Some(UnresolvedReason::SourceRemoved);
        }
        None
    }

    fn apply(
        &self,
        registry: &mut ContainerRegistry,
        plan: &MovePlan,
        op: &MoveOperation,
    ) -> OperationStatus {
        if !self.world.container_present(&op.destination) {
            return OperationStatus::Rejected(RejectReason::DestinationMissing);
        }
        if !registry.can_access_at(plan.actor, &op.source)
            || !registry.can_access_at(plan.actor, &op.destination)
        {
            return OperationStatus::Rejected(RejectReason::AccessDenied);
        }

        match registry.transfer(&op.source, &op.destination, &op.stack(), op.quantity) {
            Ok(()) => OperationStatus::Applied,
            Err(err) => OperationStatus::Rejected(err.into()),
        }
    }
}
