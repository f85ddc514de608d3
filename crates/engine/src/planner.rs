//! Organization planner.
//!
//! Computes the ordered list of moves that empties a source container into
//! category destinations. Planning never mutates the registry: destination
//! capacity is tracked on private copies of the containers it touches.
//!
//! The resulting plan is sequentially consistent. Each operation only moves
//! items the source still holds after the operations before it, and fits in
//! its destination after the operations before it.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use autoorganize_core::{ActorId, LocationKey, OrganizeError, OrganizeResult};
use autoorganize_inventory::{Category, Container, ContainerRegistry, ItemStack, ItemType};
use autoorganize_rules::RuleTable;

use crate::distance::{DistanceMetric, Ranking};
use crate::plan::{MoveOperation, MovePlan, UnresolvedItem, UnresolvedReason};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerOptions {
    pub staging_category: Option<Category>,
    pub search_radius: Option<u32>,
    pub ranking: Ranking,
    /// Destinations already holding the item type rank ahead of the rest;
    /// the metric orders within each group.
    pub content_affinity: bool,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            staging_category: Some(Category::new("staging")),
            search_radius: None,
            ranking: Ranking::Registration,
            content_affinity: true,
        }
    }
}

pub struct Planner {
    options: PlannerOptions,
    metric: Box<dyn DistanceMetric>,
}

impl core::fmt::Debug for Planner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Planner")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new(PlannerOptions::default())
    }
}

impl Planner {
    pub fn new(options: PlannerOptions) -> Self {
        let metric = options.ranking.metric();
        Self { options, metric }
    }

    /// Replace the ranking with a custom comparator.
    pub fn with_metric(mut self, metric: Box<dyn DistanceMetric>) -> Self {
        self.metric = metric;
        self
    }

    pub fn options(&self) -> &PlannerOptions {
        &self.options
    }

    /// A container is staging when it declares no category or declares the
    /// configured staging label.
    pub fn is_staging(&self, container: &Container) -> bool {
        match container.category() {
            None => true,
            Some(category) => self.options.staging_category.as_ref() == Some(category),
        }
    }

    /// Plan the relocation of `source`'s contents on behalf of `actor`.
    ///
    /// Fails only when the source is unknown or the actor cannot open it.
    pub fn plan(
        &self,
        registry: &ContainerRegistry,
        rules: &RuleTable,
        rules_generation: u64,
        actor: ActorId,
        source: &LocationKey,
    ) -> OrganizeResult<MovePlan> {
        self.plan_within(
            registry,
            rules,
            rules_generation,
            actor,
            source,
            self.options.search_radius,
        )
    }

    /// [`plan`](Planner::plan) with an explicit search radius in place of the
    /// configured one. `None` searches every registered container.
    pub fn plan_within(
        &self,
        registry: &ContainerRegistry,
        rules: &RuleTable,
        rules_generation: u64,
        actor: ActorId,
        source: &LocationKey,
        search_radius: Option<u32>,
    ) -> OrganizeResult<MovePlan> {
        let source = registry.lookup(source)?;
        if !registry.can_access(actor, source) {
            return Err(OrganizeError::access_denied(actor, source.location()));
        }

        let staging = self.is_staging(source);
        let limits = registry.limits();
        let mut plan = MovePlan::empty(actor, source.location().clone(), rules_generation);
        let mut simulated: BTreeMap<LocationKey, Container> = BTreeMap::new();
        let mut access: BTreeMap<LocationKey, bool> = BTreeMap::new();

        for stack in source.contents() {
            let category = rules.classify(stack);
            if category.is_uncategorized() {
                continue;
            }
            if !staging && source.category() == Some(&category) {
                continue;
            }

            let mut candidates: Vec<&Container> = registry
                .containers_for_category(&category)
                .filter(|c| c.location() != source.location())
                .collect();
            let had_any = !candidates.is_empty();

            if let Some(radius) = search_radius {
                candidates.retain(|c| {
                    source
                        .location()
                        .block_distance(c.location())
                        .is_some_and(|d| d <= radius)
                });
            }
            let in_range = !candidates.is_empty();

            candidates.retain(|c| {
                *access
                    .entry(c.location().clone())
                    .or_insert_with(|| registry.can_access(actor, c))
            });
            let accessible = !candidates.is_empty();

            candidates.sort_by(|a, b| {
                let affinity = if self.options.content_affinity {
                    let holds_item = |c: &Container| {
                        let current = simulated.get(c.location()).unwrap_or(c);
                        holds(current, &stack.item)
                    };
                    holds_item(*b).cmp(&holds_item(*a))
                } else {
                    Ordering::Equal
                };
                affinity.then_with(|| self.metric.compare(source, a, b))
            });

            let mut remaining = stack.quantity;
            for destination in candidates {
                let target = simulated
                    .entry(destination.location().clone())
                    .or_insert_with(|| destination.clone());

                let room = target.room_for(&stack.item, limits);
                let quantity = u64::from(remaining).min(room) as u32;
                if quantity == 0 {
                    continue;
                }
                if target.put(stack, quantity, limits).is_err() {
                    continue;
                }

                push_coalesced(&mut plan, destination.location(), stack, quantity, &category);
                remaining -= quantity;
                if remaining == 0 {
                    break;
                }
            }

            if remaining > 0 {
                let reason = if !had_any {
                    UnresolvedReason::NoDestination
                } else if !in_range {
                    UnresolvedReason::OutOfRange
                } else if !accessible {
                    UnresolvedReason::AccessDenied
                } else {
                    UnresolvedReason::InsufficientCapacity
                };
                plan.unresolved.push(UnresolvedItem {
                    item: stack.item.clone(),
                    tag: stack.tag.clone(),
                    quantity: remaining,
                    category,
                    reason,
                });
            }
        }

        debug!(
            source = %plan.source,
            %actor,
            operations = plan.operations.len(),
            unresolved = plan.unresolved.len(),
            "plan computed"
        );
        Ok(plan)
    }
}

fn holds(container: &Container, item: &ItemType) -> bool {
    container.contents().iter().any(|s| &s.item == item)
}

/// Fold `quantity` into an earlier operation with the same destination and
/// item kind, or append a new one when there is none or the sum would not
/// fit in a `u32`.
fn push_coalesced(
    plan: &mut MovePlan,
    destination: &LocationKey,
    stack: &ItemStack,
    quantity: u32,
    category: &Category,
) {
    if let Some(op) = plan
        .operations
        .iter_mut()
        .find(|op| op.same_kind(destination, stack) && op.quantity.checked_add(quantity).is_some())
    {
        op.quantity += quantity;
        return;
    }

    let sequence = plan.operations.len() as u32;
    plan.operations.push(MoveOperation {
        sequence,
        source: plan.source.clone(),
        destination: destination.clone(),
        item: stack.item.clone(),
        tag: stack.tag.clone(),
        quantity,
        category: category.clone(),
    });
}
