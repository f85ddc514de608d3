//! Trigger entry points.
//!
//! `Organizer` owns the registry and classifier behind one mutex. A trigger
//! holds the lock for plan, execute and audit, so two executions never
//! interleave.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, warn};

use autoorganize_audit::AuditSink;
use autoorganize_core::{ActorId, LocationKey, OrganizeError, OrganizeResult};
use autoorganize_inventory::ContainerRegistry;
use autoorganize_protection::{ProtectionCapability, Unprotected};
use autoorganize_rules::{Classifier, RuleSet};

use crate::bridge::{AuditBridge, AuditWarning};
use crate::config::OrganizeConfig;
use crate::executor::{ExecutionCounts, ExecutionResult, Executor};
use crate::host::{AlwaysPresent, HostWorld};
use crate::messages;
use crate::plan::MovePlan;
use crate::planner::Planner;

/// What a trigger hands back to the host: text for the actor plus the
/// machine-readable results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerResponse {
    pub summary: String,
    pub results: Vec<ExecutionResult>,
    pub counts: ExecutionCounts,
    pub warnings: Vec<AuditWarning>,
    /// Set when the trigger failed before moving anything.
    pub error: Option<OrganizeError>,
}

impl TriggerResponse {
    fn failed(summary: String, error: OrganizeError) -> Self {
        Self {
            summary,
            results: Vec::new(),
            counts: ExecutionCounts::default(),
            warnings: Vec::new(),
            error: Some(error),
        }
    }

    fn empty(summary: String) -> Self {
        Self {
            summary,
            results: Vec::new(),
            counts: ExecutionCounts::default(),
            warnings: Vec::new(),
            error: None,
        }
    }
}

#[derive(Debug)]
struct EngineState {
    registry: ContainerRegistry,
    classifier: Classifier,
}

pub struct Organizer {
    state: Mutex<EngineState>,
    planner: Planner,
    bridge: AuditBridge,
    world: Arc<dyn HostWorld>,
}

impl core::fmt::Debug for Organizer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Organizer")
            .field("planner", &self.planner)
            .field("bridge", &self.bridge)
            .finish_non_exhaustive()
    }
}

impl Organizer {
    pub fn new(
        registry: ContainerRegistry,
        classifier: Classifier,
        planner: Planner,
        bridge: AuditBridge,
    ) -> Self {
        Self {
            state: Mutex::new(EngineState {
                registry,
                classifier,
            }),
            planner,
            bridge,
            world: Arc::new(AlwaysPresent),
        }
    }

    /// Build an organizer from configuration.
    ///
    /// Integration toggles decide whether `protection` and `audit` are used
    /// at all.
    pub fn from_config(
        config: &OrganizeConfig,
        protection: Arc<dyn ProtectionCapability>,
        audit: Option<Arc<dyn AuditSink>>,
    ) -> OrganizeResult<Self> {
        let protection: Arc<dyn ProtectionCapability> = if config.integrations.protection.enabled {
            protection
        } else {
            Arc::new(Unprotected)
        };
        let registry = ContainerRegistry::new(protection, config.stack_limits.clone());
        let classifier = Classifier::from_rule_set(config.rules.clone())?;

        let bridge = match audit {
            Some(sink) if config.integrations.audit.enabled => AuditBridge::new(sink, config.messages.clone()),
            _ => AuditBridge::without_audit(config.messages.clone()),
        };

        info!(
            protection = config.integrations.protection.enabled,
            audit = config.integrations.audit.enabled,
            rules = config.rules.rules.len(),
            "organizer configured"
        );

        Ok(Self::new(
            registry,
            classifier,
            Planner::new(config.planner_options()),
            bridge,
        ))
    }

    pub fn with_world(mut self, world: Arc<dyn HostWorld>) -> Self {
        self.world = world;
        self
    }

    fn lock(&self) -> OrganizeResult<MutexGuard<'_, EngineState>> {
        self.state.lock().map_err(|_| OrganizeError::Poisoned)
    }

    /// Run `f` against the registry under the engine lock (registration,
    /// content sync from the host).
    pub fn with_registry<R>(&self, f: impl FnOnce(&mut ContainerRegistry) -> R) -> OrganizeResult<R> {
        let mut state = self.lock()?;
        Ok(f(&mut state.registry))
    }

    /// Swap the rule table. Plans already running keep their snapshot; on
    /// error the previous rules stay active.
    pub fn reload_rules(&self, set: RuleSet) -> OrganizeResult<u64> {
        self.lock()?.classifier.reload(set)
    }

    pub fn rules_generation(&self) -> OrganizeResult<u64> {
        Ok(self.lock()?.classifier.generation())
    }

    /// Compute a plan without executing it.
    pub fn plan(&self, actor: ActorId, source: &LocationKey) -> OrganizeResult<MovePlan> {
        let state = self.lock()?;
        let rules = state.classifier.snapshot();
        self.planner.plan(
            &state.registry,
            &rules,
            state.classifier.generation(),
            actor,
            source,
        )
    }

    /// Plan, execute and audit one container.
    pub fn organize(&self, actor: ActorId, source: &LocationKey) -> OrganizeResult<TriggerResponse> {
        let mut state = self.lock()?;
        self.organize_locked(&mut state, actor, source, self.configured_radius())
    }

    /// Actor opened or clicked a container.
    ///
    /// Containers the engine does not know about are ignored.
    pub fn on_container_interact(
        &self,
        actor: ActorId,
        location: &LocationKey,
    ) -> OrganizeResult<Option<TriggerResponse>> {
        self.on_container_interact_within(actor, location, self.configured_radius())
    }

    /// [`on_container_interact`](Organizer::on_container_interact) for a
    /// trigger that carries its own search radius. `None` searches every
    /// registered container.
    pub fn on_container_interact_within(
        &self,
        actor: ActorId,
        location: &LocationKey,
        search_radius: Option<u32>,
    ) -> OrganizeResult<Option<TriggerResponse>> {
        let mut state = self.lock()?;
        if !state.registry.contains(location) {
            return Ok(None);
        }
        self.organize_locked(&mut state, actor, location, search_radius)
            .map(Some)
    }

    /// Explicit organize command. Never fails: errors are rendered into the
    /// summary with zero counts.
    ///
    /// Without a location, every staging container the actor owns is
    /// organized in registration order.
    pub fn organize_command(&self, actor: ActorId, location: Option<&LocationKey>) -> TriggerResponse {
        self.organize_command_within(actor, location, self.configured_radius())
    }

    pub fn organize_command_within(
        &self,
        actor: ActorId,
        location: Option<&LocationKey>,
        search_radius: Option<u32>,
    ) -> TriggerResponse {
        let outcome = self.lock().and_then(|mut state| match location {
            Some(location) => self.organize_locked(&mut state, actor, location, search_radius),
            None => self.organize_owned(&mut state, actor, search_radius),
        });

        outcome.unwrap_or_else(|err| {
            warn!(%actor, error = %err, kind = err.kind(), "organize command failed");
            TriggerResponse::failed(
                messages::render(&self.bridge.messages().failed, &[("error", err.to_string())]),
                err,
            )
        })
    }

    fn configured_radius(&self) -> Option<u32> {
        self.planner.options().search_radius
    }

    fn organize_owned(
        &self,
        state: &mut EngineState,
        actor: ActorId,
        search_radius: Option<u32>,
    ) -> OrganizeResult<TriggerResponse> {
        let sources: Vec<LocationKey> = state
            .registry
            .iter()
            .filter(|c| c.owner() == Some(actor) && self.planner.is_staging(c))
            .map(|c| c.location().clone())
            .collect();

        if sources.is_empty() {
            return Ok(TriggerResponse::empty(
                self.bridge.messages().no_staging_containers.clone(),
            ));
        }

        let mut response = TriggerResponse::empty(String::new());
        let mut lines = Vec::with_capacity(sources.len());

        for source in &sources {
            match self.organize_locked(state, actor, source, search_radius) {
                Ok(single) => {
                    lines.push(single.summary);
                    response.counts.add(single.counts);
                    response.warnings.extend(single.warnings);
                    response.results.extend(single.results);
                }
                Err(err) => {
                    warn!(%actor, %source, error = %err, "skipping container");
                    lines.push(messages::render(
                        &self.bridge.messages().failed,
                        &[("error", err.to_string())],
                    ));
                }
            }
        }

        response.summary = lines.join("\n");
        Ok(response)
    }

    fn organize_locked(
        &self,
        state: &mut EngineState,
        actor: ActorId,
        source: &LocationKey,
        search_radius: Option<u32>,
    ) -> OrganizeResult<TriggerResponse> {
        let rules = state.classifier.snapshot();
        let plan = self.planner.plan_within(
            &state.registry,
            &rules,
            state.classifier.generation(),
            actor,
            source,
            search_radius,
        )?;
        let result = Executor::new(self.world.as_ref()).execute(&mut state.registry, &plan);
        let report = self.bridge.record(&result, actor);

        Ok(TriggerResponse {
            summary: report.summary,
            counts: report.counts,
            warnings: report.warnings,
            results: vec![result],
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoorganize_audit::InMemoryAuditLog;
    use autoorganize_inventory::{ItemStack, ItemType};
    use autoorganize_protection::{Lock, LockTable};
    use autoorganize_rules::{CategoryRule, Predicate};

    fn loc(x: i32) -> LocationKey {
        LocationKey::new("world", x, 64, 0)
    }

    fn config() -> OrganizeConfig {
        OrganizeConfig::default().with_rules(RuleSet {
            rules: vec![CategoryRule::new(Predicate::Item("cobblestone".into()), "stone")],
            ..RuleSet::default()
        })
    }

    fn organizer(audit: Arc<InMemoryAuditLog>) -> Organizer {
        let audit: Arc<dyn AuditSink> = audit;
        Organizer::from_config(&config(), Arc::new(LockTable::new()), Some(audit)).unwrap()
    }

    #[test]
    fn interact_with_unknown_container_is_ignored() {
        let organizer = organizer(Arc::new(InMemoryAuditLog::new()));
        assert_eq!(organizer.on_container_interact(ActorId::new(), &loc(9)).unwrap(), None);
    }

    #[test]
    fn interact_moves_and_audits() {
        let log = Arc::new(InMemoryAuditLog::new());
        let organizer = organizer(log.clone());
        let actor = ActorId::new();
        organizer
            .with_registry(|r| {
                r.register(loc(0), Some(actor), None, 27)?;
                r.register(loc(1), Some(actor), Some("stone".into()), 27)?;
                r.insert(&loc(0), ItemStack::new("cobblestone", 32))
            })
            .unwrap()
            .unwrap();

        let response = organizer.on_container_interact(actor, &loc(0)).unwrap().unwrap();

        assert_eq!(response.counts.applied, 1);
        assert_eq!(log.len(), 1);
        let moved = organizer
            .with_registry(|r| {
                r.lookup(&loc(1))
                    .map(|c| c.quantity_of(&ItemType::new("cobblestone"), None))
            })
            .unwrap()
            .unwrap();
        assert_eq!(moved, 32);
    }

    #[test]
    fn command_renders_errors_with_zero_counts() {
        let organizer = organizer(Arc::new(InMemoryAuditLog::new()));

        let response = organizer.organize_command(ActorId::new(), Some(&loc(5)));

        assert_eq!(response.counts, ExecutionCounts::default());
        assert_eq!(response.error, Some(OrganizeError::NotFound(loc(5))));
        assert!(response.summary.starts_with("Could not organize: no container registered at"));
    }

    #[test]
    fn command_without_location_sweeps_owned_staging_containers() {
        let organizer = organizer(Arc::new(InMemoryAuditLog::new()));
        let actor = ActorId::new();
        let other = ActorId::new();
        organizer
            .with_registry(|r| -> OrganizeResult<()> {
                r.register(loc(0), Some(actor), None, 27)?;
                r.register(loc(1), Some(other), None, 27)?;
                r.register(loc(2), Some(actor), Some("staging".into()), 27)?;
                r.register(loc(3), Some(actor), Some("stone".into()), 27)?;
                for x in 0..3 {
                    r.insert(&loc(x), ItemStack::new("cobblestone", 10))?;
                }
                Ok(())
            })
            .unwrap()
            .unwrap();

        let response = organizer.organize_command(actor, None);

        let sources: Vec<LocationKey> = response.results.iter().map(|r| r.source.clone()).collect();
        assert_eq!(sources, vec![loc(0), loc(2)]);
        assert_eq!(response.counts.items_moved, 20);
        assert_eq!(response.summary.lines().count(), 2);
    }

    #[test]
    fn command_without_staging_containers_says_so() {
        let organizer = organizer(Arc::new(InMemoryAuditLog::new()));
        let response = organizer.organize_command(ActorId::new(), None);
        assert_eq!(response.summary, "You have no staging containers to organize.");
        assert!(response.error.is_none());
    }

    #[test]
    fn disabled_protection_ignores_locks() {
        let locks = Arc::new(LockTable::new());
        locks.lock(loc(1), Lock::owned_by(ActorId::new()));
        let organizer =
            Organizer::from_config(&config().with_protection(false), locks, None).unwrap();
        let actor = ActorId::new();
        organizer
            .with_registry(|r| -> OrganizeResult<()> {
                r.register(loc(0), None, None, 27)?;
                r.register(loc(1), None, Some("stone".into()), 27)?;
                r.insert(&loc(0), ItemStack::new("cobblestone", 5))
            })
            .unwrap()
            .unwrap();

        let response = organizer.organize_command(actor, Some(&loc(0)));
        assert_eq!(response.counts.applied, 1);
    }

    #[test]
    fn trigger_radius_overrides_configured_radius() {
        let config = config().with_search_radius(4);
        let organizer = Organizer::from_config(&config, Arc::new(LockTable::new()), None).unwrap();
        let actor = ActorId::new();
        organizer
            .with_registry(|r| -> OrganizeResult<()> {
                r.register(loc(0), Some(actor), None, 27)?;
                r.register(loc(20), Some(actor), Some("stone".into()), 27)?;
                r.insert(&loc(0), ItemStack::new("cobblestone", 6))
            })
            .unwrap()
            .unwrap();

        let configured = organizer.on_container_interact(actor, &loc(0)).unwrap().unwrap();
        assert_eq!(configured.counts.applied, 0);
        assert_eq!(configured.counts.unresolved, 1);

        let wide = organizer.organize_command_within(actor, Some(&loc(0)), Some(32));
        assert_eq!(wide.counts.applied, 1);
        assert_eq!(wide.counts.items_moved, 6);
    }

    #[test]
    fn failed_reload_keeps_previous_rules() {
        let organizer = organizer(Arc::new(InMemoryAuditLog::new()));
        let duplicate = RuleSet {
            rules: vec![
                CategoryRule::new(Predicate::Item("dirt".into()), "a"),
                CategoryRule::new(Predicate::Item("dirt".into()), "b"),
            ],
            ..RuleSet::default()
        };

        assert!(matches!(
            organizer.reload_rules(duplicate),
            Err(OrganizeError::RuleConflict { first: 0, second: 1, .. })
        ));
        assert_eq!(organizer.rules_generation().unwrap(), 1);
    }
}
