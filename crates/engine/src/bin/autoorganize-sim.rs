//! Run one organize command against a world described in JSON.
//!
//! ```text
//! autoorganize-sim <scenario.json> [config.json]
//! ```
//!
//! The scenario lists containers (with contents), locks, the acting player
//! and an optional command location. The command's summary goes to stdout,
//! followed by the execution results as JSON.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, bail};
use serde::Deserialize;

use autoorganize_audit::{AuditSink, InMemoryAuditLog, ThreadedAuditSink};
use autoorganize_core::{ActorId, LocationKey};
use autoorganize_engine::{HostWorld, OrganizeConfig, Organizer};
use autoorganize_inventory::{Category, ItemStack};
use autoorganize_protection::{Lock, LockTable};

#[derive(Debug, Deserialize)]
struct Scenario {
    actor: ActorId,
    #[serde(default)]
    location: Option<String>,
    /// Radius for this command in place of the configured one.
    #[serde(default)]
    search_radius: Option<u32>,
    #[serde(default)]
    containers: Vec<ContainerEntry>,
    #[serde(default)]
    locks: Vec<LockEntry>,
    /// Players considered offline when the command runs.
    #[serde(default)]
    offline: BTreeSet<ActorId>,
}

#[derive(Debug, Deserialize)]
struct ContainerEntry {
    location: String,
    #[serde(default)]
    owner: Option<ActorId>,
    #[serde(default)]
    category: Option<Category>,
    #[serde(default = "default_capacity")]
    capacity: usize,
    #[serde(default)]
    contents: Vec<ItemStack>,
}

fn default_capacity() -> usize {
    27
}

#[derive(Debug, Deserialize)]
struct LockEntry {
    location: String,
    #[serde(flatten)]
    lock: Lock,
}

struct ScenarioWorld {
    offline: BTreeSet<ActorId>,
}

impl HostWorld for ScenarioWorld {
    fn actor_online(&self, actor: ActorId) -> bool {
        !self.offline.contains(&actor)
    }

    fn container_present(&self, _location: &LocationKey) -> bool {
        true
    }
}

fn parse_location(raw: &str) -> anyhow::Result<LocationKey> {
    raw.parse::<LocationKey>()
        .with_context(|| format!("bad location '{raw}'"))
}

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(scenario_path) = args.next() else {
        bail!("usage: autoorganize-sim <scenario.json> [config.json]");
    };

    let config = match args.next() {
        Some(path) => OrganizeConfig::from_file(&path)
            .with_context(|| format!("loading config {path}"))?,
        None => OrganizeConfig::default(),
    }
    .with_env_overrides();

    autoorganize_observability::tracing::init(config.log_format);

    let raw = std::fs::read_to_string(&scenario_path)
        .with_context(|| format!("reading scenario {scenario_path}"))?;
    let scenario: Scenario =
        serde_json::from_str(&raw).with_context(|| format!("parsing scenario {scenario_path}"))?;

    let locks = Arc::new(LockTable::new());
    for entry in scenario.locks {
        locks.lock(parse_location(&entry.location)?, entry.lock);
    }

    let audit_log = Arc::new(InMemoryAuditLog::new());
    let audit: Arc<dyn AuditSink> = Arc::new(
        ThreadedAuditSink::spawn(Arc::clone(&audit_log), config.integrations.audit.timeout())
            .context("starting audit worker")?,
    );

    let organizer = Organizer::from_config(&config, locks, Some(audit))?.with_world(Arc::new(
        ScenarioWorld {
            offline: scenario.offline,
        },
    ));

    for entry in scenario.containers {
        let location = parse_location(&entry.location)?;
        organizer.with_registry(|registry| -> anyhow::Result<()> {
            registry.register(location.clone(), entry.owner, entry.category, entry.capacity)?;
            registry.replace_contents(&location, entry.contents)?;
            Ok(())
        })??;
    }

    let location = scenario
        .location
        .as_deref()
        .map(parse_location)
        .transpose()?;

    let response = match scenario.search_radius {
        Some(radius) => {
            organizer.organize_command_within(scenario.actor, location.as_ref(), Some(radius))
        }
        None => organizer.organize_command(scenario.actor, location.as_ref()),
    };

    println!("{}", response.summary);
    for warning in &response.warnings {
        eprintln!("warning: {warning}");
    }
    println!("{}", serde_json::to_string_pretty(&response.results)?);
    println!("audit records: {}", audit_log.len());

    Ok(())
}
