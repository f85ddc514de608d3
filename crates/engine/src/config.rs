//! Engine configuration.
//!
//! Loaded from JSON. Every section is optional and falls back to its
//! default, so a config file only needs the keys it changes.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use autoorganize_inventory::{Category, StackLimits};
use autoorganize_observability::LogFormat;
use autoorganize_rules::RuleSet;

use crate::distance::Ranking;
use crate::messages::Messages;
use crate::planner::PlannerOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionIntegration {
    /// When off, every actor may open every container.
    pub enabled: bool,
}

impl Default for ProtectionIntegration {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditIntegration {
    pub enabled: bool,
    /// Upper bound on waiting for one execution's records when delivery runs
    /// on a worker thread.
    pub timeout_ms: u64,
}

impl Default for AuditIntegration {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 2_000,
        }
    }
}

impl AuditIntegration {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Integrations {
    pub protection: ProtectionIntegration,
    pub audit: AuditIntegration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Label marking a container as staging. Containers without a category
    /// are always staging.
    pub staging_category: Option<Category>,
    /// Max block distance (per axis) from the source. `None` = unlimited.
    pub search_radius: Option<u32>,
    pub ranking: Ranking,
    /// Rank destinations that already hold the item ahead of the rest.
    pub content_affinity: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            staging_category: Some(Category::new("staging")),
            search_radius: None,
            ranking: Ranking::Registration,
            content_affinity: true,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizeConfig {
    pub integrations: Integrations,
    pub planner: PlannerConfig,
    pub stack_limits: StackLimits,
    pub rules: RuleSet,
    pub messages: Messages,
    pub log_format: LogFormat,
}

impl OrganizeConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Apply `AUTOORGANIZE_*` environment overrides for the integration
    /// toggles.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(enabled) = env_flag("AUTOORGANIZE_PROTECTION_ENABLED") {
            self.integrations.protection.enabled = enabled;
        }
        if let Some(enabled) = env_flag("AUTOORGANIZE_AUDIT_ENABLED") {
            self.integrations.audit.enabled = enabled;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stack_limits.default_max == 0 {
            return Err(ConfigError::Invalid(
                "stack_limits.default_max must be at least 1".to_string(),
            ));
        }
        if let Some((item, _)) = self.stack_limits.overrides.iter().find(|(_, max)| **max == 0) {
            return Err(ConfigError::Invalid(format!(
                "stack limit for {item} must be at least 1"
            )));
        }
        if self.integrations.audit.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "integrations.audit.timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn planner_options(&self) -> PlannerOptions {
        PlannerOptions {
            staging_category: self.planner.staging_category.clone(),
            search_radius: self.planner.search_radius,
            ranking: self.planner.ranking,
            content_affinity: self.planner.content_affinity,
        }
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_stack_limits(mut self, limits: StackLimits) -> Self {
        self.stack_limits = limits;
        self
    }

    pub fn with_search_radius(mut self, radius: u32) -> Self {
        self.planner.search_radius = Some(radius);
        self
    }

    pub fn with_ranking(mut self, ranking: Ranking) -> Self {
        self.planner.ranking = ranking;
        self
    }

    pub fn with_content_affinity(mut self, enabled: bool) -> Self {
        self.planner.content_affinity = enabled;
        self
    }

    pub fn with_staging_category(mut self, category: Option<Category>) -> Self {
        self.planner.staging_category = category;
        self
    }

    pub fn with_protection(mut self, enabled: bool) -> Self {
        self.integrations.protection.enabled = enabled;
        self
    }

    pub fn with_audit(mut self, enabled: bool) -> Self {
        self.integrations.audit.enabled = enabled;
        self
    }

    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok()?.parse::<bool>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoorganize_inventory::ItemType;

    #[test]
    fn empty_object_yields_defaults() {
        let config = OrganizeConfig::from_json("{}").unwrap();
        assert_eq!(config, OrganizeConfig::default());
        assert!(config.integrations.protection.enabled);
        assert_eq!(config.planner.staging_category, Some(Category::new("staging")));
        assert_eq!(config.stack_limits.default_max, 64);
    }

    #[test]
    fn parses_nested_sections() {
        let json = r#"{
            "integrations": { "audit": { "enabled": false } },
            "planner": { "search_radius": 16, "ranking": "block_distance", "content_affinity": false },
            "stack_limits": { "overrides": { "ender_pearl": 16 } },
            "rules": {
                "rules": [ { "match": { "pattern": "*_log" }, "category": "wood" } ]
            },
            "log_format": "pretty"
        }"#;

        let config = OrganizeConfig::from_json(json).unwrap();
        assert!(!config.integrations.audit.enabled);
        assert_eq!(config.integrations.audit.timeout_ms, 2_000);
        assert_eq!(config.planner.search_radius, Some(16));
        assert_eq!(config.planner.ranking, Ranking::BlockDistance);
        assert!(!config.planner.content_affinity);
        assert_eq!(config.stack_limits.max_for(&ItemType::new("ender_pearl")), 16);
        assert_eq!(config.rules.rules.len(), 1);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn rejects_zero_stack_limit() {
        let err = OrganizeConfig::from_json(r#"{ "stack_limits": { "default_max": 0 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = OrganizeConfig::from_json("{ nope").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn builders_override_fields() {
        let config = OrganizeConfig::default()
            .with_search_radius(8)
            .with_protection(false)
            .with_staging_category(None);
        let options = config.planner_options();
        assert_eq!(options.search_radius, Some(8));
        assert_eq!(options.staging_category, None);
        assert!(!config.integrations.protection.enabled);
    }
}
