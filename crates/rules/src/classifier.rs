//! Classifier with an explicit reload boundary.

use std::sync::Arc;

use tracing::{info, warn};

use autoorganize_core::OrganizeResult;
use autoorganize_inventory::{Category, ItemStack};

use crate::{RuleSet, RuleTable};

/// Holds the active rule table.
///
/// A planning pass takes a [`snapshot`](Classifier::snapshot) and classifies
/// against it for the whole pass; a concurrent [`reload`](Classifier::reload)
/// swaps in a new table for *later* passes only.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    table: Arc<RuleTable>,
    generation: u64,
}

impl Classifier {
    pub fn new(table: RuleTable) -> Self {
        Self {
            table: Arc::new(table),
            generation: 1,
        }
    }

    pub fn from_rule_set(set: RuleSet) -> OrganizeResult<Self> {
        Ok(Self::new(RuleTable::load(set)?))
    }

    /// Rule table for one planning pass.
    pub fn snapshot(&self) -> Arc<RuleTable> {
        Arc::clone(&self.table)
    }

    /// Number of successful loads so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn classify(&self, stack: &ItemStack) -> Category {
        self.table.classify(stack)
    }

    /// Replace the rule table.
    ///
    /// On error the previous table stays active.
    pub fn reload(&mut self, set: RuleSet) -> OrganizeResult<u64> {
        match RuleTable::load(set) {
            Ok(table) => {
                self.table = Arc::new(table);
                self.generation += 1;
                info!(
                    generation = self.generation,
                    rules = self.table.len(),
                    "category rules reloaded"
                );
                Ok(self.generation)
            }
            Err(err) => {
                warn!(error = %err, generation = self.generation, "rule reload rejected; keeping previous rules");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CategoryRule, Predicate};
    use autoorganize_core::OrganizeError;

    fn rules(category: &str) -> RuleSet {
        RuleSet {
            rules: vec![CategoryRule::new(Predicate::Item("oak_log".into()), category)],
            ..RuleSet::default()
        }
    }

    #[test]
    fn snapshot_is_unaffected_by_reload() {
        let mut classifier = Classifier::from_rule_set(rules("wood")).unwrap();
        let pass = classifier.snapshot();

        classifier.reload(rules("fuel")).unwrap();

        let log = ItemStack::new("oak_log", 1);
        assert_eq!(pass.classify(&log), "wood".into());
        assert_eq!(classifier.classify(&log), "fuel".into());
        assert_eq!(classifier.generation(), 2);
    }

    #[test]
    fn conflicting_reload_keeps_previous_rules() {
        let mut classifier = Classifier::from_rule_set(rules("wood")).unwrap();

        let mut bad = rules("fuel");
        bad.rules
            .push(CategoryRule::new(Predicate::Item("oak_log".into()), "logs"));

        let err = classifier.reload(bad).unwrap_err();
        assert!(matches!(err, OrganizeError::RuleConflict { first: 0, second: 1, .. }));
        assert_eq!(classifier.classify(&ItemStack::new("oak_log", 1)), "wood".into());
        assert_eq!(classifier.generation(), 1);
    }
}
