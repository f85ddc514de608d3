use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use autoorganize_core::{OrganizeError, OrganizeResult};
use autoorganize_inventory::{Category, ItemStack, ItemType};

use crate::predicate::{Matcher, Predicate};

/// One `predicate -> category` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    #[serde(rename = "match")]
    pub predicate: Predicate,
    pub category: Category,
}

impl CategoryRule {
    pub fn new(predicate: Predicate, category: impl Into<Category>) -> Self {
        Self {
            predicate,
            category: category.into(),
        }
    }
}

/// Rule configuration as loaded from the host (unvalidated).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub rules: Vec<CategoryRule>,
    pub groups: BTreeMap<String, BTreeSet<ItemType>>,
    /// Category for items no rule matches. `None` leaves them uncategorized.
    pub fallback: Option<Category>,
}

impl RuleSet {
    pub fn from_json(json: &str) -> OrganizeResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| OrganizeError::validation(format!("rule set: {e}")))
    }
}

/// Validated, immutable rule table. First matching rule wins.
///
/// Patterns and groups are resolved once at load, so classification does no
/// compilation.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<CategoryRule>,
    matchers: Vec<Matcher>,
    fallback: Option<Category>,
}

impl RuleTable {
    /// Validate a rule set.
    ///
    /// Overlapping predicates are fine (order decides); predicates naming the
    /// same items (`item oak_log` and `pattern oak_log` included) are a
    /// [`OrganizeError::RuleConflict`].
    pub fn load(set: RuleSet) -> OrganizeResult<Self> {
        let mut seen: HashMap<Predicate, usize> = HashMap::new();
        let mut matchers = Vec::with_capacity(set.rules.len());

        for (index, rule) in set.rules.iter().enumerate() {
            if let Some(first) = seen.insert(rule.predicate.normalized(), index) {
                return Err(OrganizeError::RuleConflict {
                    first,
                    second: index,
                    predicate: rule.predicate.to_string(),
                });
            }

            if rule.category.as_str().trim().is_empty() {
                return Err(OrganizeError::validation(format!(
                    "rule {index} ({}) has an empty category",
                    rule.predicate
                )));
            }

            matchers.push(rule.predicate.compile(index, &set.groups)?);
        }

        Ok(Self {
            rules: set.rules,
            matchers,
            fallback: set.fallback,
        })
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Category for a stack. Pure.
    pub fn classify(&self, stack: &ItemStack) -> Category {
        self.rules
            .iter()
            .zip(&self.matchers)
            .find(|(_, matcher)| matcher.matches(stack))
            .map(|(rule, _)| rule.category.clone())
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(Category::uncategorized)
    }
}
