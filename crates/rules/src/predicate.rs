use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde::{Deserialize, Serialize};

use autoorganize_core::{OrganizeError, OrganizeResult};
use autoorganize_inventory::{ItemStack, ItemType};

/// What a rule matches on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Exact item type.
    Item(ItemType),
    /// Membership in a named item group (e.g. `logs`).
    Group(String),
    /// The stack's metadata tag.
    Tag(String),
    /// Item type glob; `*` matches any run of characters.
    Pattern(String),
}

impl Predicate {
    /// Canonical form for duplicate detection: a pattern without wildcards
    /// names exactly one item.
    pub fn normalized(&self) -> Predicate {
        match self {
            Predicate::Pattern(pattern) if !pattern.contains('*') => {
                Predicate::Item(ItemType::new(pattern.as_str()))
            }
            other => other.clone(),
        }
    }

    /// Resolve groups and compile patterns for rule `index`.
    pub(crate) fn compile(
        &self,
        index: usize,
        groups: &BTreeMap<String, BTreeSet<ItemType>>,
    ) -> OrganizeResult<Matcher> {
        match self {
            Predicate::Item(item) => Ok(Matcher::Item(item.clone())),
            Predicate::Group(name) => groups
                .get(name)
                .map(|members| Matcher::Group(members.clone()))
                .ok_or_else(|| {
                    OrganizeError::validation(format!("rule {index} references unknown group #{name}"))
                }),
            Predicate::Tag(tag) => Ok(Matcher::Tag(tag.clone())),
            Predicate::Pattern(pattern) => glob_regex(pattern).map(Matcher::Pattern).map_err(|e| {
                OrganizeError::validation(format!("rule {index} pattern '{pattern}': {e}"))
            }),
        }
    }
}

impl core::fmt::Display for Predicate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Predicate::Item(item) => write!(f, "item {item}"),
            Predicate::Group(name) => write!(f, "group #{name}"),
            Predicate::Tag(tag) => write!(f, "tag {tag}"),
            Predicate::Pattern(pattern) => write!(f, "pattern {pattern}"),
        }
    }
}

/// A predicate ready for classification.
#[derive(Debug, Clone)]
pub(crate) enum Matcher {
    Item(ItemType),
    Group(BTreeSet<ItemType>),
    Tag(String),
    Pattern(Regex),
}

impl Matcher {
    pub(crate) fn matches(&self, stack: &ItemStack) -> bool {
        match self {
            Matcher::Item(item) => &stack.item == item,
            Matcher::Group(members) => members.contains(&stack.item),
            Matcher::Tag(tag) => stack.tag.as_deref() == Some(tag.as_str()),
            Matcher::Pattern(re) => re.is_match(stack.item.as_str()),
        }
    }
}

/// Anchored regex for a `*` glob. Every other character is literal.
fn glob_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$"))
}
