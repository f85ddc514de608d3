use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use autoorganize_core::{OrganizeError, OrganizeResult};

/// Item type identifier (e.g. `oak_log`, `minecraft:diamond`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemType(String);

impl ItemType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ItemType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One slot's worth of items.
///
/// The metadata `tag` takes part in classification but not in stacking:
/// two stacks are similar when their item types match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: ItemType,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl ItemStack {
    pub fn new(item: impl Into<ItemType>, quantity: u32) -> Self {
        Self {
            item: item.into(),
            quantity,
            tag: None,
        }
    }

    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Stacking similarity: same item type.
    pub fn is_similar(&self, other: &ItemStack) -> bool {
        self.item == other.item
    }

    /// Same item type and same metadata tag.
    pub fn is_same_kind(&self, item: &ItemType, tag: Option<&str>) -> bool {
        &self.item == item && self.tag.as_deref() == tag
    }

    /// Copy of this stack's kind with a different quantity.
    pub fn with_quantity(&self, quantity: u32) -> Self {
        Self {
            item: self.item.clone(),
            quantity,
            tag: self.tag.clone(),
        }
    }
}

/// Max stack size per item type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackLimits {
    pub default_max: u32,
    pub overrides: BTreeMap<ItemType, u32>,
}

impl Default for StackLimits {
    fn default() -> Self {
        Self {
            default_max: 64,
            overrides: BTreeMap::new(),
        }
    }
}

impl StackLimits {
    pub fn with_limit(mut self, item: impl Into<ItemType>, max: u32) -> Self {
        self.overrides.insert(item.into(), max);
        self
    }

    pub fn max_for(&self, item: &ItemType) -> u32 {
        self.overrides
            .get(item)
            .copied()
            .unwrap_or(self.default_max)
            .max(1)
    }

    /// Reject empty stacks and stacks above the item's limit.
    pub fn validate(&self, stack: &ItemStack) -> OrganizeResult<()> {
        if stack.quantity == 0 {
            return Err(OrganizeError::validation(format!(
                "stack of {} has zero quantity",
                stack.item
            )));
        }
        let max = self.max_for(&stack.item);
        if stack.quantity > max {
            return Err(OrganizeError::validation(format!(
                "stack of {} {} exceeds max stack size {}",
                stack.quantity, stack.item, max
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_does_not_affect_similarity() {
        let plain = ItemStack::new("oak_log", 3);
        let tagged = ItemStack::new("oak_log", 5).tagged("stripped");
        assert!(plain.is_similar(&tagged));
        assert!(!plain.is_same_kind(&tagged.item, tagged.tag.as_deref()));
    }

    #[test]
    fn limits_fall_back_to_default() {
        let limits = StackLimits::default().with_limit("ender_pearl", 16);
        assert_eq!(limits.max_for(&"ender_pearl".into()), 16);
        assert_eq!(limits.max_for(&"cobblestone".into()), 64);
    }

    #[test]
    fn validate_rejects_empty_and_oversized_stacks() {
        let limits = StackLimits::default().with_limit("diamond_sword", 1);
        assert!(limits.validate(&ItemStack::new("dirt", 0)).is_err());
        assert!(limits.validate(&ItemStack::new("diamond_sword", 2)).is_err());
        assert!(limits.validate(&ItemStack::new("dirt", 64)).is_ok());
    }
}
