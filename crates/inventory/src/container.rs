use serde::{Deserialize, Serialize};

use autoorganize_core::{ActorId, LocationKey};

use crate::item::{ItemStack, ItemType, StackLimits};

/// Semantic grouping label shared by items and containers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    /// Label for items no rule matched. Never relocated automatically.
    pub const UNCATEGORIZED: &'static str = "uncategorized";

    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn uncategorized() -> Self {
        Self::new(Self::UNCATEGORIZED)
    }

    pub fn is_uncategorized(&self) -> bool {
        self.0 == Self::UNCATEGORIZED
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A registered storage block.
///
/// Each element of `contents` occupies one slot; `contents.len() <= capacity`
/// always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    location: LocationKey,
    owner: Option<ActorId>,
    category: Option<Category>,
    capacity: usize,
    contents: Vec<ItemStack>,
    registration_seq: u64,
}

impl Container {
    pub(crate) fn new(
        location: LocationKey,
        owner: Option<ActorId>,
        category: Option<Category>,
        capacity: usize,
        registration_seq: u64,
    ) -> Self {
        Self {
            location,
            owner,
            category,
            capacity,
            contents: Vec::new(),
            registration_seq,
        }
    }

    pub fn location(&self) -> &LocationKey {
        &self.location
    }

    pub fn owner(&self) -> Option<ActorId> {
        self.owner
    }

    pub fn category(&self) -> Option<&Category> {
        self.category.as_ref()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contents(&self) -> &[ItemStack] {
        &self.contents
    }

    /// Position in registration order (0 = first registered).
    pub fn registration_seq(&self) -> u64 {
        self.registration_seq
    }

    pub fn occupied_slots(&self) -> usize {
        self.contents.len()
    }

    pub fn free_slots(&self) -> usize {
        self.capacity.saturating_sub(self.contents.len())
    }

    pub(crate) fn set_owner(&mut self, owner: Option<ActorId>) {
        self.owner = owner;
    }

    pub(crate) fn set_category(&mut self, category: Option<Category>) {
        self.category = category;
    }

    pub(crate) fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    pub(crate) fn set_contents(&mut self, contents: Vec<ItemStack>) {
        self.contents = contents;
    }

    /// Total quantity of stacks matching item type and tag.
    pub fn quantity_of(&self, item: &ItemType, tag: Option<&str>) -> u64 {
        self.contents
            .iter()
            .filter(|s| s.is_same_kind(item, tag))
            .map(|s| u64::from(s.quantity))
            .sum()
    }

    /// How many more of `item` fit: headroom in similar stacks plus empty
    /// slots at full stack size.
    pub fn room_for(&self, item: &ItemType, limits: &StackLimits) -> u64 {
        let max = limits.max_for(item);
        let topping: u64 = self
            .contents
            .iter()
            .filter(|s| &s.item == item)
            .map(|s| u64::from(max.saturating_sub(s.quantity)))
            .sum();
        topping + self.free_slots() as u64 * u64::from(max)
    }

    /// Add `quantity` of `kind`, filling similar stacks first and then empty
    /// slots. All-or-nothing: returns the room available when it is short.
    pub fn put(&mut self, kind: &ItemStack, quantity: u32, limits: &StackLimits) -> Result<(), u64> {
        let room = self.room_for(&kind.item, limits);
        if u64::from(quantity) > room {
            return Err(room);
        }

        let max = limits.max_for(&kind.item);
        let mut remaining = quantity;

        for slot in self.contents.iter_mut().filter(|s| s.item == kind.item) {
            if remaining == 0 {
                break;
            }
            let add = max.saturating_sub(slot.quantity).min(remaining);
            slot.quantity += add;
            remaining -= add;
        }

        while remaining > 0 {
            let placed = remaining.min(max);
            self.contents.push(kind.with_quantity(placed));
            remaining -= placed;
        }

        Ok(())
    }

    /// Remove `quantity` of stacks matching item type and tag, emptying the
    /// last matching slots first. All-or-nothing: returns the quantity
    /// available when it is short.
    pub fn take(&mut self, item: &ItemType, tag: Option<&str>, quantity: u32) -> Result<(), u64> {
        let available = self.quantity_of(item, tag);
        if u64::from(quantity) > available {
            return Err(available);
        }

        let mut remaining = quantity;
        for slot in self.contents.iter_mut().rev() {
            if remaining == 0 {
                break;
            }
            if !slot.is_same_kind(item, tag) {
                continue;
            }
            let removed = slot.quantity.min(remaining);
            slot.quantity -= removed;
            remaining -= removed;
        }
        self.contents.retain(|s| s.quantity > 0);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn chest(capacity: usize) -> Container {
        Container::new(LocationKey::new("world", 0, 64, 0), None, None, capacity, 0)
    }

    #[test]
    fn room_counts_headroom_and_empty_slots() {
        let limits = StackLimits::default();
        let mut c = chest(3);
        c.put(&ItemStack::new("oak_log", 1), 60, &limits).unwrap();

        // 4 of headroom in the existing stack plus two empty slots.
        assert_eq!(c.room_for(&"oak_log".into(), &limits), 4 + 2 * 64);
        assert_eq!(c.room_for(&"cobblestone".into(), &limits), 2 * 64);
    }

    #[test]
    fn put_tops_up_before_opening_slots() {
        let limits = StackLimits::default();
        let mut c = chest(3);
        c.put(&ItemStack::new("oak_log", 1), 60, &limits).unwrap();
        c.put(&ItemStack::new("oak_log", 1), 10, &limits).unwrap();

        assert_eq!(c.contents().len(), 2);
        assert_eq!(c.contents()[0].quantity, 64);
        assert_eq!(c.contents()[1].quantity, 6);
    }

    #[test]
    fn put_is_all_or_nothing() {
        let limits = StackLimits::default().with_limit("ender_pearl", 16);
        let mut c = chest(1);
        let err = c.put(&ItemStack::new("ender_pearl", 1), 17, &limits).unwrap_err();
        assert_eq!(err, 16);
        assert!(c.contents().is_empty());
    }

    #[test]
    fn take_only_touches_matching_tag() {
        let limits = StackLimits::default();
        let mut c = chest(4);
        c.put(&ItemStack::new("oak_log", 1), 10, &limits).unwrap();
        c.contents.push(ItemStack::new("oak_log", 5).tagged("stripped"));

        assert_eq!(c.take(&"oak_log".into(), Some("stripped"), 6), Err(5));
        c.take(&"oak_log".into(), Some("stripped"), 5).unwrap();

        assert_eq!(c.contents(), &[ItemStack::new("oak_log", 10)]);
    }

    proptest! {
        #[test]
        fn put_then_take_restores_quantity(
            existing in 0u32..=64,
            moved in 1u32..=200,
        ) {
            let limits = StackLimits::default();
            let mut c = chest(5);
            if existing > 0 {
                c.put(&ItemStack::new("dirt", 1), existing, &limits).unwrap();
            }
            let before = c.quantity_of(&"dirt".into(), None);

            if c.put(&ItemStack::new("dirt", 1), moved, &limits).is_ok() {
                prop_assert_eq!(c.quantity_of(&"dirt".into(), None), before + u64::from(moved));
                prop_assert!(c.occupied_slots() <= c.capacity());
                c.take(&"dirt".into(), None, moved).unwrap();
            }
            prop_assert_eq!(c.quantity_of(&"dirt".into(), None), before);
        }
    }
}
