//! Move plan model.

use serde::{Deserialize, Serialize};

use autoorganize_core::{ActorId, LocationKey};
use autoorganize_inventory::{Category, ItemStack, ItemType};

/// One proposed relocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOperation {
    /// Position in the plan; also the audit dedup sequence.
    pub sequence: u32,
    pub source: LocationKey,
    pub destination: LocationKey,
    pub item: ItemType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub quantity: u32,
    pub category: Category,
}

impl MoveOperation {
    /// Stack describing what moves (quantity included).
    pub fn stack(&self) -> ItemStack {
        ItemStack {
            item: self.item.clone(),
            quantity: self.quantity,
            tag: self.tag.clone(),
        }
    }

    pub(crate) fn same_kind(&self, destination: &LocationKey, stack: &ItemStack) -> bool {
        &self.destination == destination && self.item == stack.item && self.tag == stack.tag
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// No container declares the item's category.
    NoDestination,
    /// Every matching container is outside the search radius.
    OutOfRange,
    /// Matching containers exist but the actor may not open any.
    AccessDenied,
    /// Accessible matching containers are full.
    InsufficientCapacity,
    /// The actor went offline before the move ran.
    ActorOffline,
    /// The source container disappeared before the move ran.
    SourceRemoved,
}

impl UnresolvedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnresolvedReason::NoDestination => "no destination",
            UnresolvedReason::OutOfRange => "out of range",
            UnresolvedReason::AccessDenied => "access denied",
            UnresolvedReason::InsufficientCapacity => "insufficient capacity",
            UnresolvedReason::ActorOffline => "actor offline",
            UnresolvedReason::SourceRemoved => "source removed",
        }
    }
}

/// Items that stay where they are, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedItem {
    pub item: ItemType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub quantity: u32,
    pub category: Category,
    pub reason: UnresolvedReason,
}

/// Ordered, sequentially consistent list of moves out of one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePlan {
    pub actor: ActorId,
    pub source: LocationKey,
    /// Rule table generation the plan was computed against.
    pub rules_generation: u64,
    pub operations: Vec<MoveOperation>,
    pub unresolved: Vec<UnresolvedItem>,
}

impl MovePlan {
    pub fn empty(actor: ActorId, source: LocationKey, rules_generation: u64) -> Self {
        Self {
            actor,
            source,
            rules_generation,
            operations: Vec::new(),
            unresolved: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty() && self.unresolved.is_empty()
    }

    /// Total quantity of `item` the plan moves out of the source.
    pub fn planned_quantity(&self, item: &ItemType) -> u64 {
        self.operations
            .iter()
            .filter(|op| &op.item == item)
            .map(|op| u64::from(op.quantity))
            .sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
