//! Container inventory model.
//!
//! Item stacks, containers and the registry that owns them. The registry is
//! the single source of truth for container contents; everything else reads
//! snapshots and requests mutations through [`ContainerRegistry::transfer`].

pub mod container;
pub mod item;
pub mod registry;

pub use container::{Category, Container};
pub use item::{ItemStack, ItemType, StackLimits};
pub use registry::{ContainerRegistry, Registration, TransferError};
