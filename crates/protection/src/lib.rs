//! `autoorganize-protection`: container lock boundary.
//!
//! The engine never reads a lock database directly; it asks a
//! [`ProtectionCapability`] whether an actor may open a container.

pub mod capability;
pub mod lock_table;

pub use capability::{ProtectionCapability, Unprotected};
pub use lock_table::{Lock, LockTable};
