//! `autoorganize-core`: shared building blocks for the organization engine.
//!
//! This crate contains **pure** primitives (no host-server or storage concerns).

pub mod error;
pub mod id;
pub mod location;

pub use error::{OrganizeError, OrganizeResult};
pub use id::{ActorId, ExecutionId};
pub use location::LocationKey;
