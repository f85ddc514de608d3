//! Liveness queries against the host world.

use autoorganize_core::{ActorId, LocationKey};

/// What the executor asks the host before each move.
///
/// A `false` from either query cancels the rest of the plan.
pub trait HostWorld: Send + Sync {
    fn actor_online(&self, actor: ActorId) -> bool;
    fn container_present(&self, location: &LocationKey) -> bool;
}

/// Host that never goes away (tests, simulator).
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysPresent;

impl HostWorld for AlwaysPresent {
    fn actor_online(&self, _actor: ActorId) -> bool {
        true
    }

    fn container_present(&self, _location: &LocationKey) -> bool {
        true
    }
}

impl<W: HostWorld + ?Sized> HostWorld for std::sync::Arc<W> {
    fn actor_online(&self, actor: ActorId) -> bool {
        (**self).actor_online(actor)
    }

    fn container_present(&self, location: &LocationKey) -> bool {
        (**self).container_present(location)
    }
}
