use autoorganize_core::{ActorId, LocationKey};

/// Access-control contract consumed from the host's protection system.
///
/// - No mutation
/// - No panics
/// - Answers reflect the lock state *now*; callers re-query before acting
pub trait ProtectionCapability: Send + Sync {
    /// Whether `actor` may open the container at `location`.
    fn can_access(&self, actor: ActorId, location: &LocationKey) -> bool;

    /// The registered owner of the container, if it is locked.
    fn owner_of(&self, location: &LocationKey) -> Option<ActorId>;
}

/// Protection disabled or not installed: every container is open to everyone.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unprotected;

impl ProtectionCapability for Unprotected {
    fn can_access(&self, _actor: ActorId, _location: &LocationKey) -> bool {
        true
    }

    fn owner_of(&self, _location: &LocationKey) -> Option<ActorId> {
        None
    }
}

impl<P: ProtectionCapability + ?Sized> ProtectionCapability for std::sync::Arc<P> {
    fn can_access(&self, actor: ActorId, location: &LocationKey) -> bool {
        (**self).can_access(actor, location)
    }

    fn owner_of(&self, location: &LocationKey) -> Option<ActorId> {
        (**self).owner_of(location)
    }
}
