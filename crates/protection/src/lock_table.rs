//! In-memory lock table (sign-lock model).

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use autoorganize_core::{ActorId, LocationKey};

use crate::ProtectionCapability;

/// A lock placed on one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub owner: ActorId,
    #[serde(default)]
    pub users: BTreeSet<ActorId>,
    /// Lock sign grants access to everyone while still recording an owner.
    #[serde(default)]
    pub everyone: bool,
}

impl Lock {
    pub fn owned_by(owner: ActorId) -> Self {
        Self {
            owner,
            users: BTreeSet::new(),
            everyone: false,
        }
    }

    pub fn with_user(mut self, user: ActorId) -> Self {
        self.users.insert(user);
        self
    }

    pub fn permits(&self, actor: ActorId) -> bool {
        self.everyone || self.owner == actor || self.users.contains(&actor)
    }
}

/// Lock table for tests, the simulator, and hosts without an external lock
/// plugin.
///
/// - Unlocked containers are open to everyone
/// - Locked containers admit the owner and listed users
/// - A poisoned table denies access
#[derive(Debug, Default)]
pub struct LockTable {
    locks: RwLock<HashMap<LocationKey, Lock>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self, location: LocationKey, lock: Lock) {
        if let Ok(mut locks) = self.locks.write() {
            locks.insert(location, lock);
        }
    }

    pub fn unlock(&self, location: &LocationKey) -> Option<Lock> {
        self.locks.write().ok()?.remove(location)
    }

    /// Grant `user` access to a locked container. Returns `false` when the
    /// container is not locked.
    pub fn add_user(&self, location: &LocationKey, user: ActorId) -> bool {
        match self.locks.write() {
            Ok(mut locks) => match locks.get_mut(location) {
                Some(lock) => {
                    lock.users.insert(user);
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    /// Revoke `user`'s access. Returns whether the user was listed.
    pub fn remove_user(&self, location: &LocationKey, user: ActorId) -> bool {
        match self.locks.write() {
            Ok(mut locks) => locks
                .get_mut(location)
                .is_some_and(|lock| lock.users.remove(&user)),
            Err(_) => false,
        }
    }

    pub fn is_protected(&self, location: &LocationKey) -> bool {
        match self.locks.read() {
            Ok(locks) => locks.contains_key(location),
            Err(_) => true,
        }
    }
}

impl ProtectionCapability for LockTable {
    fn can_access(&self, actor: ActorId, location: &LocationKey) -> bool {
        let Ok(locks) = self.locks.read() else {
            tracing::warn!(%location, "lock table poisoned; denying access");
            return false;
        };
        match locks.get(location) {
            None => true,
            Some(lock) => lock.permits(actor),
        }
    }

    fn owner_of(&self, location: &LocationKey) -> Option<ActorId> {
        self.locks.read().ok()?.get(location).map(|lock| lock.owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chest() -> LocationKey {
        LocationKey::new("world", 10, 64, -3)
    }

    #[test]
    fn unlocked_container_is_open_to_everyone() {
        let table = LockTable::new();
        assert!(table.can_access(ActorId::new(), &chest()));
        assert_eq!(table.owner_of(&chest()), None);
        assert!(!table.is_protected(&chest()));
    }

    #[test]
    fn locked_container_admits_owner_and_users_only() {
        let owner = ActorId::new();
        let friend = ActorId::new();
        let stranger = ActorId::new();

        let table = LockTable::new();
        table.lock(chest(), Lock::owned_by(owner).with_user(friend));

        assert!(table.can_access(owner, &chest()));
        assert!(table.can_access(friend, &chest()));
        assert!(!table.can_access(stranger, &chest()));
        assert_eq!(table.owner_of(&chest()), Some(owner));
    }

    #[test]
    fn revoking_a_user_takes_effect_immediately() {
        let owner = ActorId::new();
        let friend = ActorId::new();

        let table = LockTable::new();
        table.lock(chest(), Lock::owned_by(owner));
        assert!(table.add_user(&chest(), friend));
        assert!(table.can_access(friend, &chest()));

        assert!(table.remove_user(&chest(), friend));
        assert!(!table.can_access(friend, &chest()));
        assert!(!table.remove_user(&chest(), friend));
    }

    #[test]
    fn everyone_lock_still_reports_owner() {
        let owner = ActorId::new();
        let table = LockTable::new();
        let mut lock = Lock::owned_by(owner);
        lock.everyone = true;
        table.lock(chest(), lock);

        assert!(table.can_access(ActorId::new(), &chest()));
        assert_eq!(table.owner_of(&chest()), Some(owner));
    }

    #[test]
    fn add_user_on_unlocked_container_is_refused() {
        let table = LockTable::new();
        assert!(!table.add_user(&chest(), ActorId::new()));
    }
}
