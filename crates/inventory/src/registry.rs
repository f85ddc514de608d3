//! Container registry: owns every registered container and its contents.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use autoorganize_core::{ActorId, LocationKey, OrganizeError, OrganizeResult};
use autoorganize_protection::{ProtectionCapability, Unprotected};

use crate::container::{Category, Container};
use crate::item::{ItemStack, StackLimits};

/// Registration request for one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub location: LocationKey,
    pub owner: Option<ActorId>,
    pub category: Option<Category>,
    pub capacity: usize,
    /// Allows an existing registration to change owner.
    pub reauthorized: bool,
}

impl Registration {
    pub fn new(location: LocationKey, capacity: usize) -> Self {
        Self {
            location,
            owner: None,
            category: None,
            capacity,
            reauthorized: false,
        }
    }

    pub fn owner(mut self, owner: ActorId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn category(mut self, category: impl Into<Category>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn reauthorized(mut self) -> Self {
        self.reauthorized = true;
        self
    }
}

/// Why a single transfer could not be applied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("no container registered at {0}")]
    NotFound(LocationKey),

    #[error("source and destination are the same container ({0})")]
    SameContainer(LocationKey),

    #[error("source holds {available}, {requested} requested")]
    SourceShortfall { available: u64, requested: u32 },

    #[error("destination has room for {room}, {requested} requested")]
    CapacityExceeded { room: u64, requested: u32 },
}

/// Owns all containers. Single source of truth for contents.
///
/// Iteration order is registration order everywhere, so planning over a
/// registry snapshot is reproducible.
pub struct ContainerRegistry {
    containers: HashMap<LocationKey, Container>,
    by_seq: BTreeMap<u64, LocationKey>,
    next_seq: u64,
    limits: StackLimits,
    protection: Arc<dyn ProtectionCapability>,
}

impl core::fmt::Debug for ContainerRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContainerRegistry")
            .field("containers", &self.containers.len())
            .field("next_seq", &self.next_seq)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl Default for ContainerRegistry {
    fn default() -> Self {
        Self::new(Arc::new(Unprotected), StackLimits::default())
    }
}

impl ContainerRegistry {
    pub fn new(protection: Arc<dyn ProtectionCapability>, limits: StackLimits) -> Self {
        Self {
            containers: HashMap::new(),
            by_seq: BTreeMap::new(),
            next_seq: 0,
            limits,
            protection,
        }
    }

    pub fn limits(&self) -> &StackLimits {
        &self.limits
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Register (or update) a container without re-authorization.
    pub fn register(
        &mut self,
        location: LocationKey,
        owner: Option<ActorId>,
        category: Option<Category>,
        capacity: usize,
    ) -> OrganizeResult<&Container> {
        self.apply(Registration {
            location,
            owner,
            category,
            capacity,
            reauthorized: false,
        })
    }

    /// Create or update a container.
    ///
    /// - Missing owner is resolved through the protection capability
    /// - Changing owner requires `reauthorized`
    /// - Updates keep the original registration order and contents
    pub fn apply(&mut self, reg: Registration) -> OrganizeResult<&Container> {
        if reg.capacity == 0 {
            return Err(OrganizeError::validation(format!(
                "container at {} must have at least one slot",
                reg.location
            )));
        }

        let owner = reg
            .owner
            .or_else(|| self.protection.owner_of(&reg.location));

        if let Some(existing) = self.containers.get_mut(&reg.location) {
            if existing.owner() != owner && !reg.reauthorized {
                return Err(OrganizeError::DuplicateRegistration {
                    location: reg.location,
                    existing_owner: existing.owner(),
                });
            }
            if reg.capacity < existing.occupied_slots() {
                return Err(OrganizeError::validation(format!(
                    "container at {} holds {} stacks; capacity {} is too small",
                    reg.location,
                    existing.occupied_slots(),
                    reg.capacity
                )));
            }

            existing.set_owner(owner);
            existing.set_category(reg.category);
            existing.set_capacity(reg.capacity);
            debug!(location = %reg.location, "container registration updated");
        } else {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.by_seq.insert(seq, reg.location.clone());
            self.containers.insert(
                reg.location.clone(),
                Container::new(reg.location.clone(), owner, reg.category, reg.capacity, seq),
            );
            info!(location = %reg.location, seq, "container registered");
        }

        self.lookup(&reg.location)
    }

    /// Remove a container (block destroyed or explicitly unregistered).
    pub fn unregister(&mut self, location: &LocationKey) -> OrganizeResult<Container> {
        let container = self
            .containers
            .remove(location)
            .ok_or_else(|| OrganizeError::not_found(location))?;
        self.by_seq.remove(&container.registration_seq());
        info!(%location, "container unregistered");
        Ok(container)
    }

    pub fn lookup(&self, location: &LocationKey) -> OrganizeResult<&Container> {
        self.containers
            .get(location)
            .ok_or_else(|| OrganizeError::not_found(location))
    }

    pub fn contains(&self, location: &LocationKey) -> bool {
        self.containers.contains_key(location)
    }

    /// All containers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Container> + '_ {
        self.by_seq
            .values()
            .filter_map(move |location| self.containers.get(location))
    }

    /// Containers declaring `category`, lazily, in registration order.
    pub fn containers_for_category<'a>(
        &'a self,
        category: &'a Category,
    ) -> impl Iterator<Item = &'a Container> + 'a {
        self.iter().filter(move |c| c.category() == Some(category))
    }

    /// Delegates to the protection capability. Never mutates.
    pub fn can_access(&self, actor: ActorId, container: &Container) -> bool {
        self.protection.can_access(actor, container.location())
    }

    pub fn can_access_at(&self, actor: ActorId, location: &LocationKey) -> bool {
        self.protection.can_access(actor, location)
    }

    /// Overwrite a container's contents from the host world.
    pub fn replace_contents(
        &mut self,
        location: &LocationKey,
        contents: Vec<ItemStack>,
    ) -> OrganizeResult<()> {
        for stack in &contents {
            self.limits.validate(stack)?;
        }
        let container = self
            .containers
            .get_mut(location)
            .ok_or_else(|| OrganizeError::not_found(location))?;
        if contents.len() > container.capacity() {
            return Err(OrganizeError::validation(format!(
                "{} stacks do not fit in {} slots at {}",
                contents.len(),
                container.capacity(),
                location
            )));
        }
        container.set_contents(contents);
        Ok(())
    }

    /// Deposit a stack into a container from the host world.
    pub fn insert(&mut self, location: &LocationKey, stack: ItemStack) -> OrganizeResult<()> {
        if stack.quantity == 0 {
            return Err(OrganizeError::validation(format!(
                "stack of {} has zero quantity",
                stack.item
            )));
        }
        let container = self
            .containers
            .get_mut(location)
            .ok_or_else(|| OrganizeError::not_found(location))?;
        container
            .put(&stack, stack.quantity, &self.limits)
            .map_err(|room| {
                OrganizeError::validation(format!(
                    "{} has room for {} {}, {} offered",
                    location, room, stack.item, stack.quantity
                ))
            })
    }

    /// Move `quantity` of `kind` from `source` to `destination` atomically.
    ///
    /// Either both containers change or neither does.
    pub fn transfer(
        &mut self,
        source: &LocationKey,
        destination: &LocationKey,
        kind: &ItemStack,
        quantity: u32,
    ) -> Result<(), TransferError> {
        if source == destination {
            return Err(TransferError::SameContainer(source.clone()));
        }

        let src = self
            .containers
            .get(source)
            .ok_or_else(|| TransferError::NotFound(source.clone()))?;
        let dst = self
            .containers
            .get(destination)
            .ok_or_else(|| TransferError::NotFound(destination.clone()))?;

        let available = src.quantity_of(&kind.item, kind.tag.as_deref());
        if available < u64::from(quantity) {
            return Err(TransferError::SourceShortfall {
                available,
                requested: quantity,
            });
        }
        let room = dst.room_for(&kind.item, &self.limits);
        if room < u64::from(quantity) {
            return Err(TransferError::CapacityExceeded {
                room,
                requested: quantity,
            });
        }

        let src = self
            .containers
            .get_mut(source)
            .ok_or_else(|| TransferError::NotFound(source.clone()))?;
        src.take(&kind.item, kind.tag.as_deref(), quantity)
            .map_err(|available| TransferError::SourceShortfall {
                available,
                requested: quantity,
            })?;

        let put = self
            .containers
            .get_mut(destination)
            .ok_or_else(|| TransferError::NotFound(destination.clone()))
            .and_then(|dst| {
                dst.put(kind, quantity, &self.limits)
                    .map_err(|room| TransferError::CapacityExceeded {
                        room,
                        requested: quantity,
                    })
            });

        if let Err(err) = put {
            // Put the items back so the source is left as it was.
            if let Some(src) = self.containers.get_mut(source) {
                let _ = src.put(kind, quantity, &self.limits);
            }
            return Err(err);
        }

        Ok(())
    }
}
