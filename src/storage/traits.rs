//! Abstract storage traits for Verdant.
//!
//! These traits define the contract that plant stores and persistence sinks
//! must implement. By using traits, we enable:
//! - The in-memory store used by the simulation
//! - Best-effort persistence collaborators behind the store
//! - Test doubles that record or fail on demand

use chrono::{DateTime, Utc};

use crate::error::{PersistenceError, StorageError};
use crate::plant::{OwnerId, Plant, PlantId, PlantKind};

/// A mutation applied to a stored plant while the store lock is held.
///
/// Returning an error leaves the stored plant unchanged.
pub type PlantMutation<'a> = &'a mut dyn FnMut(&mut Plant) -> Result<(), StorageError>;

/// Storage trait for plant operations.
///
/// # Safety Considerations
/// - Every operation is atomic with respect to every other operation
/// - No caller may observe a partially-updated plant or a torn collection
pub trait PlantStore: Send + Sync {
    /// Allocate a new plant with the owner's next sequential id.
    ///
    /// # Errors
    /// - `AlreadyExists`: the store allows one plant per owner and the owner has one
    fn create(&self, owner: OwnerId, kind: PlantKind, now: DateTime<Utc>) -> Result<Plant, StorageError>;

    /// All plants of an owner, ordered by id.
    ///
    /// # Errors
    /// - `OwnerNotFound`: the owner holds no plants
    fn list(&self, owner: OwnerId) -> Result<Vec<Plant>, StorageError>;

    /// A single plant.
    ///
    /// # Errors
    /// - `OwnerNotFound` / `PlantNotFound`
    fn get(&self, owner: OwnerId, plant: PlantId) -> Result<Plant, StorageError>;

    /// The owner's lowest-id plant.
    fn first(&self, owner: OwnerId) -> Result<Plant, StorageError>;

    /// Apply `mutation` to a plant atomically and return the updated snapshot.
    ///
    /// If the mutation changed the plant, the snapshot carries a freshly
    /// stamped `revision`.
    fn update(&self, owner: OwnerId, plant: PlantId, mutation: PlantMutation<'_>) -> Result<Plant, StorageError>;

    /// Like [`update`](Self::update), targeting the owner's lowest-id plant.
    ///
    /// The target is resolved inside the same critical section as the
    /// mutation, so a concurrent delete cannot leave it dangling.
    ///
    /// # Errors
    /// - `OwnerNotFound`: the owner holds no plants
    fn update_first(&self, owner: OwnerId, mutation: PlantMutation<'_>) -> Result<Plant, StorageError>;

    /// Remove a plant and return it. Remaining plants keep their ids.
    fn delete(&self, owner: OwnerId, plant: PlantId) -> Result<Plant, StorageError>;

    /// Visit every plant across all owners under a single exclusive hold.
    ///
    /// The visitor returns true when it changed the plant. Those plants get a
    /// new `revision` and their snapshots are returned.
    fn for_each(&self, visit: &mut dyn FnMut(&mut Plant) -> bool) -> Result<Vec<Plant>, StorageError>;

    /// Total number of plants.
    fn len(&self) -> Result<usize, StorageError>;

    /// True if the store holds no plants.
    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

/// Persistence collaborator notified after each mutation.
///
/// Calls happen outside the store lock, so they can arrive out of order.
/// Implementations compare `Plant::revision` to keep the newest state, and
/// must not bring back a plant after `remove`. The core logs failures and
/// carries on; its own state never depends on a sink succeeding.
pub trait PlantSink: Send + Sync {
    /// Record the current state of a plant.
    fn save(&self, plant: &Plant) -> Result<(), PersistenceError>;

    /// Forget a deleted plant. `plant` is the snapshot the store removed.
    fn remove(&self, plant: &Plant) -> Result<(), PersistenceError>;
}

/// A sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl PlantSink for NoopSink {
    fn save(&self, _plant: &Plant) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn remove(&self, _plant: &Plant) -> Result<(), PersistenceError> {
        Ok(())
    }
}
