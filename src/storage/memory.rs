//! In-memory storage backend.
//!
//! This module provides the thread-safe in-memory plant store the simulation
//! runs on. A single lock guards the whole owner → plants mapping; every
//! operation completes inside one hold of that lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StorageError;
use crate::plant::{OwnerId, Plant, PlantId, PlantKind};
use crate::storage::traits::{PlantMutation, PlantStore};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

/// How many plants an owner may hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipPolicy {
    /// At most one plant per owner; a second create fails with `AlreadyExists`.
    #[default]
    SinglePlant,
    /// Any number of plants per owner.
    MultiplePlants,
}

#[derive(Debug)]
struct Shelf {
    next_id: PlantId,
    plants: BTreeMap<PlantId, Plant>,
}

impl Default for Shelf {
    fn default() -> Self {
        Self {
            next_id: PlantId::FIRST,
            plants: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Default)]
struct GardenState {
    shelves: HashMap<OwnerId, Shelf>,
}

fn shelf_of(state: &GardenState, owner: OwnerId) -> Result<&Shelf, StorageError> {
    state
        .shelves
        .get(&owner)
        .filter(|shelf| !shelf.plants.is_empty())
        .ok_or(StorageError::OwnerNotFound(owner))
}

fn shelf_mut(state: &mut GardenState, owner: OwnerId) -> Result<&mut Shelf, StorageError> {
    state
        .shelves
        .get_mut(&owner)
        .filter(|shelf| !shelf.plants.is_empty())
        .ok_or(StorageError::OwnerNotFound(owner))
}

fn stamp(plant: &mut Plant) {
    plant.revision = plant.revision.saturating_add(1);
}

fn mutate(stored: &mut Plant, mutation: PlantMutation<'_>) -> Result<Plant, StorageError> {
    // Mutate a copy so a failing mutation leaves the stored plant intact.
    let mut next = stored.clone();
    mutation(&mut next)?;
    if next != *stored {
        stamp(&mut next);
        *stored = next.clone();
    }
    Ok(next)
}

/// Thread-safe in-memory plant store.
#[derive(Debug, Default)]
pub struct InMemoryPlantStore {
    policy: OwnershipPolicy,
    state: RwLock<GardenState>,
}

impl InMemoryPlantStore {
    /// Create a new empty store with the default (single-plant) policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty store with the given ownership policy.
    #[must_use]
    pub fn with_policy(policy: OwnershipPolicy) -> Self {
        Self {
            policy,
            state: RwLock::new(GardenState::default()),
        }
    }

    /// Create a store pre-populated with previously persisted plants.
    ///
    /// Each owner's id counter resumes after the highest restored id.
    ///
    /// # Errors
    /// - `AlreadyExists`: two restored plants share an owner and id, or the
    ///   single-plant policy is violated by the snapshot
    pub fn with_plants(
        policy: OwnershipPolicy,
        plants: impl IntoIterator<Item = Plant>,
    ) -> Result<Self, StorageError> {
        Self::restore(policy, plants, std::iter::empty())
    }

    /// Like [`with_plants`](Self::with_plants), also resuming saved id counters.
    ///
    /// `next_ids` holds each owner's next id as it was before the restart, so
    /// owners whose plants were all deleted do not get old ids again. A counter
    /// never goes below the highest restored id plus one.
    ///
    /// # Errors
    /// - `AlreadyExists`: as for [`with_plants`](Self::with_plants)
    pub fn restore(
        policy: OwnershipPolicy,
        plants: impl IntoIterator<Item = Plant>,
        next_ids: impl IntoIterator<Item = (OwnerId, PlantId)>,
    ) -> Result<Self, StorageError> {
        let mut state = GardenState::default();
        for plant in plants {
            let owner = plant.owner_id;
            let shelf = state.shelves.entry(owner).or_default();
            if shelf.plants.contains_key(&plant.id)
                || (policy == OwnershipPolicy::SinglePlant && !shelf.plants.is_empty())
            {
                return Err(StorageError::AlreadyExists(owner));
            }
            if plant.id >= shelf.next_id {
                shelf.next_id = plant.id.next();
            }
            shelf.plants.insert(plant.id, plant);
        }
        for (owner, next_id) in next_ids {
            let shelf = state.shelves.entry(owner).or_default();
            shelf.next_id = shelf.next_id.max(next_id);
        }

        Ok(Self {
            policy,
            state: RwLock::new(state),
        })
    }

    /// The ownership policy this store enforces.
    #[must_use]
    pub const fn policy(&self) -> OwnershipPolicy {
        self.policy
    }
}

impl PlantStore for InMemoryPlantStore {
    fn create(&self, owner: OwnerId, kind: PlantKind, now: DateTime<Utc>) -> Result<Plant, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("plant.create"))?;
        let shelf = state.shelves.entry(owner).or_default();
        if self.policy == OwnershipPolicy::SinglePlant && !shelf.plants.is_empty() {
            return Err(StorageError::AlreadyExists(owner));
        }

        let id = shelf.next_id;
        shelf.next_id = id.next();
        let mut plant = Plant::new(owner, id, kind, now);
        stamp(&mut plant);
        shelf.plants.insert(id, plant.clone());
        debug!(owner = %owner, plant = %id, "plant created");
        Ok(plant)
    }

    fn list(&self, owner: OwnerId) -> Result<Vec<Plant>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("plant.list"))?;
        let shelf = shelf_of(&state, owner)?;
        Ok(shelf.plants.values().cloned().collect())
    }

    fn get(&self, owner: OwnerId, plant: PlantId) -> Result<Plant, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("plant.get"))?;
        let shelf = shelf_of(&state, owner)?;
        shelf
            .plants
            .get(&plant)
            .cloned()
            .ok_or(StorageError::PlantNotFound { owner, plant })
    }

    fn first(&self, owner: OwnerId) -> Result<Plant, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("plant.first"))?;
        let shelf = shelf_of(&state, owner)?;
        shelf
            .plants
            .values()
            .next()
            .cloned()
            .ok_or(StorageError::OwnerNotFound(owner))
    }

    fn update(&self, owner: OwnerId, plant: PlantId, mutation: PlantMutation<'_>) -> Result<Plant, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("plant.update"))?;
        let stored = shelf_mut(&mut state, owner)?
            .plants
            .get_mut(&plant)
            .ok_or(StorageError::PlantNotFound { owner, plant })?;
        mutate(stored, mutation)
    }

    fn update_first(&self, owner: OwnerId, mutation: PlantMutation<'_>) -> Result<Plant, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("plant.update_first"))?;
        let stored = shelf_mut(&mut state, owner)?
            .plants
            .values_mut()
            .next()
            .ok_or(StorageError::OwnerNotFound(owner))?;
        mutate(stored, mutation)
    }

    fn delete(&self, owner: OwnerId, plant: PlantId) -> Result<Plant, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("plant.delete"))?;
        let shelf = shelf_mut(&mut state, owner)?;
        let removed = shelf
            .plants
            .remove(&plant)
            .ok_or(StorageError::PlantNotFound { owner, plant })?;
        debug!(owner = %owner, plant = %plant, "plant deleted");
        Ok(removed)
    }

    fn for_each(&self, visit: &mut dyn FnMut(&mut Plant) -> bool) -> Result<Vec<Plant>, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("plant.for_each"))?;
        let mut changed = Vec::new();
        for shelf in state.shelves.values_mut() {
            for plant in shelf.plants.values_mut() {
                if visit(plant) {
                    stamp(plant);
                    changed.push(plant.clone());
                }
            }
        }
        Ok(changed)
    }

    fn len(&self) -> Result<usize, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("plant.len"))?;
        Ok(state.shelves.values().map(|shelf| shelf.plants.len()).sum())
    }
}
