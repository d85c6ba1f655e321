//! Action gateway for Verdant.
//!
//! `GardenEngine` is the operation surface request handlers call: create,
//! status, care actions and delete. Each operation runs against the plant store
//! under its lock, applies the lifecycle rules, and hands the resulting
//! snapshot to the persistence sink after the lock is released.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::GardenConfig;
use crate::error::{GardenResult, StorageError};
use crate::lifecycle::{self, LifecycleConfig};
use crate::plant::{Action, OwnerId, Plant, PlantId, PlantKind};
use crate::scheduler::DecayScheduler;
use crate::storage::{InMemoryPlantStore, JsonDirSink, NoopSink, PlantSink, PlantStore};
use crate::time::Clock;

/// Verdant action gateway.
#[derive(Clone)]
pub struct GardenEngine {
    store: Arc<dyn PlantStore>,
    clock: Arc<dyn Clock>,
    lifecycle: LifecycleConfig,
    sink: Arc<dyn PlantSink>,
}

impl std::fmt::Debug for GardenEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GardenEngine")
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl GardenEngine {
    /// Create an engine over the given store and clock, without persistence.
    #[must_use]
    pub fn new(store: Arc<dyn PlantStore>, clock: Arc<dyn Clock>, lifecycle: LifecycleConfig) -> Self {
        Self {
            store,
            clock,
            lifecycle,
            sink: Arc::new(NoopSink),
        }
    }

    /// Attach a persistence sink notified after every mutation.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn PlantSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Build an engine from configuration.
    ///
    /// With a `data_dir`, plants saved there are restored into the store and
    /// every later mutation is written back.
    pub fn from_config(config: &GardenConfig, clock: Arc<dyn Clock>) -> GardenResult<Self> {
        config.validate()?;
        let lifecycle = config.lifecycle();

        let Some(dir) = config.data_dir.as_ref() else {
            let store = InMemoryPlantStore::with_policy(config.ownership);
            return Ok(Self::new(Arc::new(store), clock, lifecycle));
        };

        let sink = JsonDirSink::open(dir)?;
        let plants = sink.load_all()?;
        let restored = plants.len();
        let store = InMemoryPlantStore::restore(config.ownership, plants, sink.next_ids())?;
        info!(dir = %dir.display(), restored, "restored plants from snapshot");

        Ok(Self::new(Arc::new(store), clock, lifecycle).with_sink(Arc::new(sink)))
    }

    /// A decay scheduler sharing this engine's store, clock, rules and sink.
    #[must_use]
    pub fn scheduler(&self, interval: std::time::Duration) -> DecayScheduler {
        DecayScheduler::new(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            self.lifecycle,
            interval,
        )
        .with_sink(Arc::clone(&self.sink))
    }

    /// The lifecycle rules in effect.
    #[must_use]
    pub const fn lifecycle(&self) -> &LifecycleConfig {
        &self.lifecycle
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn PlantStore> {
        &self.store
    }

    fn persist(&self, plant: &Plant) {
        if let Err(e) = self.sink.save(plant) {
            warn!(owner = %plant.owner_id, plant = %plant.id, error = %e, "failed to persist plant");
        }
    }

    /// Create a plant for `owner`. A missing kind defaults to non-flowering.
    ///
    /// # Errors
    /// - `AlreadyExists` when the store allows one plant per owner
    pub fn create_plant(&self, owner: OwnerId, kind: Option<PlantKind>) -> GardenResult<Plant> {
        let plant = self
            .store
            .create(owner, kind.unwrap_or_default(), self.clock.now())?;
        info!(owner = %owner, plant = %plant.id, kind = ?plant.kind, "plant created");
        self.persist(&plant);
        Ok(plant)
    }

    /// All plants of `owner`, ordered by id.
    ///
    /// # Errors
    /// - `NotFound` when the owner has no plants
    pub fn get_status(&self, owner: OwnerId) -> GardenResult<Vec<Plant>> {
        Ok(self.store.list(owner)?)
    }

    /// A single plant of `owner`.
    pub fn get_plant(&self, owner: OwnerId, plant: PlantId) -> GardenResult<Plant> {
        Ok(self.store.get(owner, plant)?)
    }

    /// Apply the action named by `token` to a plant.
    ///
    /// Without a plant id the owner's lowest-id plant is targeted.
    ///
    /// # Errors
    /// - `InvalidAction` for anything but `water` / `feed`; nothing is touched
    /// - `NotFound` when the owner or plant does not exist
    pub fn apply_action(&self, owner: OwnerId, plant: Option<PlantId>, token: &str) -> GardenResult<Plant> {
        let action: Action = token.parse()?;
        self.apply(owner, plant, action)
    }

    /// Apply a typed action to a plant.
    pub fn apply(&self, owner: OwnerId, plant: Option<PlantId>, action: Action) -> GardenResult<Plant> {
        let lifecycle = self.lifecycle;
        let clock = Arc::clone(&self.clock);
        let mut mutation = |plant: &mut Plant| {
            lifecycle::apply_action(plant, action, clock.now(), &lifecycle);
            Ok::<(), StorageError>(())
        };
        let updated = match plant {
            Some(id) => self.store.update(owner, id, &mut mutation)?,
            None => self.store.update_first(owner, &mut mutation)?,
        };

        debug!(
            owner = %owner,
            plant = %updated.id,
            action = %action,
            stage = %updated.growth_stage,
            health = updated.health_level,
            "action applied"
        );
        self.persist(&updated);
        Ok(updated)
    }

    /// Delete a plant. Remaining plants keep their ids.
    ///
    /// # Errors
    /// - `NotFound` when the owner or plant does not exist
    pub fn delete_plant(&self, owner: OwnerId, plant: PlantId) -> GardenResult<()> {
        let removed = self.store.delete(owner, plant)?;
        info!(owner = %owner, plant = %plant, "plant deleted");
        if let Err(e) = self.sink.remove(&removed) {
            warn!(owner = %owner, plant = %plant, error = %e, "failed to remove persisted plant");
        }
        Ok(())
    }
}
