//! # Verdant - virtual plant lifecycle simulation
//!
//! Verdant keeps a collection of virtual plants per owner and simulates their
//! lives: health decays when a plant is neglected, and a healthy plant grows
//! through a fixed sequence of stages until it blooms.
//!
//! ## Core Concepts
//!
//! - **Plant**: the simulated entity, with a growth stage and a health level
//! - **PlantStore**: the owner → plants mapping behind a single lock
//! - **Lifecycle**: pure decay / growth / care rules
//! - **DecayScheduler**: the background sweep that advances every plant
//! - **GardenEngine**: the create / status / action / delete surface
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use chrono::Duration;
//! use verdant::{
//!     GardenEngine, GrowthStage, InMemoryPlantStore, LifecycleConfig, ManualClock, OwnerId,
//! };
//!
//! let clock = Arc::new(ManualClock::default());
//! let engine = GardenEngine::new(
//!     Arc::new(InMemoryPlantStore::new()),
//!     clock.clone(),
//!     LifecycleConfig::default(),
//! );
//! let scheduler = engine.scheduler(std::time::Duration::from_secs(5));
//!
//! let owner = OwnerId::new(1)?;
//! let plant = engine.create_plant(owner, None)?;
//! assert_eq!(plant.growth_stage, GrowthStage::Seed);
//!
//! clock.advance(Duration::seconds(11));
//! scheduler.tick();
//! let plant = engine.apply_action(owner, None, "water")?;
//! assert_eq!(plant.health_level, 100);
//! # Ok::<(), verdant::GardenError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod plant;
pub mod scheduler;
pub mod storage;
pub mod time;

// Re-export primary types at crate root for convenience
pub use config::GardenConfig;
pub use engine::GardenEngine;
pub use error::{GardenError, GardenResult, PersistenceError, StorageError, ValidationError};
pub use lifecycle::{DecayOutcome, LifecycleConfig};
pub use plant::{Action, GrowthStage, OwnerId, Plant, PlantId, PlantKind};
pub use scheduler::{DecayScheduler, SchedulerHandle, SweepReport};
pub use storage::{InMemoryPlantStore, JsonDirSink, NoopSink, OwnershipPolicy, PlantSink, PlantStore};
pub use time::{Clock, ManualClock, SystemClock};
