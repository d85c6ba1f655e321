//! Plant storage for Verdant.
//!
//! The store trait and its in-memory implementation, plus the persistence
//! sinks notified after each mutation.

mod memory;
mod snapshot;
mod traits;

pub use memory::{InMemoryPlantStore, OwnershipPolicy};
pub use snapshot::JsonDirSink;
pub use traits::{NoopSink, PlantMutation, PlantSink, PlantStore};
