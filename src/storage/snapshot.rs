//! JSON snapshot sink.
//!
//! Keeps one JSON document per plant in a directory so a restarted simulator
//! can resume from the last saved state. Writes use the write-to-temp-then-rename
//! pattern; there are no durability guarantees beyond that.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::PersistenceError;
use crate::plant::{OwnerId, Plant, PlantId};
use crate::storage::traits::PlantSink;

const EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";
const PLANT_PREFIX: &str = "owner-";
const NEXT_IDS_FILE: &str = "next-ids.json";

fn io_err(path: &Path, source: std::io::Error) -> PersistenceError {
    PersistenceError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn write_atomic<T: Serialize + ?Sized>(final_path: &Path, value: &T) -> Result<(), PersistenceError> {
    let temp_path = final_path.with_extension(TEMP_EXTENSION);
    let data = serde_json::to_vec_pretty(value).map_err(|source| PersistenceError::Serialization {
        path: final_path.display().to_string(),
        source,
    })?;

    let mut file = fs::File::create(&temp_path).map_err(|e| io_err(&temp_path, e))?;
    file.write_all(&data).map_err(|e| io_err(&temp_path, e))?;
    file.sync_all().map_err(|e| io_err(&temp_path, e))?;
    drop(file);

    fs::rename(&temp_path, final_path).map_err(|e| io_err(final_path, e))
}

#[derive(Debug, Clone, Copy)]
struct Written {
    revision: u64,
    removed: bool,
}

#[derive(Debug, Default)]
struct Index {
    written: HashMap<(OwnerId, PlantId), Written>,
    next_ids: BTreeMap<OwnerId, PlantId>,
}

/// Persists plants as `owner-<owner>-plant-<plant>.json` files.
///
/// Saves and removes are serialized by an internal lock held across the file
/// write. A save whose `revision` is not newer than the last one written for
/// that plant is dropped, and a removed plant is never written again. Each
/// owner's next id is kept in `next-ids.json` so ids stay unique across
/// restarts.
#[derive(Debug)]
pub struct JsonDirSink {
    dir: PathBuf,
    index: Mutex<Index>,
}

impl JsonDirSink {
    /// Open (creating if needed) a snapshot directory.
    ///
    /// Stale temp files from an interrupted write are removed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;

        for entry in fs::read_dir(&dir).map_err(|e| io_err(&dir, e))? {
            let path = entry.map_err(|e| io_err(&dir, e))?.path();
            if path.extension().is_some_and(|e| e == TEMP_EXTENSION) {
                if let Err(e) = fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "failed to remove stale temp file");
                }
            }
        }

        let index = Index {
            written: HashMap::new(),
            next_ids: Self::read_next_ids(&dir.join(NEXT_IDS_FILE))?,
        };
        Ok(Self {
            dir,
            index: Mutex::new(index),
        })
    }

    fn read_next_ids(path: &Path) -> Result<BTreeMap<OwnerId, PlantId>, PersistenceError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(io_err(path, e)),
        };
        let raw: BTreeMap<u64, u64> = match serde_json::from_slice(&bytes) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable id counters");
                return Ok(BTreeMap::new());
            }
        };
        Ok(raw
            .into_iter()
            .filter_map(|(owner, next)| Some((OwnerId::new(owner).ok()?, PlantId::new(next).ok()?)))
            .collect())
    }

    /// The directory this sink writes to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, owner: OwnerId, plant: PlantId) -> PathBuf {
        self.dir.join(format!("{PLANT_PREFIX}{owner}-plant-{plant}.{EXTENSION}"))
    }

    // The index is a write-ordering cache; a panic mid-write leaves it usable.
    fn index(&self) -> MutexGuard<'_, Index> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Each owner's next plant id, as last persisted.
    #[must_use]
    pub fn next_ids(&self) -> Vec<(OwnerId, PlantId)> {
        self.index().next_ids.iter().map(|(o, p)| (*o, *p)).collect()
    }

    fn advance_next_id(&self, index: &mut Index, plant: &Plant) -> Result<(), PersistenceError> {
        let next = plant.id.next();
        if index.next_ids.get(&plant.owner_id).is_some_and(|known| *known >= next) {
            return Ok(());
        }
        index.next_ids.insert(plant.owner_id, next);
        let raw: BTreeMap<u64, u64> = index
            .next_ids
            .iter()
            .map(|(o, p)| (o.get(), p.get()))
            .collect();
        write_atomic(&self.dir.join(NEXT_IDS_FILE), &raw)
    }

    /// Load every stored plant.
    ///
    /// Files that fail to parse are skipped with a warning. Loaded revisions
    /// seed the write ordering, so older snapshots are not written over them.
    pub fn load_all(&self) -> Result<Vec<Plant>, PersistenceError> {
        let mut plants = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(|e| io_err(&self.dir, e))? {
            let path = entry.map_err(|e| io_err(&self.dir, e))?.path();
            let is_plant = path.extension().is_some_and(|e| e == EXTENSION)
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(PLANT_PREFIX));
            if !is_plant {
                continue;
            }

            let bytes = fs::read(&path).map_err(|e| io_err(&path, e))?;
            match serde_json::from_slice::<Plant>(&bytes) {
                Ok(plant) => plants.push(plant),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable plant snapshot"),
            }
        }
        plants.sort_by_key(|p| (p.owner_id, p.id));

        let mut index = self.index();
        for plant in &plants {
            index.written.insert(
                (plant.owner_id, plant.id),
                Written {
                    revision: plant.revision,
                    removed: false,
                },
            );
        }
        Ok(plants)
    }
}

impl PlantSink for JsonDirSink {
    fn save(&self, plant: &Plant) -> Result<(), PersistenceError> {
        let key = (plant.owner_id, plant.id);
        let mut index = self.index();
        if let Some(written) = index.written.get(&key) {
            if written.removed || written.revision >= plant.revision {
                debug!(
                    owner = %plant.owner_id,
                    plant = %plant.id,
                    revision = plant.revision,
                    "dropping out-of-order plant snapshot"
                );
                return Ok(());
            }
        }

        write_atomic(&self.path_for(plant.owner_id, plant.id), plant)?;
        index.written.insert(
            key,
            Written {
                revision: plant.revision,
                removed: false,
            },
        );
        self.advance_next_id(&mut index, plant)
    }

    fn remove(&self, plant: &Plant) -> Result<(), PersistenceError> {
        let mut index = self.index();
        index.written.insert(
            (plant.owner_id, plant.id),
            Written {
                revision: plant.revision,
                removed: true,
            },
        );
        // The create may never have been saved.
        self.advance_next_id(&mut index, plant)?;

        let path = self.path_for(plant.owner_id, plant.id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use tempfile::TempDir;

    use crate::plant::{GrowthStage, PlantKind};

    fn owner(raw: u64) -> OwnerId {
        OwnerId::new(raw).unwrap()
    }

    fn plant(owner_raw: u64, id: u64, revision: u64) -> Plant {
        let mut plant = Plant::new(owner(owner_raw), PlantId::new(id).unwrap(), PlantKind::Flowering, Utc::now());
        plant.revision = revision;
        plant
    }

    #[test]
    fn save_load_remove() {
        let dir = TempDir::new().unwrap();
        let sink = JsonDirSink::open(dir.path()).unwrap();

        let mut young = plant(3, 1, 1);
        young.growth_stage = GrowthStage::Young;
        young.health_level = 70;
        sink.save(&young).unwrap();

        let other = plant(1, 1, 1);
        sink.save(&other).unwrap();

        let loaded = sink.load_all().unwrap();
        assert_eq!(loaded, vec![other.clone(), young.clone()]);

        sink.remove(&young).unwrap();
        assert_eq!(sink.load_all().unwrap(), vec![other]);

        // Removing twice is fine.
        sink.remove(&young).unwrap();
    }

    #[test]
    fn newer_revision_overwrites_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let sink = JsonDirSink::open(dir.path()).unwrap();

        let mut p = plant(1, 1, 1);
        sink.save(&p).unwrap();
        p.health_level = 20;
        p.revision = 2;
        sink.save(&p).unwrap();

        let loaded = sink.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].health_level, 20);
    }

    #[test]
    fn late_older_snapshot_is_dropped() {
        let dir = TempDir::new().unwrap();
        let sink = JsonDirSink::open(dir.path()).unwrap();

        let mut newer = plant(1, 1, 5);
        newer.health_level = 60;
        let mut older = plant(1, 1, 4);
        older.health_level = 90;

        sink.save(&newer).unwrap();
        sink.save(&older).unwrap();
        assert_eq!(sink.load_all().unwrap()[0].health_level, 60);

        // Ordering also holds against revisions loaded from disk.
        let reopened = JsonDirSink::open(dir.path()).unwrap();
        reopened.load_all().unwrap();
        reopened.save(&older).unwrap();
        assert_eq!(reopened.load_all().unwrap()[0].health_level, 60);
    }

    #[test]
    fn removed_plant_is_not_written_back() {
        let dir = TempDir::new().unwrap();
        let sink = JsonDirSink::open(dir.path()).unwrap();

        let p = plant(2, 1, 1);
        sink.save(&p).unwrap();
        sink.remove(&plant(2, 1, 3)).unwrap();

        let mut late = p.clone();
        late.revision = 2;
        sink.save(&late).unwrap();
        assert!(sink.load_all().unwrap().is_empty());
    }

    #[test]
    fn next_ids_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let sink = JsonDirSink::open(dir.path()).unwrap();
            sink.save(&plant(1, 1, 1)).unwrap();
            sink.save(&plant(1, 2, 1)).unwrap();
            sink.remove(&plant(1, 2, 1)).unwrap();
            sink.remove(&plant(1, 1, 1)).unwrap();
            // Never saved, only removed.
            sink.remove(&plant(4, 3, 1)).unwrap();
        }

        let sink = JsonDirSink::open(dir.path()).unwrap();
        assert!(sink.load_all().unwrap().is_empty());
        assert_eq!(
            sink.next_ids(),
            vec![
                (owner(1), PlantId::new(3).unwrap()),
                (owner(4), PlantId::new(4).unwrap())
            ]
        );
    }

    #[test]
    fn open_cleans_temp_files_and_load_skips_garbage() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("owner-1-plant-1.tmp"), b"partial").unwrap();
        fs::write(dir.path().join("owner-2-plant-1.json"), b"{not json").unwrap();
        fs::write(dir.path().join("README"), b"ignored").unwrap();
        fs::write(dir.path().join(NEXT_IDS_FILE), b"[broken").unwrap();

        let sink = JsonDirSink::open(dir.path()).unwrap();
        assert!(!dir.path().join("owner-1-plant-1.tmp").exists());
        assert!(sink.load_all().unwrap().is_empty());
        assert!(sink.next_ids().is_empty());
    }
}
