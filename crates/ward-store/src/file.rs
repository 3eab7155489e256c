use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, warn};
use ward_types::{AreaBounds, BlockPos, Lock, LockId};

use crate::error::{StoreError, StoreResult};
use crate::index::LockIndex;
use crate::traits::{ProtectionStore, Scan};

/// File-backed protection store: one JSON record per lock.
///
/// Layout: `<dir>/<lock-id>.json`. The full record table and location index
/// are held in memory; the directory is the durable copy. On open every
/// record is loaded, and records that fail to parse or collide with an
/// already-loaded lock are skipped with a warning — a damaged file never
/// prevents the rest of the world from loading.
///
/// Writes go file-first: serialize to a temp file, rename into place, then
/// update the in-memory index under the same write lock. A failed write
/// leaves both the directory and the index untouched.
pub struct FileProtectionStore {
    dir: PathBuf,
    index: RwLock<LockIndex>,
}

impl FileProtectionStore {
    /// Open (or create) a store rooted at the given directory.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(dir)?;

        let mut index = LockIndex::new();
        let mut loaded = 0usize;
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_record(&path) {
                Ok(lock) => {
                    let id = lock.id;
                    if index.load(lock) {
                        loaded += 1;
                    } else {
                        warn!(%id, ?path, "skipping lock record: id or location collision");
                    }
                }
                Err(err) => {
                    warn!(?path, %err, "skipping unreadable lock record");
                }
            }
        }
        debug!(dir = %dir.display(), loaded, "opened protection store");

        Ok(Self {
            dir: dir.to_path_buf(),
            index: RwLock::new(index),
        })
    }

    /// Number of locks currently stored.
    pub fn len(&self) -> usize {
        self.index.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store holds no locks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record_path(&self, id: LockId) -> PathBuf {
        self.dir.join(format!("{}.json", id.0.simple()))
    }

    fn read_record(path: &Path) -> StoreResult<Lock> {
        let file = File::open(path)?;
        let lock = serde_json::from_reader(BufReader::new(file))?;
        Ok(lock)
    }

    /// Serialize to a temp file in the same directory, then rename into
    /// place so a crash never leaves a half-written record.
    fn write_record(&self, lock: &Lock) -> StoreResult<()> {
        let final_path = self.record_path(lock.id);
        let tmp_path = self.dir.join(format!(".{}.tmp", lock.id.0.simple()));
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, lock)?;
            writer.flush()?;
        }
        fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    fn remove_record(&self, id: LockId) -> StoreResult<()> {
        let path = self.record_path(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::Io(err)),
        }
    }
}

impl ProtectionStore for FileProtectionStore {
    fn get(&self, pos: &BlockPos) -> StoreResult<Option<Lock>> {
        let index = self.index.read().expect("lock poisoned");
        Ok(index.get(pos).cloned())
    }

    fn get_by_id(&self, id: LockId) -> StoreResult<Option<Lock>> {
        let index = self.index.read().expect("lock poisoned");
        Ok(index.get_by_id(id).cloned())
    }

    fn put(&self, lock: &Lock, expected_version: u64) -> StoreResult<Lock> {
        let mut index = self.index.write().expect("lock poisoned");
        index.validate_put(lock, expected_version)?;
        let mut stored = lock.clone();
        stored.version = expected_version + 1;
        self.write_record(&stored)?;
        index.commit_put(stored.clone());
        Ok(stored)
    }

    fn delete(&self, id: LockId, expected_version: u64) -> StoreResult<()> {
        let mut index = self.index.write().expect("lock poisoned");
        index.validate_delete(id, expected_version)?;
        self.remove_record(id)?;
        index.commit_delete(id);
        Ok(())
    }

    fn scan(&self, bounds: &AreaBounds) -> StoreResult<Scan> {
        let index = self.index.read().expect("lock poisoned");
        Ok(Scan::from_snapshot(index.snapshot(bounds)))
    }
}

impl std::fmt::Debug for FileProtectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileProtectionStore")
            .field("dir", &self.dir)
            .field("lock_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ward_types::{LockType, PermissionLevel, PlayerId, Principal};

    fn pos(x: i32) -> BlockPos {
        BlockPos::new("world", x, 64, 0)
    }

    fn new_lock(x: i32) -> Lock {
        Lock::new(
            Principal::player(PlayerId::random(), "alice"),
            LockType::Private,
            pos(x),
        )
    }

    #[test]
    fn put_then_reopen_recovers_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut lock = new_lock(0);
        lock.add_location(pos(1));
        lock.grant(
            Principal::player(PlayerId::random(), "bob"),
            PermissionLevel::Use,
        );
        let stored = {
            let store = FileProtectionStore::open(dir.path()).unwrap();
            store.put(&lock, 0).unwrap()
        };

        let reopened = FileProtectionStore::open(dir.path()).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get(&pos(0)).unwrap(), Some(stored.clone()));
        assert_eq!(reopened.get(&pos(1)).unwrap(), Some(stored));
    }

    #[test]
    fn delete_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileProtectionStore::open(dir.path()).unwrap();
        let stored = store.put(&new_lock(0), 0).unwrap();
        store.delete(stored.id, stored.version).unwrap();
        drop(store);

        let reopened = FileProtectionStore::open(dir.path()).unwrap();
        assert!(reopened.is_empty());
    }

    #[test]
    fn corrupt_record_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileProtectionStore::open(dir.path()).unwrap();
            store.put(&new_lock(0), 0).unwrap();
        }
        fs::write(dir.path().join("garbage.json"), b"{not json").unwrap();

        let reopened = FileProtectionStore::open(dir.path()).unwrap();
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn colliding_records_keep_only_the_first() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileProtectionStore::open(dir.path()).unwrap();
            store.put(&new_lock(0), 0).unwrap();
        }
        // Write a second record claiming the same position, by hand.
        let rogue = new_lock(0);
        fs::write(
            dir.path().join(format!("{}.json", rogue.id.0.simple())),
            serde_json::to_vec(&rogue).unwrap(),
        )
        .unwrap();

        let reopened = FileProtectionStore::open(dir.path()).unwrap();
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn version_conflicts_leave_the_directory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileProtectionStore::open(dir.path()).unwrap();
        let stored = store.put(&new_lock(0), 0).unwrap();
        assert!(store.put(&stored, 99).is_err());
        drop(store);

        let reopened = FileProtectionStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(&pos(0)).unwrap().unwrap().version, 1);
    }

    #[test]
    fn non_json_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("README.txt"), b"not a record").unwrap();
        let store = FileProtectionStore::open(dir.path()).unwrap();
        assert!(store.is_empty());
    }
}
