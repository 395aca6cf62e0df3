//! Unified read-only object store.
//!
//! Provides a single interface over the two places an object can live:
//! the loose object directory and the packfiles under `objects/pack/`.
//! Higher layers ask for an id and get bytes back without caring which
//! storage holds them.

mod search;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use quarry_hash::ObjectId;
use quarry_loose::LooseObjectStore;
use quarry_object::cache::ObjectCache;
use quarry_object::{ObjectType, RawObject};
use quarry_pack::pack::PackFile;

pub use error::StoreError;

mod error {
    use quarry_hash::ObjectId;

    #[derive(Debug, thiserror::Error)]
    pub enum StoreError {
        #[error("object not found: {0}")]
        NotFound(ObjectId),

        #[error(transparent)]
        Loose(#[from] quarry_loose::LooseError),

        #[error(transparent)]
        Pack(#[from] quarry_pack::PackError),

        #[error(transparent)]
        Io(#[from] std::io::Error),
    }
}

/// Default capacity of the decoded-object cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Lightweight object info (header only, no content).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub obj_type: ObjectType,
    pub size: usize,
}

/// Read-only object store over loose and packed storage.
pub struct ObjectStore {
    /// Loose object store.
    loose: LooseObjectStore,
    /// Pack files, newest first (protected by RwLock for refresh).
    packs: RwLock<Vec<PackFile>>,
    /// Decoded-object cache.
    cache: Mutex<ObjectCache>,
    /// Path to the objects directory.
    objects_dir: PathBuf,
}

impl ObjectStore {
    /// Open the object store under `repo_root/objects`.
    ///
    /// Packs are discovered once here; call [`refresh`](Self::refresh)
    /// after new packs appear. A pack whose file or index fails to open
    /// is skipped rather than failing the whole store.
    pub fn open(repo_root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let objects_dir = repo_root.as_ref().join("objects");
        let loose = LooseObjectStore::open(&objects_dir);
        let packs = Self::discover_packs(&objects_dir)?;

        Ok(Self {
            loose,
            packs: RwLock::new(packs),
            cache: Mutex::new(ObjectCache::new(DEFAULT_CACHE_CAPACITY)),
            objects_dir,
        })
    }

    /// Read an object by id (searches loose first, then packs).
    ///
    /// `Ok(None)` means no storage holds the id. An object that exists
    /// but cannot be decoded is an error, never `None`.
    pub fn read(&self, oid: &ObjectId) -> Result<Option<RawObject>, StoreError> {
        search::find_object(self, oid)
    }

    /// Read an object that is expected to exist.
    ///
    /// This is the only place absence becomes an error:
    /// [`StoreError::NotFound`].
    pub fn get(&self, oid: &ObjectId) -> Result<RawObject, StoreError> {
        self.read(oid)?.ok_or(StoreError::NotFound(*oid))
    }

    /// Read an object with caching.
    ///
    /// Two threads racing on a cold key may both decode; the second
    /// insert overwrites the first with identical bytes, so the race is
    /// harmless.
    pub fn read_cached(&self, oid: &ObjectId) -> Result<Option<RawObject>, StoreError> {
        {
            let mut cache = self.cache.lock().unwrap();
            if let Some(obj) = cache.get(oid) {
                return Ok(Some(obj.clone()));
            }
        }

        let obj = self.read(oid)?;

        if let Some(ref obj) = obj {
            let mut cache = self.cache.lock().unwrap();
            cache.insert(*oid, obj.clone());
        }

        Ok(obj)
    }

    /// Read just the type and size of an object.
    ///
    /// Loose objects give this up without inflating the body; packed
    /// objects require a full read.
    pub fn read_header(&self, oid: &ObjectId) -> Result<Option<ObjectInfo>, StoreError> {
        search::find_header(self, oid)
    }

    /// Check if an object exists (index lookups only, no decompression).
    pub fn contains(&self, oid: &ObjectId) -> bool {
        search::object_exists(self, oid)
    }

    /// Re-scan the pack directory (call after a repack).
    pub fn refresh(&self) -> Result<(), StoreError> {
        let new_packs = Self::discover_packs(&self.objects_dir)?;
        let mut packs = self.packs.write().unwrap();
        *packs = new_packs;
        Ok(())
    }

    /// Path to the objects directory.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    /// Discover pack files in the objects/pack directory.
    fn discover_packs(objects_dir: &Path) -> Result<Vec<PackFile>, StoreError> {
        let pack_dir = objects_dir.join("pack");
        if !pack_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries: Vec<_> = std::fs::read_dir(&pack_dir)?
            .filter_map(|e| e.ok())
            .collect();

        // Newest first, so recent packs are searched before old ones.
        entries.sort_by(|a, b| {
            let a_time = a.metadata().and_then(|m| m.modified()).ok();
            let b_time = b.metadata().and_then(|m| m.modified()).ok();
            b_time.cmp(&a_time)
        });

        let mut packs = Vec::new();
        for entry in entries {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "pack") {
                match PackFile::open(&path) {
                    Ok(pack) => packs.push(pack),
                    // Skip unreadable packs; their objects may exist elsewhere.
                    Err(_) => continue,
                }
            }
        }

        Ok(packs)
    }
}
