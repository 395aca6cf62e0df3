//! Multi-source object search.
//!
//! Search order: loose objects, then packs newest first. Loose wins over
//! packed copies of the same id because a loose copy may be newer, e.g.
//! mid-repack.

use quarry_hash::ObjectId;
use quarry_object::RawObject;

use crate::{ObjectInfo, ObjectStore, StoreError};

/// Find an object by id, searching all sources in order.
///
/// A pack that does not hold the id is skipped; a pack that holds it but
/// cannot decode it is an error.
pub(crate) fn find_object(
    store: &ObjectStore,
    oid: &ObjectId,
) -> Result<Option<RawObject>, StoreError> {
    if let Some(obj) = store.loose.read(oid)? {
        return Ok(Some(obj));
    }

    let packs = store.packs.read().unwrap();
    for pack in packs.iter() {
        // REF-delta bases can live outside this pack: in the loose store
        // or in one of the other packs.
        let resolver = |base_oid: &ObjectId| -> Option<RawObject> {
            if let Ok(Some(obj)) = store.loose.read(base_oid) {
                return Some(obj);
            }
            for other_pack in packs.iter() {
                if std::ptr::eq(other_pack, pack) {
                    continue;
                }
                if let Ok(Some(obj)) = other_pack.read_object(base_oid) {
                    return Some(obj);
                }
            }
            None
        };
        if let Some(obj) = pack.read_object_with_resolver(oid, resolver)? {
            return Ok(Some(obj));
        }
    }

    Ok(None)
}

/// Find an object's type and size, searching all sources in order.
///
/// The loose store answers from the header alone; packed objects go
/// through a full read since the entry header only gives the size of the
/// delta, not of the reconstructed object.
pub(crate) fn find_header(
    store: &ObjectStore,
    oid: &ObjectId,
) -> Result<Option<ObjectInfo>, StoreError> {
    if let Some((obj_type, size)) = store.loose.read_header(oid)? {
        return Ok(Some(ObjectInfo { obj_type, size }));
    }

    Ok(find_object(store, oid)?.map(|obj| ObjectInfo {
        obj_type: obj.obj_type,
        size: obj.data.len(),
    }))
}

/// Check if any source holds the id. Index lookups only.
pub(crate) fn object_exists(store: &ObjectStore, oid: &ObjectId) -> bool {
    if store.loose.contains(oid) {
        return true;
    }

    let packs = store.packs.read().unwrap();
    packs.iter().any(|pack| pack.contains(oid))
}
