//! LRU cache for decoded objects.
//!
//! Objects are content-addressed and immutable once written, which makes a
//! read-through cache safe: two decodes of the same id always produce the
//! same bytes.

use std::num::NonZeroUsize;

use lru::LruCache;
use quarry_hash::ObjectId;

use crate::RawObject;

/// LRU cache of decoded objects keyed by id.
pub struct ObjectCache {
    cache: LruCache<ObjectId, RawObject>,
}

impl ObjectCache {
    /// Create with the given capacity (number of objects).
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap()),
            ),
        }
    }

    /// Get a cached object (promotes it to most-recently-used).
    pub fn get(&mut self, oid: &ObjectId) -> Option<&RawObject> {
        self.cache.get(oid)
    }

    /// Peek at a cached object without promoting it.
    pub fn peek(&self, oid: &ObjectId) -> Option<&RawObject> {
        self.cache.peek(oid)
    }

    /// Insert an object. Returns the evicted entry if the cache was full.
    pub fn insert(&mut self, oid: ObjectId, obj: RawObject) -> Option<(ObjectId, RawObject)> {
        self.cache.push(oid, obj)
    }

    /// Clear all cached objects.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Current number of cached objects.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Check if an id is cached (without promoting).
    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.cache.contains(oid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObjectType;

    fn make_obj(n: u8) -> (ObjectId, RawObject) {
        let mut bytes = [0u8; 20];
        bytes[0] = n;
        let oid = ObjectId::from(bytes);
        let obj = RawObject::new(ObjectType::Blob, vec![n]);
        (oid, obj)
    }

    #[test]
    fn insert_and_get() {
        let mut cache = ObjectCache::new(10);
        let (oid, obj) = make_obj(1);
        cache.insert(oid, obj.clone());
        assert_eq!(cache.get(&oid), Some(&obj));
    }

    #[test]
    fn cache_miss() {
        let mut cache = ObjectCache::new(10);
        let (oid, _) = make_obj(1);
        assert_eq!(cache.get(&oid), None);
    }

    #[test]
    fn lru_eviction() {
        let mut cache = ObjectCache::new(2);
        let (oid1, obj1) = make_obj(1);
        let (oid2, obj2) = make_obj(2);
        let (oid3, obj3) = make_obj(3);

        cache.insert(oid1, obj1);
        cache.insert(oid2, obj2);
        assert_eq!(cache.len(), 2);

        // Inserting a third evicts oid1 (least recently used).
        cache.insert(oid3, obj3);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&oid1).is_none());
        assert!(cache.get(&oid2).is_some());
        assert!(cache.get(&oid3).is_some());
    }

    #[test]
    fn access_promotes() {
        let mut cache = ObjectCache::new(2);
        let (oid1, obj1) = make_obj(1);
        let (oid2, obj2) = make_obj(2);
        let (oid3, obj3) = make_obj(3);

        cache.insert(oid1, obj1);
        cache.insert(oid2, obj2);

        // Touch oid1 so oid2 becomes the LRU.
        cache.get(&oid1);

        cache.insert(oid3, obj3);
        assert!(cache.get(&oid1).is_some());
        assert!(cache.get(&oid2).is_none());
    }

    #[test]
    fn clear() {
        let mut cache = ObjectCache::new(10);
        let (oid, obj) = make_obj(1);
        cache.insert(oid, obj);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn contains_does_not_promote() {
        let mut cache = ObjectCache::new(2);
        let (oid1, obj1) = make_obj(1);
        let (oid2, obj2) = make_obj(2);
        let (oid3, obj3) = make_obj(3);

        cache.insert(oid1, obj1);
        cache.insert(oid2, obj2);
        assert!(cache.contains(&oid1));

        // contains() must not have promoted oid1, so it is still the LRU.
        cache.insert(oid3, obj3);
        assert!(!cache.contains(&oid1));
    }

    #[test]
    fn zero_capacity_clamps_to_one() {
        let mut cache = ObjectCache::new(0);
        let (oid, obj) = make_obj(1);
        cache.insert(oid, obj.clone());
        assert_eq!(cache.get(&oid), Some(&obj));
    }
}
