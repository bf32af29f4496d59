//! Generic entity registry.
//!
//! Every level of the cluster tree (clusters, namespaces, apps, pods) keeps its
//! children in an [`EntityManager`]: a map of live entities plus an
//! append-only history of removed ones, both keyed by UID.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
struct Maps<E> {
    present: HashMap<String, E>,
    removed: HashMap<String, Vec<E>>,
}

impl<E> Default for Maps<E> {
    fn default() -> Self {
        Self {
            present: HashMap::new(),
            removed: HashMap::new(),
        }
    }
}

/// Present/removed bookkeeping for one kind of entity.
///
/// All accessors take `&self`; the maps sit behind an internal `RwLock` and
/// are only ever handed out as owned snapshots.
#[derive(Debug)]
pub struct EntityManager<E> {
    maps: RwLock<Maps<E>>,
}

impl<E> Default for EntityManager<E> {
    fn default() -> Self {
        Self {
            maps: RwLock::new(Maps::default()),
        }
    }
}

impl<E: Clone> EntityManager<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a manager from existing maps.
    pub fn with_maps(present: HashMap<String, E>, removed: HashMap<String, Vec<E>>) -> Self {
        Self {
            maps: RwLock::new(Maps { present, removed }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Maps<E>> {
        self.maps.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Maps<E>> {
        self.maps.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, uid: &str) -> Option<E> {
        self.read().present.get(uid).cloned()
    }

    /// Insert or overwrite the live entity for `uid`.
    pub fn set(&self, uid: impl Into<String>, entity: E) {
        self.write().present.insert(uid.into(), entity);
    }

    /// Drop the live entity without recording it in the history.
    pub fn delete(&self, uid: &str) {
        self.write().present.remove(uid);
    }

    /// Move the live entity for `uid` into the removed history.
    /// Returns false (and changes nothing) when `uid` is not present.
    pub fn remove(&self, uid: &str) -> bool {
        let mut maps = self.write();
        match maps.present.remove(uid) {
            Some(entity) => {
                maps.removed.entry(uid.to_string()).or_default().push(entity);
                true
            }
            None => false,
        }
    }

    pub fn is_present(&self, uid: &str) -> bool {
        self.read().present.contains_key(uid)
    }

    pub fn is_removed(&self, uid: &str) -> bool {
        self.read().removed.contains_key(uid)
    }

    pub fn is_recorded(&self, uid: &str) -> bool {
        let maps = self.read();
        maps.present.contains_key(uid) || maps.removed.contains_key(uid)
    }

    pub fn present_map(&self) -> HashMap<String, E> {
        self.read().present.clone()
    }

    pub fn removed_map(&self) -> HashMap<String, Vec<E>> {
        self.read().removed.clone()
    }

    /// Removal history for one UID, oldest first.
    pub fn removed(&self, uid: &str) -> Vec<E> {
        self.read().removed.get(uid).cloned().unwrap_or_default()
    }

    /// UIDs of live entities, sorted.
    pub fn uids(&self) -> Vec<String> {
        let mut uids: Vec<String> = self.read().present.keys().cloned().collect();
        uids.sort();
        uids
    }

    pub fn len(&self) -> usize {
        self.read().present.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().present.is_empty()
    }

    /// Return the live entity for `uid`, creating it under the write lock if
    /// absent. The bool is true when a new entity was inserted.
    pub fn get_or_insert_with(&self, uid: &str, make: impl FnOnce() -> E) -> (E, bool) {
        let mut maps = self.write();
        if let Some(existing) = maps.present.get(uid) {
            return (existing.clone(), false);
        }
        let entity = make();
        maps.present.insert(uid.to_string(), entity.clone());
        (entity, true)
    }
}
