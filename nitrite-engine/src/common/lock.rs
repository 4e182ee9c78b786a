use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;
use std::sync::Arc;

/// A named lock handed out by [`LockRegistry`].
pub struct LockHandle {
    lock: Arc<RwLock<()>>,
}

impl LockHandle {
    pub fn read(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write()
    }
}

/// One lock per name, used for index maps and collections. Holders of
/// different names never contend.
#[derive(Clone, Default)]
pub struct LockRegistry {
    locks: Arc<RwLock<HashMap<String, Arc<RwLock<()>>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_lock(&self, name: &str) -> LockHandle {
        if let Some(lock) = self.locks.read().get(name) {
            return LockHandle { lock: lock.clone() };
        }

        let lock = self
            .locks
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone();
        LockHandle { lock }
    }

    pub fn remove_lock(&self, name: &str) -> bool {
        self.locks.write().remove(name).is_some()
    }

    pub fn lock_count(&self) -> usize {
        self.locks.read().len()
    }
}
