//! Deduplication of concurrent caching tasks.
//!
//! At most one caching task runs per [`ArtifactKey`]. A caller that loses the
//! race does nothing: it is neither queued nor retried.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use pullcache_core::ArtifactKey;

/// Set of artifact keys with an active caching task.
///
/// The lock is held only for the test-and-set or the clear, never across I/O.
#[derive(Debug, Default)]
pub struct InflightRegistry {
    active: Mutex<HashMap<ArtifactKey, Instant>>,
}

impl InflightRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` active unless it already is.
    ///
    /// Returns true if the caller now owns the key.
    pub fn try_acquire(&self, key: &ArtifactKey) -> bool {
        let mut active = self.active.lock();
        if active.contains_key(key) {
            return false;
        }
        active.insert(key.clone(), Instant::now());
        true
    }

    /// Clears `key` unconditionally.
    pub fn release(&self, key: &ArtifactKey) {
        self.active.lock().remove(key);
    }

    /// Returns true if a task currently owns `key`.
    #[must_use]
    pub fn is_active(&self, key: &ArtifactKey) -> bool {
        self.active.lock().contains_key(key)
    }

    /// Number of active keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.lock().len()
    }

    /// Returns true if no key is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.lock().is_empty()
    }

    /// Acquires `key`, returning a guard that releases it on drop.
    ///
    /// Returns `None` if another task owns the key.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use pullcache_core::ArtifactKey;
    /// use pullcache_proxy::InflightRegistry;
    ///
    /// let registry = Arc::new(InflightRegistry::new());
    /// let key = ArtifactKey::new("lib/x", "1.0");
    ///
    /// let guard = InflightRegistry::lock(&registry, key.clone()).unwrap();
    /// assert!(InflightRegistry::lock(&registry, key.clone()).is_none());
    /// drop(guard);
    /// assert!(!registry.is_active(&key));
    /// ```
    #[must_use]
    pub fn lock(this: &Arc<Self>, key: ArtifactKey) -> Option<InflightGuard> {
        this.try_acquire(&key).then(|| InflightGuard {
            registry: Arc::clone(this),
            key,
        })
    }
}

/// Ownership of one active key. Dropping it releases the key.
#[derive(Debug)]
pub struct InflightGuard {
    registry: Arc<InflightRegistry>,
    key: ArtifactKey,
}

impl InflightGuard {
    /// The owned key.
    #[must_use]
    pub const fn key(&self) -> &ArtifactKey {
        &self.key
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.registry.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails() {
        let registry = InflightRegistry::new();
        let key = ArtifactKey::new("lib/x", "1.0");

        assert!(registry.try_acquire(&key));
        assert!(!registry.try_acquire(&key));
        assert!(registry.is_active(&key));

        registry.release(&key);
        assert!(!registry.is_active(&key));
        assert!(registry.try_acquire(&key));
    }

    #[test]
    fn test_different_tags_do_not_collide() {
        let registry = InflightRegistry::new();
        assert!(registry.try_acquire(&ArtifactKey::new("lib/x", "1.0")));
        assert!(registry.try_acquire(&ArtifactKey::new("lib/x", "1.1")));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_release_of_unknown_key_is_noop() {
        let registry = InflightRegistry::new();
        registry.release(&ArtifactKey::new("lib/x", "1.0"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let registry = Arc::new(InflightRegistry::new());
        let key = ArtifactKey::new("lib/x", "latest");
        {
            let guard = InflightRegistry::lock(&registry, key.clone()).unwrap();
            assert_eq!(guard.key(), &key);
            assert!(registry.is_active(&key));
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_acquire_has_single_winner() {
        let registry = Arc::new(InflightRegistry::new());
        let key = ArtifactKey::new("lib/race", "1.0");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let key = key.clone();
                std::thread::spawn(move || registry.try_acquire(&key))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
