//! Per-user override cache.
//!
//! Caches each user's override rows for a short TTL using `DashMap` for
//! lock-free concurrent access. Revocations must take effect promptly, so
//! writers call [`OverrideCache::invalidate`] after every change.
//!
//! Per-user generation counters keep a load that started before an
//! invalidation from writing stale rows back into the cache. A counter only
//! lives in the map while a load for that user is in flight; expired rows
//! are dropped on access and by [`OverrideCache::sweep_expired`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::models::UserPermissionOverride;
use super::source::PermissionSource;

/// Cached rows paired with their load time.
struct CachedOverrides {
    rows: Arc<Vec<UserPermissionOverride>>,
    loaded_at: Instant,
}

/// Thread-safe TTL cache of per-user overrides.
pub struct OverrideCache {
    ttl: Duration,
    entries: DashMap<String, CachedOverrides>,
    /// Per-user generation counters, bumped on invalidation.
    generations: DashMap<String, Arc<AtomicU64>>,
    /// Bumped by `invalidate_all`.
    epoch: AtomicU64,
}

impl OverrideCache {
    /// Create a cache. A zero TTL disables caching.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
            generations: DashMap::new(),
            epoch: AtomicU64::new(0),
        }
    }

    fn user_generation(&self, user_id: &str) -> Arc<AtomicU64> {
        self.generations
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .clone()
    }

    /// Get a user's overrides, loading them from `source` if missing or stale.
    #[tracing::instrument(skip(self, source))]
    pub async fn get_or_load(
        &self,
        source: &dyn PermissionSource,
        user_id: &str,
    ) -> sqlx::Result<Arc<Vec<UserPermissionOverride>>> {
        if self.ttl.is_zero() {
            return source.load_overrides(user_id).await.map(Arc::new);
        }

        // Fast path: fresh entry
        if let Some(entry) = self.entries.get(user_id) {
            if entry.loaded_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&entry.rows));
            }
        }
        self.entries
            .remove_if(user_id, |_, entry| entry.loaded_at.elapsed() >= self.ttl);

        let gen = self.user_generation(user_id);
        let gen_before = gen.load(Ordering::Acquire);
        let epoch_before = self.epoch.load(Ordering::Acquire);

        let loaded = source.load_overrides(user_id).await.map(Arc::new);

        if let Ok(rows) = &loaded {
            // Only insert if nothing was invalidated while loading.
            if gen.load(Ordering::Acquire) == gen_before
                && self.epoch.load(Ordering::Acquire) == epoch_before
            {
                self.entries.insert(
                    user_id.to_string(),
                    CachedOverrides {
                        rows: Arc::clone(rows),
                        loaded_at: Instant::now(),
                    },
                );
                // An invalidation may have landed between the check and the insert.
                if gen.load(Ordering::Acquire) != gen_before
                    || self.epoch.load(Ordering::Acquire) != epoch_before
                {
                    self.entries.remove(user_id);
                }
            } else {
                tracing::debug!(user_id, "Override load raced an invalidation, not caching");
            }
        }

        // Held by the map and this load only: no other load is in flight.
        self.generations
            .remove_if(user_id, |_, g| Arc::strong_count(g) <= 2 && Arc::ptr_eq(g, &gen));

        loaded
    }

    /// Drop a user's cached overrides.
    pub fn invalidate(&self, user_id: &str) {
        if let Some((_, gen)) = self.generations.remove(user_id) {
            gen.fetch_add(1, Ordering::AcqRel);
        }
        self.entries.remove(user_id);
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
        // In-flight loads keep their own handle and still observe the epoch bump.
        self.generations.clear();
    }

    /// Drop entries older than the TTL. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.loaded_at.elapsed() < self.ttl);
        before.saturating_sub(self.entries.len())
    }

    /// Number of cached users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    fn tracked_generations(&self) -> usize {
        self.generations.len()
    }
}
