use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::types::ActorId;

/// Keyed expiry-timestamp store with a global scope and a per-actor scope.
///
/// Expired entries are evicted lazily when read; there is no sweeper task.
/// Interior locking keeps it safe to share across the chat worker tasks
/// without holding the server state lock.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    global: Mutex<HashMap<String, u64>>,
    per_actor: Mutex<HashMap<String, HashMap<ActorId, u64>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on_global_cooldown(&self, key: &str, now_ms: u64) -> bool {
        let mut global = lock(&self.global);
        let Some(expires_at) = global.get(key).copied() else {
            return false;
        };
        if now_ms >= expires_at {
            global.remove(key);
            return false;
        }
        true
    }

    pub fn is_on_actor_cooldown(&self, actor: &ActorId, key: &str, now_ms: u64) -> bool {
        let mut per_actor = lock(&self.per_actor);
        let Some(actor_map) = per_actor.get_mut(key) else {
            return false;
        };
        let Some(expires_at) = actor_map.get(actor).copied() else {
            return false;
        };
        if now_ms >= expires_at {
            actor_map.remove(actor);
            if actor_map.is_empty() {
                per_actor.remove(key);
            }
            return false;
        }
        true
    }

    pub fn set_global_cooldown(&self, key: &str, seconds: u64, now_ms: u64) {
        let expires_at = now_ms + seconds * 1_000;
        lock(&self.global).insert(key.to_string(), expires_at);
    }

    pub fn set_actor_cooldown(&self, actor: &ActorId, key: &str, seconds: u64, now_ms: u64) {
        let expires_at = now_ms + seconds * 1_000;
        lock(&self.per_actor)
            .entry(key.to_string())
            .or_default()
            .insert(actor.clone(), expires_at);
    }

    pub fn clear_all(&self) {
        lock(&self.global).clear();
        lock(&self.per_actor).clear();
    }

    #[cfg(test)]
    fn global_entry_count(&self) -> usize {
        lock(&self.global).len()
    }

    #[cfg(test)]
    fn actor_key_count(&self) -> usize {
        lock(&self.per_actor).len()
    }
}
