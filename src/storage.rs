use std::collections::HashMap;

use crate::core::{events::ChangeEvent, ranking::RankedUser};

pub const DEFAULT_PP_CHANGE_THRESHOLD: f64 = 1.0;

/// Last known snapshot of every player seen on the ranking.
///
/// Owned by the watcher, which is its only writer. Nothing is persisted: the cache fills
/// itself again during the first cycle after a restart.
#[derive(Debug)]
pub struct MemoryCache {
    threshold: f64,
    users: HashMap<u64, RankedUser>,
}

impl MemoryCache {
    pub fn new(threshold: f64) -> MemoryCache {
        MemoryCache {
            threshold,
            users: HashMap::new(),
        }
    }

    /// Records `user` as the latest sighting of its id and reports a notable pp change.
    ///
    /// A first sighting never reports anything. The stored baseline always moves to `user`,
    /// so changes are measured sighting to sighting.
    pub fn observe(&mut self, user: RankedUser) -> Option<ChangeEvent> {
        let previous = self.users.insert(user.id, user.clone())?;

        let delta = user.pp - previous.pp;
        match delta.abs() >= self.threshold {
            true => Some(ChangeEvent::between(previous, user)),
            false => None,
        }
    }

    pub fn get(&self, id: u64) -> Option<&RankedUser> {
        self.users.get(&id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        MemoryCache::new(DEFAULT_PP_CHANGE_THRESHOLD)
    }
}
