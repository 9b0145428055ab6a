//! Level lifecycle notifications.

use levelhost_common::Dimension;
use parking_lot::RwLock;
use std::sync::Arc;

/// Something that happened to a level in a registry or pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelEvent {
    /// Fully initialized (and lit, when enabled) and now visible to callers.
    Created { name: String, dimension: Dimension },
    /// Closed by `remove_level`. `was_registered` is false when the level
    /// was not in the mapping at the time.
    Removed { name: String, was_registered: bool },
}

type Subscriber = Box<dyn Fn(&LevelEvent) + Send + Sync>;

/// Shared list of event callbacks. Clones notify the same subscribers, so a
/// handle can be wired up before the registry or pool that fires it exists.
#[derive(Clone, Default)]
pub struct Subscribers {
    list: Arc<RwLock<Vec<Subscriber>>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: impl Fn(&LevelEvent) + Send + Sync + 'static) {
        self.list.write().push(Box::new(callback));
    }

    pub fn notify(&self, event: &LevelEvent) {
        for subscriber in self.list.read().iter() {
            subscriber(event);
        }
    }

    pub fn len(&self) -> usize {
        self.list.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.read().is_empty()
    }
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers").field("count", &self.len()).finish()
    }
}
