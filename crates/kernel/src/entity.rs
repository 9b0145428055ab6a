use dashmap::DashMap;
use glam::Vec3;
use levelhost_common::{EntityId, LevelId};
use std::sync::atomic::{AtomicU64, Ordering};

/// What the entity service knows about one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    /// Instance the entity lives in.
    pub level: LevelId,
    pub kind: String,
    pub position: Vec3,
}

/// Entity-registration service shared by every level of a registry or pool.
///
/// Registration may happen concurrently from independent level builds; the
/// backing map is sharded so those builds never serialize on one lock.
/// Ownership is per level instance, never per level name.
#[derive(Debug, Default)]
pub struct EntityManager {
    entities: DashMap<EntityId, EntityRecord>,
    registered_total: AtomicU64,
}

impl EntityManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, level: LevelId, kind: &str, position: Vec3) -> EntityId {
        let id = EntityId::new();
        self.entities.insert(
            id,
            EntityRecord {
                level,
                kind: kind.to_string(),
                position,
            },
        );
        self.registered_total.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(%id, %level, kind, "entity registered");
        id
    }

    pub fn unregister(&self, id: EntityId) -> Option<EntityRecord> {
        self.entities.remove(&id).map(|(_, record)| record)
    }

    /// Remove `id` only if it belongs to `level`.
    pub fn unregister_in(&self, level: LevelId, id: EntityId) -> Option<EntityRecord> {
        self.entities
            .remove_if(&id, |_, record| record.level == level)
            .map(|(_, record)| record)
    }

    /// Drop every entity of a level. Returns how many were removed.
    pub fn unregister_level(&self, level: LevelId) -> usize {
        let before = self.entities.len();
        self.entities.retain(|_, record| record.level != level);
        before.saturating_sub(self.entities.len())
    }

    pub fn get(&self, id: EntityId) -> Option<EntityRecord> {
        self.entities.get(&id).map(|r| r.value().clone())
    }

    pub fn count_in(&self, level: LevelId) -> usize {
        self.entities.iter().filter(|r| r.level == level).count()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Registrations since creation, including entities since removed.
    pub fn registered_total(&self) -> u64 {
        self.registered_total.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn register_and_unregister() {
        let entities = EntityManager::new();
        let id = entities.register(LevelId::new(), "player", Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(entities.len(), 1);
        assert_eq!(entities.get(id).unwrap().kind, "player");
        assert!(entities.unregister(id).is_some());
        assert!(entities.is_empty());
        assert_eq!(entities.registered_total(), 1);
    }

    #[test]
    fn unregister_level_only_touches_that_level() {
        let entities = EntityManager::new();
        let (a, b) = (LevelId::new(), LevelId::new());
        entities.register(a, "player", Vec3::ZERO);
        entities.register(a, "item", Vec3::ZERO);
        entities.register(b, "player", Vec3::ZERO);
        assert_eq!(entities.unregister_level(a), 2);
        assert_eq!(entities.count_in(b), 1);
        assert_eq!(entities.count_in(a), 0);
    }

    #[test]
    fn unregister_in_checks_ownership() {
        let entities = EntityManager::new();
        let (a, b) = (LevelId::new(), LevelId::new());
        let id = entities.register(a, "pig", Vec3::ZERO);
        assert!(entities.unregister_in(b, id).is_none());
        assert_eq!(entities.unregister_in(a, id).map(|r| r.level), Some(a));
        assert!(entities.is_empty());
    }

    #[test]
    fn concurrent_registration_keeps_every_entity() {
        let entities = Arc::new(EntityManager::new());
        let levels: Vec<LevelId> = (0..8).map(|_| LevelId::new()).collect();
        std::thread::scope(|s| {
            for &level in &levels {
                let entities = Arc::clone(&entities);
                s.spawn(move || {
                    for _ in 0..250 {
                        entities.register(level, "mob", Vec3::ZERO);
                    }
                });
            }
        });
        assert_eq!(entities.len(), 2000);
        assert_eq!(entities.count_in(levels[3]), 250);
    }
}
