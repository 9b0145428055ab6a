use crate::builder::LevelBuilder;
use crate::dimension::derive_dimension;
use crate::error::ManagerError;
use crate::events::{LevelEvent, Subscribers};
use levelhost_common::{Dimension, EntityId};
use levelhost_kernel::Level;
use rand::Rng;
use rayon::prelude::*;
use std::sync::Arc;

/// Fixed set of pre-built levels that requests are spread across.
///
/// All members are built in parallel at construction; `get_level` ignores
/// the requested name and hands out a uniformly random member. Membership
/// never changes: `remove_level` only closes the level.
pub struct LevelPool {
    builder: LevelBuilder,
    levels: Vec<Arc<Level>>,
    events: Subscribers,
}

impl LevelPool {
    pub const DEFAULT_PREFIX: &'static str = "Default";

    pub fn new(builder: LevelBuilder, size: usize) -> Result<Self, ManagerError> {
        Self::build(builder, size, Self::DEFAULT_PREFIX, Subscribers::new())
    }

    /// Build `size` levels named `<prefix>0..<prefix>{size-1}`. If any build
    /// fails, the ones that succeeded are closed and the first error returned.
    pub fn build(
        builder: LevelBuilder,
        size: usize,
        prefix: &str,
        events: Subscribers,
    ) -> Result<Self, ManagerError> {
        if size == 0 {
            return Err(ManagerError::EmptyPool);
        }
        let _span = tracing::info_span!("level_pool_build", size, prefix).entered();

        let results: Vec<Result<Arc<Level>, ManagerError>> = (0..size)
            .into_par_iter()
            .map(|i| builder.create_level(&format!("{prefix}{i}"), None))
            .collect();

        let mut levels = Vec::with_capacity(size);
        let mut failure = None;
        for result in results {
            match result {
                Ok(level) => levels.push(level),
                Err(e) if failure.is_none() => failure = Some(e),
                Err(e) => tracing::warn!(error = %e, "additional pool build failure"),
            }
        }
        if let Some(e) = failure {
            for level in &levels {
                if let Err(close) = level.close() {
                    tracing::warn!(level = %level.name(), error = %close, "close after failed pool build");
                }
            }
            return Err(e);
        }

        for level in &levels {
            events.notify(&LevelEvent::Created {
                name: level.name().to_string(),
                dimension: level.dimension(),
            });
        }
        tracing::info!(levels = levels.len(), "level pool ready");
        Ok(Self {
            builder,
            levels,
            events,
        })
    }

    /// A uniformly random member. `name` is accepted for interface parity
    /// and ignored.
    pub fn get_level(&self, requester: EntityId, name: &str) -> Result<Arc<Level>, ManagerError> {
        if self.levels.is_empty() {
            return Err(ManagerError::EmptyPool);
        }
        let index = rand::rng().random_range(0..self.levels.len());
        let level = Arc::clone(&self.levels[index]);
        tracing::trace!(%requester, requested = name, level = %level.name(), "pool level assigned");
        Ok(level)
    }

    /// Close `level`. Membership is unchanged, so a closed member can still
    /// be handed out afterwards.
    pub fn remove_level(&self, level: &Arc<Level>) -> Result<(), ManagerError> {
        let member = self.levels.iter().any(|l| Arc::ptr_eq(l, level));
        level.close()?;
        tracing::info!(level = %level.name(), member, "pool level closed");
        self.events.notify(&LevelEvent::Removed {
            name: level.name().to_string(),
            was_registered: member,
        });
        Ok(())
    }

    pub fn get_dimension(
        &self,
        level: &Level,
        dimension: Dimension,
    ) -> Result<Option<Arc<Level>>, ManagerError> {
        derive_dimension(&self.builder, level, dimension)
    }

    pub fn levels(&self) -> &[Arc<Level>] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn builder(&self) -> &LevelBuilder {
        &self.builder
    }

    pub fn subscribe(&self, callback: impl Fn(&LevelEvent) + Send + Sync + 'static) {
        self.events.subscribe(callback);
    }
}

impl std::fmt::Debug for LevelPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.levels.iter().map(|l| l.name()).collect();
        f.debug_struct("LevelPool").field("levels", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, keys};
    use parking_lot::Mutex;

    fn builder(dir: &std::path::Path) -> LevelBuilder {
        LevelBuilder::new(Arc::new(
            Config::new()
                .with(keys::WORLD_FOLDER, dir.display())
                .with(keys::VIEW_DISTANCE, 0),
        ))
    }

    #[test]
    fn members_are_named_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let pool = LevelPool::new(builder(tmp.path()), 3).unwrap();
        let names: Vec<&str> = pool.levels().iter().map(|l| l.name()).collect();
        assert_eq!(names, ["Default0", "Default1", "Default2"]);
        assert!(pool.levels().iter().all(|l| l.is_initialized()));
    }

    #[test]
    fn zero_size_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            LevelPool::new(builder(tmp.path()), 0),
            Err(ManagerError::EmptyPool)
        ));
    }

    #[test]
    fn get_level_returns_a_member_regardless_of_name() {
        let tmp = tempfile::tempdir().unwrap();
        let pool = LevelPool::new(builder(tmp.path()), 2).unwrap();
        for name in ["anything", "", "Default0"] {
            let level = pool.get_level(EntityId::new(), name).unwrap();
            assert!(pool.levels().iter().any(|l| Arc::ptr_eq(l, &level)));
        }
    }

    #[test]
    fn remove_closes_but_keeps_membership() {
        let tmp = tempfile::tempdir().unwrap();
        let pool = LevelPool::new(builder(tmp.path()), 1).unwrap();
        let level = pool.get_level(EntityId::new(), "x").unwrap();
        pool.remove_level(&level).unwrap();
        assert!(level.is_closed());
        assert_eq!(pool.len(), 1);
        let again = pool.get_level(EntityId::new(), "x").unwrap();
        assert!(Arc::ptr_eq(&again, &level));
    }

    #[test]
    fn creation_events_fire_after_build() {
        let tmp = tempfile::tempdir().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let events = Subscribers::new();
        let sink = Arc::clone(&seen);
        events.subscribe(move |event| {
            if let LevelEvent::Created { name, .. } = event {
                sink.lock().push(name.clone());
            }
        });
        let pool = LevelPool::build(builder(tmp.path()), 2, "Arena", events).unwrap();
        assert_eq!(*seen.lock(), vec!["Arena0".to_string(), "Arena1".to_string()]);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn failed_member_fails_the_pool() {
        let tmp = tempfile::tempdir().unwrap();
        let broken = tmp.path().join("broken1");
        std::fs::create_dir_all(&broken).unwrap();
        std::fs::write(broken.join("level.meta.json"), b"{ not json").unwrap();
        let result = LevelPool::build(builder(tmp.path()), 3, "Broken", Subscribers::new());
        assert!(matches!(result, Err(ManagerError::Store(_))));
    }
}
