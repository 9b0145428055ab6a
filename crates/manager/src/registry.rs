use crate::builder::LevelBuilder;
use crate::dimension::derive_dimension;
use crate::error::ManagerError;
use crate::events::{LevelEvent, Subscribers};
use dashmap::DashMap;
use levelhost_common::{Dimension, EntityId, level_key};
use levelhost_kernel::Level;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Name-keyed registry that builds levels on first request.
///
/// Lookups are case-insensitive. Concurrent first requests for one name are
/// single-flight: one caller builds, the rest wait on a per-name lock and
/// receive the same level. Builds for different names run in parallel.
/// A level enters the mapping only once it is fully initialized and lit.
pub struct LevelManager {
    builder: LevelBuilder,
    levels: RwLock<HashMap<String, Arc<Level>>>,
    building: DashMap<String, Arc<Mutex<()>>>,
    events: Subscribers,
    span: tracing::Span,
}

impl LevelManager {
    pub fn new(builder: LevelBuilder) -> Self {
        Self {
            builder,
            levels: RwLock::new(HashMap::new()),
            building: DashMap::new(),
            events: Subscribers::new(),
            span: tracing::info_span!("level_manager"),
        }
    }

    /// Log under `span` instead of the registry's own.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_events(mut self, events: Subscribers) -> Self {
        self.events = events;
        self
    }

    pub fn subscribe(&self, callback: impl Fn(&LevelEvent) + Send + Sync + 'static) {
        self.events.subscribe(callback);
    }

    pub fn builder(&self) -> &LevelBuilder {
        &self.builder
    }

    /// Look up a registered level without building it.
    pub fn find(&self, name: &str) -> Option<Arc<Level>> {
        self.levels.read().get(&level_key(name)).cloned()
    }

    /// Return the level registered under `name`, building it with the
    /// configured provider if absent.
    pub fn get_level(&self, requester: EntityId, name: &str) -> Result<Arc<Level>, ManagerError> {
        let _enter = self.span.enter();
        let key = level_key(name);
        if let Some(level) = self.find(&key) {
            return Ok(level);
        }

        let flight = Arc::clone(&self.building.entry(key.clone()).or_default());
        let result = {
            let _guard = flight.lock();
            self.build_once(requester, name, &key)
        };
        drop(flight);
        // the map holds the last reference once no other request waits
        self.building.remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    /// Build and register `name`. Caller holds the per-name build lock.
    fn build_once(&self, requester: EntityId, name: &str, key: &str) -> Result<Arc<Level>, ManagerError> {
        if let Some(level) = self.find(key) {
            tracing::debug!(level = name, "built by a concurrent request");
            return Ok(level);
        }

        let tag = self.builder.provider_tag();
        let provider = self.builder.factory().create(&tag, name)?;
        let level = self.builder.create_level(name, Some(provider))?;
        self.levels.write().insert(key.to_string(), Arc::clone(&level));
        tracing::info!(%requester, level = name, provider = %tag, "level created");
        self.events.notify(&LevelEvent::Created {
            name: level.name().to_string(),
            dimension: level.dimension(),
        });
        Ok(level)
    }

    /// Names with a build lock currently held or awaited.
    pub fn pending_builds(&self) -> usize {
        self.building.len()
    }

    /// Drop `level` from the mapping (if it is the registered instance) and
    /// close it. Closing an already-closed level is a no-op.
    pub fn remove_level(&self, level: &Arc<Level>) -> Result<(), ManagerError> {
        let _enter = self.span.enter();
        let was_registered = {
            let mut levels = self.levels.write();
            match levels.get(level.key()) {
                Some(existing) if Arc::ptr_eq(existing, level) => {
                    levels.remove(level.key());
                    true
                }
                _ => false,
            }
        };
        level.close()?;
        tracing::info!(level = %level.name(), was_registered, "level removed");
        self.events.notify(&LevelEvent::Removed {
            name: level.name().to_string(),
            was_registered,
        });
        Ok(())
    }

    /// Derive a secondary dimension of `level`. See [`derive_dimension`].
    pub fn get_dimension(
        &self,
        level: &Level,
        dimension: Dimension,
    ) -> Result<Option<Arc<Level>>, ManagerError> {
        let _enter = self.span.enter();
        derive_dimension(&self.builder, level, dimension)
    }

    /// Registered primary level of a derived dimension.
    pub fn primary_of(&self, level: &Level) -> Option<Arc<Level>> {
        level.primary().and_then(|key| self.find(key))
    }

    pub fn levels(&self) -> Vec<Arc<Level>> {
        self.levels.read().values().cloned().collect()
    }

    /// Registered names, sorted.
    pub fn level_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .levels
            .read()
            .values()
            .map(|level| level.name().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.levels.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.read().is_empty()
    }

    /// Remove and close every registered level. Returns how many were closed.
    pub fn shutdown(&self) -> Result<usize, ManagerError> {
        let _enter = self.span.enter();
        let levels: Vec<Arc<Level>> = self.levels.write().drain().map(|(_, l)| l).collect();
        let mut closed = 0;
        for level in &levels {
            if level.close()? {
                closed += 1;
            }
            self.events.notify(&LevelEvent::Removed {
                name: level.name().to_string(),
                was_registered: true,
            });
        }
        tracing::info!(closed, "level manager shut down");
        Ok(closed)
    }
}

impl std::fmt::Debug for LevelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelManager")
            .field("levels", &self.level_names())
            .field("events", &self.events)
            .finish()
    }
}
