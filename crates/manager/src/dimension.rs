//! Derives secondary dimensions (nether, the end) from a primary level.

use crate::builder::LevelBuilder;
use crate::error::ManagerError;
use levelhost_common::Dimension;
use levelhost_kernel::Level;
use std::path::Path;
use std::sync::Arc;

/// Name a derived dimension is registered under: `<primary>_<dimension>`.
pub fn dimension_name(primary: &str, dimension: Dimension) -> String {
    format!("{primary}_{}", dimension.as_str())
}

/// Build a fresh level for `dimension` next to `primary`'s stored regions.
///
/// Returns `Ok(None)` when the primary's backend has no data for the
/// dimension. The derived level inherits the primary's rules and entity
/// service, records the primary as its back-reference, and is not cached:
/// every call builds a new one and the caller owns its lifetime.
pub fn derive_dimension(
    builder: &LevelBuilder,
    primary: &Level,
    dimension: Dimension,
) -> Result<Option<Arc<Level>>, ManagerError> {
    if dimension.is_primary() {
        return Err(ManagerError::PrimaryDimension {
            level: primary.name().to_string(),
            dimension,
        });
    }

    let base_path = {
        let world = primary.lock_world();
        if !world.supports(dimension) {
            None
        } else {
            world.base_path().map(Path::to_path_buf)
        }
    };
    let Some(base_path) = base_path else {
        tracing::debug!(level = %primary.name(), %dimension, "dimension not supported");
        return Ok(None);
    };

    let provider = builder.factory().anvil_dimension(&base_path, dimension)?;
    let level = Level::new(
        dimension_name(primary.name(), dimension),
        provider,
        Arc::clone(primary.entities()),
        primary.settings(),
    )
    .with_primary(primary);
    let level = builder.finish(level)?;
    tracing::info!(
        primary = %primary.name(),
        level = %level.name(),
        %dimension,
        "dimension derived"
    );
    Ok(Some(level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, keys};
    use levelhost_common::GameMode;
    use levelhost_kernel::WorldProvider;

    fn builder(dir: &Path, lights: bool) -> LevelBuilder {
        LevelBuilder::new(Arc::new(
            Config::new()
                .with(keys::WORLD_FOLDER, dir.display())
                .with(keys::VIEW_DISTANCE, 1)
                .with(keys::GAME_MODE, "adventure")
                .with(keys::CALCULATE_LIGHTS, lights),
        ))
    }

    #[test]
    fn names_join_primary_and_dimension() {
        assert_eq!(dimension_name("world", Dimension::Nether), "world_nether");
        assert_eq!(dimension_name("world", Dimension::TheEnd), "world_the_end");
    }

    #[test]
    fn overworld_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let builder = builder(tmp.path(), false);
        let primary = builder.create_level("world", None).unwrap();
        let err = derive_dimension(&builder, &primary, Dimension::Overworld).unwrap_err();
        assert!(matches!(err, ManagerError::PrimaryDimension { .. }));
    }

    #[test]
    fn unsupported_dimension_is_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let builder = builder(tmp.path(), false);
        let stored = builder.create_level("world", None).unwrap();
        assert!(derive_dimension(&builder, &stored, Dimension::Nether).unwrap().is_none());

        let generated = builder.create_level("gen", Some(WorldProvider::cool(7))).unwrap();
        assert!(derive_dimension(&builder, &generated, Dimension::TheEnd).unwrap().is_none());
    }

    #[test]
    fn supported_dimension_inherits_from_primary() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("world").join("DIM-1")).unwrap();
        let builder = builder(tmp.path(), true);
        let primary = builder.create_level("World", None).unwrap();

        let nether = derive_dimension(&builder, &primary, Dimension::Nether)
            .unwrap()
            .unwrap();
        assert_eq!(nether.name(), "World_nether");
        assert_eq!(nether.dimension(), Dimension::Nether);
        assert_eq!(nether.primary(), Some(primary.key()));
        assert_eq!(nether.game_mode(), GameMode::Adventure);
        assert!(nether.is_initialized());
        assert_eq!(builder.light_engine().invocations(), 2);
        assert!(Arc::ptr_eq(nether.entities(), primary.entities()));

        assert!(derive_dimension(&builder, &primary, Dimension::TheEnd).unwrap().is_none());
    }

    #[test]
    fn closing_one_derivation_keeps_the_others_entities() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("world").join("DIM-1")).unwrap();
        let builder = builder(tmp.path(), false);
        let primary = builder.create_level("world", None).unwrap();
        let a = derive_dimension(&builder, &primary, Dimension::Nether).unwrap().unwrap();
        let b = derive_dimension(&builder, &primary, Dimension::Nether).unwrap().unwrap();
        primary.add_entity("player", glam::Vec3::ZERO).unwrap();
        a.add_entity("blaze", glam::Vec3::ZERO).unwrap();
        b.add_entity("ghast", glam::Vec3::ZERO).unwrap();
        assert_eq!(a.entity_count(), 1);
        assert_eq!(b.entity_count(), 1);

        assert!(a.close().unwrap());
        assert!(!b.is_closed());
        assert_eq!(b.entity_count(), 1);
        assert_eq!(primary.entity_count(), 1);
    }

    #[test]
    fn primary_named_like_a_derivation_is_separate() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("world").join("DIM-1")).unwrap();
        let builder = builder(tmp.path(), false);
        let primary = builder.create_level("world", None).unwrap();
        let lookalike = builder.create_level("World_Nether", None).unwrap();
        let nether = derive_dimension(&builder, &primary, Dimension::Nether).unwrap().unwrap();
        lookalike.add_entity("cow", glam::Vec3::ZERO).unwrap();

        nether.close().unwrap();
        assert_eq!(lookalike.entity_count(), 1);
    }

    #[test]
    fn each_call_builds_a_new_level() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("world").join("DIM1")).unwrap();
        let builder = builder(tmp.path(), false);
        let primary = builder.create_level("world", None).unwrap();
        let first = derive_dimension(&builder, &primary, Dimension::TheEnd).unwrap().unwrap();
        let second = derive_dimension(&builder, &primary, Dimension::TheEnd).unwrap().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.name(), second.name());
    }
}
