//! Maps a configured provider tag to a concrete world backend.

use crate::config::{Config, keys};
use crate::error::ManagerError;
use levelhost_common::{Dimension, level_key};
use levelhost_kernel::{FlatGenerator, Generator, WorldProvider};
use levelhost_persist::RegionStore;
use std::path::{Path, PathBuf};

/// Recognized values of the `WorldProvider` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderTag {
    Anvil,
    Flat,
    Flatland,
    Cool,
    Experimental,
}

impl ProviderTag {
    /// Exact (trimmed, case-insensitive) match on a known tag.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "anvil" => Some(Self::Anvil),
            "flat" => Some(Self::Flat),
            "flatland" => Some(Self::Flatland),
            "cool" => Some(Self::Cool),
            "experimental" => Some(Self::Experimental),
            _ => None,
        }
    }

    /// Like [`ProviderTag::parse`], but an unknown tag falls back to the
    /// default stored backend with a warning.
    pub fn resolve(tag: &str) -> Self {
        Self::parse(tag).unwrap_or_else(|| {
            tracing::warn!(tag, "unknown world provider tag, using anvil");
            Self::Anvil
        })
    }
}

/// Builds world providers from configuration.
#[derive(Debug, Clone)]
pub struct WorldProviderFactory {
    world_folder: PathBuf,
    calculate_lights: bool,
    save_enabled: bool,
    seed: u64,
}

impl WorldProviderFactory {
    pub fn from_config(config: &Config) -> Self {
        Self {
            world_folder: PathBuf::from(config.get(keys::WORLD_FOLDER, String::from("World"))),
            calculate_lights: config.get(keys::CALCULATE_LIGHTS, false),
            save_enabled: config.get(keys::SAVE_ENABLED, false),
            seed: config.get(keys::SEED, 0u64),
        }
    }

    pub fn world_folder(&self) -> &Path {
        &self.world_folder
    }

    /// Directory that holds the stored regions of `level_name`.
    pub fn level_path(&self, level_name: &str) -> PathBuf {
        self.world_folder.join(level_key(level_name))
    }

    pub fn create(&self, tag: &str, level_name: &str) -> Result<WorldProvider, ManagerError> {
        self.create_tagged(ProviderTag::resolve(tag), level_name)
    }

    pub fn create_tagged(
        &self,
        tag: ProviderTag,
        level_name: &str,
    ) -> Result<WorldProvider, ManagerError> {
        let provider = match tag {
            ProviderTag::Cool => WorldProvider::cool(self.seed),
            ProviderTag::Experimental => WorldProvider::experimental(self.seed),
            ProviderTag::Anvil | ProviderTag::Flat | ProviderTag::Flatland => {
                self.default_provider(level_name)?
            }
        };
        tracing::debug!(?tag, level = level_name, kind = provider.kind().as_str(), "provider created");
        Ok(provider)
    }

    /// Stored regions under the world folder with flat terrain for chunks
    /// never saved.
    pub fn default_provider(&self, level_name: &str) -> Result<WorldProvider, ManagerError> {
        let store = RegionStore::open(self.level_path(level_name), Dimension::Overworld)?;
        Ok(self.stored(store, Generator::Flat(FlatGenerator::default())))
    }

    /// Stored provider for a secondary dimension of the level at
    /// `base_path`. Unsaved chunks generate as air.
    pub fn anvil_dimension(
        &self,
        base_path: &Path,
        dimension: Dimension,
    ) -> Result<WorldProvider, ManagerError> {
        let store = RegionStore::open(base_path, dimension)?;
        Ok(self.stored(store, Generator::Air))
    }

    fn stored(&self, store: RegionStore, fallback: Generator) -> WorldProvider {
        let read_light = !self.calculate_lights;
        WorldProvider::anvil(Box::new(store), fallback)
            .with_light_reads(read_light, read_light)
            .with_save(self.save_enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use levelhost_kernel::ProviderKind;

    fn factory(folder: &Path) -> WorldProviderFactory {
        WorldProviderFactory::from_config(
            &Config::new().with(keys::WORLD_FOLDER, folder.display()),
        )
    }

    #[test]
    fn tags_parse_trimmed_and_case_insensitive() {
        assert_eq!(ProviderTag::parse(" Cool "), Some(ProviderTag::Cool));
        assert_eq!(ProviderTag::parse("EXPERIMENTAL"), Some(ProviderTag::Experimental));
        assert_eq!(ProviderTag::parse("flatland"), Some(ProviderTag::Flatland));
        assert_eq!(ProviderTag::parse("cooler"), None);
        assert_eq!(ProviderTag::resolve("mystery"), ProviderTag::Anvil);
    }

    #[test]
    fn tag_selects_backend() {
        let tmp = tempfile::tempdir().unwrap();
        let factory = factory(tmp.path());
        assert_eq!(factory.create("cool", "w").unwrap().kind(), ProviderKind::Cool);
        assert_eq!(
            factory.create("Experimental", "w").unwrap().kind(),
            ProviderKind::Experimental
        );
        for tag in ["anvil", "flat", "flatland", "other", ""] {
            let provider = factory.create(tag, "w").unwrap();
            assert_eq!(provider.kind(), ProviderKind::Anvil, "tag {tag:?}");
            assert!(matches!(provider.generator(), Generator::Flat(_)));
        }
    }

    #[test]
    fn stored_provider_lives_under_the_world_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = factory(tmp.path()).create("anvil", "Lobby").unwrap();
        assert_eq!(provider.base_path(), Some(tmp.path().join("lobby").as_path()));
    }

    #[test]
    fn light_reads_follow_calculate_lights() {
        let tmp = tempfile::tempdir().unwrap();
        let reads = factory(tmp.path()).create("anvil", "w").unwrap();
        assert!(reads.read_sky_light() && reads.read_block_light());

        let config = Config::new()
            .with(keys::WORLD_FOLDER, tmp.path().display())
            .with(keys::CALCULATE_LIGHTS, true);
        let recompute = WorldProviderFactory::from_config(&config).create("anvil", "w").unwrap();
        assert!(!recompute.read_sky_light() && !recompute.read_block_light());
    }

    #[test]
    fn dimension_provider_uses_air_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = factory(tmp.path())
            .anvil_dimension(tmp.path(), Dimension::Nether)
            .unwrap();
        assert_eq!(provider.dimension(), Dimension::Nether);
        assert!(matches!(provider.generator(), Generator::Air));
    }
}
