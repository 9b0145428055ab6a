//! File-backed region storage.
//!
//! Layout inside a dimension directory:
//! ```text
//! level.meta.json            - schema version and region count
//! region/
//!   r.0.-1.cbor.zst          - CBOR+zstd compressed chunk records of one region
//! integrity/
//!   manifest.json            - sha256 of every region file
//! ```
//! The primary dimension's directory is the world's base path; secondary
//! dimensions use `DIM-1` / `DIM1` below it.

use levelhost_common::{ChunkPos, Dimension};
use levelhost_kernel::{Chunk, ChunkDecodeError, ChunkRecord, ChunkStore, StorageError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Current region schema version.
const REGION_SCHEMA_VERSION: u32 = 1;

/// Width of a region along X and Z, in chunks.
pub const REGION_WIDTH: i32 = 32;

/// Errors from file-backed region operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CBOR serialization error: {0}")]
    CborEncode(String),
    #[error("CBOR deserialization error: {0}")]
    CborDecode(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("integrity check failed for {file}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        file: String,
        expected: String,
        actual: String,
    },
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error(transparent)]
    Chunk(#[from] ChunkDecodeError),
}

/// Metadata stored in level.meta.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionMeta {
    pub schema_version: u32,
    pub dimension: Dimension,
    pub region_count: u32,
}

/// Hash of one region file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub sha256: String,
    pub chunk_count: usize,
}

/// Integrity manifest keyed by region file name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityManifest {
    pub entries: BTreeMap<String, ManifestEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RegionPos {
    x: i32,
    z: i32,
}

impl RegionPos {
    fn of(chunk: ChunkPos) -> Self {
        Self {
            x: chunk.x.div_euclid(REGION_WIDTH),
            z: chunk.z.div_euclid(REGION_WIDTH),
        }
    }

    fn filename(self) -> String {
        format!("r.{}.{}.cbor.zst", self.x, self.z)
    }
}

/// Chunk storage for one dimension of a world, grouped into region files.
///
/// Regions are read lazily and kept in memory; written regions are buffered
/// until [`RegionStore::flush_regions`].
pub struct RegionStore {
    base: PathBuf,
    root: PathBuf,
    dimension: Dimension,
    meta: RegionMeta,
    manifest: IntegrityManifest,
    regions: HashMap<RegionPos, HashMap<ChunkPos, ChunkRecord>>,
    dirty: HashSet<RegionPos>,
}

impl RegionStore {
    /// Open the `dimension` directory of the world at `base`. Nothing is
    /// created on disk until the first flush.
    pub fn open(base: impl AsRef<Path>, dimension: Dimension) -> Result<Self, StoreError> {
        let base = base.as_ref().to_path_buf();
        let root = match dimension.storage_dir() {
            Some(dir) => base.join(dir),
            None => base.clone(),
        };

        let meta_path = root.join("level.meta.json");
        let manifest_path = root.join("integrity").join("manifest.json");

        let meta = if meta_path.exists() {
            let meta: RegionMeta = serde_json::from_reader(std::fs::File::open(&meta_path)?)?;
            if meta.schema_version != REGION_SCHEMA_VERSION {
                return Err(StoreError::SchemaMismatch {
                    file_version: meta.schema_version,
                    expected_version: REGION_SCHEMA_VERSION,
                });
            }
            meta
        } else {
            RegionMeta {
                schema_version: REGION_SCHEMA_VERSION,
                dimension,
                region_count: 0,
            }
        };
        let manifest = if manifest_path.exists() {
            serde_json::from_reader(std::fs::File::open(&manifest_path)?)?
        } else {
            IntegrityManifest::default()
        };

        tracing::debug!(root = %root.display(), %dimension, regions = meta.region_count, "opened region store");
        Ok(Self {
            base,
            root,
            dimension,
            meta,
            manifest,
            regions: HashMap::new(),
            dirty: HashSet::new(),
        })
    }

    /// Directory holding this dimension's files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn meta(&self) -> &RegionMeta {
        &self.meta
    }

    pub fn manifest(&self) -> &IntegrityManifest {
        &self.manifest
    }

    fn region_path(&self, filename: &str) -> PathBuf {
        self.root.join("region").join(filename)
    }

    fn region(&mut self, pos: RegionPos) -> Result<&mut HashMap<ChunkPos, ChunkRecord>, StoreError> {
        if !self.regions.contains_key(&pos) {
            let records = self.read_region(pos)?;
            self.regions.insert(pos, records);
        }
        Ok(self.regions.entry(pos).or_default())
    }

    fn read_region(&self, pos: RegionPos) -> Result<HashMap<ChunkPos, ChunkRecord>, StoreError> {
        let filename = pos.filename();
        let path = self.region_path(&filename);
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let compressed = std::fs::read(&path)?;
        self.verify_file_hash(&filename, &compressed)?;
        let cbor_bytes = zstd_decompress(&compressed)?;
        let records: Vec<ChunkRecord> = cbor_deserialize(&cbor_bytes)?;
        tracing::trace!(file = %filename, chunks = records.len(), "read region");
        Ok(records.into_iter().map(|r| (r.pos, r)).collect())
    }

    /// Load a stored chunk, or `None` if it was never saved.
    pub fn read_chunk(&mut self, pos: ChunkPos) -> Result<Option<Chunk>, StoreError> {
        let record = self.region(RegionPos::of(pos))?.get(&pos).cloned();
        Ok(record.map(Chunk::from_record).transpose()?)
    }

    /// Buffer a chunk for the next flush.
    pub fn write_chunk(&mut self, chunk: &Chunk) -> Result<(), StoreError> {
        let region_pos = RegionPos::of(chunk.pos());
        self.region(region_pos)?.insert(chunk.pos(), chunk.to_record());
        self.dirty.insert(region_pos);
        Ok(())
    }

    /// Write every modified region plus metadata and manifest.
    pub fn flush_regions(&mut self) -> Result<usize, StoreError> {
        if self.dirty.is_empty() {
            return Ok(0);
        }
        std::fs::create_dir_all(self.root.join("region"))?;
        std::fs::create_dir_all(self.root.join("integrity"))?;

        // a region leaves the dirty set only once its file is written
        let dirty: Vec<RegionPos> = self.dirty.iter().copied().collect();
        for pos in &dirty {
            let Some(records) = self.regions.get(pos) else {
                self.dirty.remove(pos);
                continue;
            };
            let mut sorted: Vec<&ChunkRecord> = records.values().collect();
            sorted.sort_by_key(|r| r.pos);

            let cbor_bytes = cbor_serialize(&sorted)?;
            let compressed = zstd_compress(&cbor_bytes)?;
            let filename = pos.filename();
            std::fs::write(self.region_path(&filename), &compressed)?;

            self.manifest.entries.insert(
                filename,
                ManifestEntry {
                    sha256: sha256_hex(&compressed),
                    chunk_count: sorted.len(),
                },
            );
            self.dirty.remove(pos);
        }
        self.meta.region_count = self.manifest.entries.len() as u32;
        self.save_meta()?;
        self.save_manifest()?;
        tracing::debug!(root = %self.root.display(), regions = dirty.len(), "flushed regions");
        Ok(dirty.len())
    }

    /// Verify every region file against the manifest.
    pub fn verify_integrity(&self) -> Result<(), StoreError> {
        for filename in self.manifest.entries.keys() {
            let data = std::fs::read(self.region_path(filename))?;
            self.verify_file_hash(filename, &data)?;
        }
        Ok(())
    }

    fn verify_file_hash(&self, filename: &str, data: &[u8]) -> Result<(), StoreError> {
        let Some(entry) = self.manifest.entries.get(filename) else {
            // Region files copied in without a manifest are trusted.
            return Ok(());
        };
        let actual = sha256_hex(data);
        if entry.sha256 != actual {
            return Err(StoreError::IntegrityMismatch {
                file: filename.to_string(),
                expected: entry.sha256.clone(),
                actual,
            });
        }
        Ok(())
    }

    fn save_meta(&self) -> Result<(), StoreError> {
        let path = self.root.join("level.meta.json");
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.meta)?;
        Ok(())
    }

    fn save_manifest(&self) -> Result<(), StoreError> {
        let path = self.root.join("integrity").join("manifest.json");
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.manifest)?;
        Ok(())
    }
}

impl ChunkStore for RegionStore {
    fn base_path(&self) -> &Path {
        &self.base
    }

    fn dimension(&self) -> Dimension {
        self.dimension
    }

    fn has_dimension(&self, dimension: Dimension) -> bool {
        match dimension.storage_dir() {
            Some(dir) => self.base.join(dir).is_dir(),
            None => true,
        }
    }

    fn load_chunk(&mut self, pos: ChunkPos) -> Result<Option<Chunk>, StorageError> {
        Ok(self.read_chunk(pos)?)
    }

    fn save_chunk(&mut self, chunk: &Chunk) -> Result<(), StorageError> {
        Ok(self.write_chunk(chunk)?)
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        self.flush_regions()?;
        Ok(())
    }
}

fn cbor_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StoreError::CborEncode(e.to_string()))?;
    Ok(buf)
}

fn cbor_deserialize<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, StoreError> {
    ciborium::from_reader(data).map_err(|e| StoreError::CborDecode(e.to_string()))
}

fn zstd_compress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut encoder = zstd::Encoder::new(Vec::new(), 3)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn zstd_decompress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut decoder = zstd::Decoder::new(data)?;
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
