/// Paged chunk world with view distance streaming
/// Resident chunks live in an LRU; dirty chunks are saved when evicted
use super::{check_known_blocks, quarantine, world_to_chunk, world_to_chunk_pos, world_to_local};
use super::VoxelStore;
use crate::count_call;
use crate::error::ChunkError;
use crate::perf::RAYCAST_COUNTERS;
use crate::voxel::chunk::{chunk_coords_in_range, CHUNK_VOLUME};
use crate::voxel::{BlockId, BlockRegistry, Chunk, ChunkId, ChunkState, Generator};
use glam::{IVec3, Vec3};
use lru::LruCache;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Non-resident chunks with files that reads keep decoded
const READ_BACK_CHUNKS: usize = 64;

/// World configuration parameters
#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// View distance in chunks (half-width of the cube kept resident)
    pub view_distance: i32,
    /// Upper bound on resident chunks, raised to the view volume if smaller
    pub max_resident_chunks: usize,
    /// Directory holding `.map` chunk files; None keeps everything in memory
    pub save_dir: Option<PathBuf>,
    /// Regenerate chunks whose files are unreadable instead of failing
    pub regenerate_corrupt: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            view_distance: 2,
            max_resident_chunks: 256,
            save_dir: None,
            regenerate_corrupt: true,
        }
    }
}

/// Number of chunks in the cube streamed around the focus
#[inline]
pub fn view_volume(view_distance: i32) -> usize {
    let side = (2 * view_distance.max(0) + 1) as usize;
    side * side * side
}

/// Manages the voxel world with dynamic chunk loading
pub struct World {
    chunks: LruCache<IVec3, Chunk>,
    /// Resident chunk budget; None when there is nowhere to evict to
    resident_limit: Option<NonZeroUsize>,
    /// Chunk positions whose current content lives in a file
    on_disk: HashSet<IVec3>,
    /// Decoded copies of non-resident chunks that have files
    read_back: Mutex<LruCache<IVec3, Chunk>>,
    generator: Generator,
    blocks: Arc<BlockRegistry>,
    config: WorldConfig,
}

impl World {
    pub fn new(config: WorldConfig, generator: Generator, blocks: Arc<BlockRegistry>) -> Self {
        let (chunks, resident_limit, on_disk) = match &config.save_dir {
            Some(dir) => {
                let capacity = config
                    .max_resident_chunks
                    .max(view_volume(config.view_distance));
                let limit = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
                (LruCache::new(limit), Some(limit), saved_chunks(dir))
            }
            // Without a directory an evicted chunk would lose its edits
            None => (LruCache::unbounded(), None, HashSet::new()),
        };
        if !on_disk.is_empty() {
            log::info!("found {} saved chunks", on_disk.len());
        }

        let read_back_capacity = NonZeroUsize::new(READ_BACK_CHUNKS).unwrap_or(NonZeroUsize::MIN);
        Self {
            chunks,
            resident_limit,
            on_disk,
            read_back: Mutex::new(LruCache::new(read_back_capacity)),
            generator,
            blocks,
            config,
        }
    }

    /// Stream in every chunk of the view cube around `focus`.
    /// Returns the number of chunks paged in.
    pub fn update(&mut self, focus: Vec3) -> Result<usize, ChunkError> {
        let focus_chunk = world_to_chunk_pos(focus);
        let view_distance = self.config.view_distance;
        let mut paged_in = 0;

        for cx in (focus_chunk.x - view_distance)..=(focus_chunk.x + view_distance) {
            for cy in (focus_chunk.y - view_distance)..=(focus_chunk.y + view_distance) {
                for cz in (focus_chunk.z - view_distance)..=(focus_chunk.z + view_distance) {
                    let chunk_pos = IVec3::new(cx, cy, cz);
                    if !chunk_coords_in_range(chunk_pos) {
                        continue;
                    }

                    // Touch resident chunks so the view cube stays most recently used
                    if self.chunks.get(&chunk_pos).is_some() {
                        continue;
                    }

                    let chunk = self.page_in(chunk_pos)?;
                    self.make_room();
                    self.chunks.put(chunk_pos, chunk);
                    paged_in += 1;
                }
            }
        }

        if paged_in > 0 {
            log::debug!(
                "paged in {} chunks around {}, {} resident",
                paged_in,
                focus_chunk,
                self.chunks.len()
            );
        }
        Ok(paged_in)
    }

    /// Resident chunk, paging it in on first touch
    fn resident_mut(&mut self, chunk_pos: IVec3) -> Result<&mut Chunk, ChunkError> {
        if !self.chunks.contains(&chunk_pos) {
            let chunk = self.page_in(chunk_pos)?;
            self.make_room();
            self.chunks.put(chunk_pos, chunk);
        }
        Ok(self
            .chunks
            .get_or_insert_mut(chunk_pos, || Chunk::new(chunk_pos)))
    }

    /// Take the chunk back from the read cache, else load its file, else generate it
    fn page_in(&mut self, chunk_pos: IVec3) -> Result<Chunk, ChunkError> {
        let cached = self
            .read_back
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .pop(&chunk_pos)
            // A file that failed to decode is reported or quarantined below
            .filter(|chunk| chunk.state() != ChunkState::Generated);
        if let Some(chunk) = cached {
            return Ok(chunk);
        }

        let mut chunk = Chunk::new(chunk_pos);
        let path = match self.chunk_path(&chunk) {
            Some(path) => path,
            None => return Ok(self.generated(chunk)),
        };

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.on_disk.remove(&chunk_pos);
                return Ok(self.generated(chunk));
            }
            Err(err) => return Err(ChunkError::io(&path, err)),
        };

        match self.decode(&mut chunk, &bytes, &path) {
            Ok(()) => {
                count_call!(RAYCAST_COUNTERS.chunks_loaded);
                log::debug!("loaded chunk {} from {}", chunk_pos, path.display());
                self.on_disk.insert(chunk_pos);
                Ok(chunk)
            }
            Err(err @ (ChunkError::Corrupt { .. } | ChunkError::UnknownBlock { .. }))
                if self.config.regenerate_corrupt =>
            {
                log::warn!("regenerating chunk {}: {}", chunk_pos, err);
                quarantine(&path)?;
                self.on_disk.remove(&chunk_pos);
                Ok(self.generated(Chunk::new(chunk_pos)))
            }
            Err(err) => Err(err),
        }
    }

    fn generated(&self, mut chunk: Chunk) -> Chunk {
        chunk.generate(&self.generator);
        count_call!(RAYCAST_COUNTERS.chunks_generated);
        chunk
    }

    fn decode(&self, chunk: &mut Chunk, bytes: &[u8], path: &Path) -> Result<(), ChunkError> {
        chunk.load_bytes(bytes, path)?;
        check_known_blocks(&bytes[..CHUNK_VOLUME], &self.blocks, path)
    }

    /// Evict least recently used chunks until one more fits.
    /// A dirty chunk whose save fails stays resident and the cache grows past its limit.
    fn make_room(&mut self) {
        let Some(limit) = self.resident_limit else {
            return;
        };

        while self.chunks.len() >= limit.get() {
            let Some(position) = self.chunks.peek_lru().map(|(position, _)| *position) else {
                break;
            };
            if let Err(err) = self.persist(position) {
                log::error!("keeping chunk {} resident: {}", position, err);
                break;
            }
            if let Some((position, chunk)) = self.chunks.pop_lru() {
                log::debug!("evicted chunk {} ({:?})", position, chunk.state());
                if self.on_disk.contains(&position) {
                    self.read_back
                        .get_mut()
                        .unwrap_or_else(PoisonError::into_inner)
                        .put(position, chunk);
                }
            }
        }

        // Room for the incoming chunk, shrinking back once evictions succeed again
        let wanted = (self.chunks.len() + 1).max(limit.get());
        if let Some(capacity) = NonZeroUsize::new(wanted) {
            if capacity != self.chunks.cap() {
                self.chunks.resize(capacity);
            }
        }
    }

    /// Save a resident chunk if it has unsaved edits
    fn persist(&mut self, position: IVec3) -> Result<(), ChunkError> {
        let Some(dir) = self.config.save_dir.as_deref() else {
            return Ok(());
        };
        let Some(chunk) = self.chunks.peek_mut(&position) else {
            return Ok(());
        };
        if chunk.is_dirty() {
            chunk.save(dir)?;
            count_call!(RAYCAST_COUNTERS.chunks_saved);
            self.on_disk.insert(position);
        }
        Ok(())
    }

    /// Block of a non-resident chunk that has a file
    fn read_back_block(&self, chunk_pos: IVec3, pos: IVec3) -> BlockId {
        let (x, y, z) = world_to_local(pos);
        let mut cache = self.read_back.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(chunk) = cache.get(&chunk_pos) {
            return chunk.get_block(x, y, z);
        }

        let chunk = self.read_file(chunk_pos);
        let block = chunk.get_block(x, y, z);
        cache.put(chunk_pos, chunk);
        block
    }

    /// Decode a chunk file for reading only. Bad files are left for paging in to report.
    fn read_file(&self, chunk_pos: IVec3) -> Chunk {
        let mut chunk = Chunk::new(chunk_pos);
        let Some(path) = self.chunk_path(&chunk) else {
            return self.generated(chunk);
        };

        let decoded = fs::read(&path)
            .map_err(|err| ChunkError::io(&path, err))
            .and_then(|bytes| self.decode(&mut chunk, &bytes, &path));
        match decoded {
            Ok(()) => {
                count_call!(RAYCAST_COUNTERS.chunks_loaded);
                chunk
            }
            Err(err) => {
                log::warn!("reading chunk {} as generated: {}", chunk_pos, err);
                self.generated(Chunk::new(chunk_pos))
            }
        }
    }

    fn chunk_path(&self, chunk: &Chunk) -> Option<PathBuf> {
        self.config
            .save_dir
            .as_deref()
            .and_then(|dir| chunk.file_path(dir))
    }

    pub fn is_resident(&self, chunk_pos: IVec3) -> bool {
        self.chunks.contains(&chunk_pos)
    }

    /// Get chunk count
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Get all resident chunks (for benchmarking/testing)
    pub fn resident_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter().map(|(_, chunk)| chunk)
    }
}

/// Positions of the chunk files already in `dir`
fn saved_chunks(dir: &Path) -> HashSet<IVec3> {
    let Ok(entries) = fs::read_dir(dir) else {
        return HashSet::new();
    };
    entries
        .filter_map(Result::ok)
        .filter_map(|entry| ChunkId::from_file_name(entry.file_name().to_str()?))
        .map(ChunkId::coords)
        .collect()
}

impl VoxelStore for World {
    #[inline]
    fn contains(&self, pos: IVec3) -> bool {
        chunk_coords_in_range(world_to_chunk(pos))
    }

    /// Non-resident chunks read from their file, or as generated content when they have none
    #[inline]
    fn get_block(&self, pos: IVec3) -> BlockId {
        let chunk_pos = world_to_chunk(pos);
        if !chunk_coords_in_range(chunk_pos) {
            return BlockId::AIR;
        }
        match self.chunks.peek(&chunk_pos) {
            Some(chunk) => {
                let (x, y, z) = world_to_local(pos);
                chunk.get_block(x, y, z)
            }
            None if self.on_disk.contains(&chunk_pos) => self.read_back_block(chunk_pos, pos),
            None => self.generator.block_at(pos),
        }
    }

    fn set_block(&mut self, pos: IVec3, block: BlockId) {
        assert!(
            self.blocks.contains(block),
            "block id {} out of range (registry holds {})",
            block.0,
            self.blocks.len()
        );
        if !self.contains(pos) {
            return;
        }

        let (x, y, z) = world_to_local(pos);
        match self.resident_mut(world_to_chunk(pos)) {
            Ok(chunk) => chunk.set_block(x, y, z, block),
            Err(err) => log::error!("dropping edit at {}: {}", pos, err),
        }
    }

    fn prepare(&mut self, focus: Vec3) -> Result<(), ChunkError> {
        self.update(focus).map(|_| ())
    }

    fn save(&mut self) -> Result<usize, ChunkError> {
        let Some(dir) = self.config.save_dir.clone() else {
            log::warn!("world has no save directory, {} chunks discarded", self.chunks.len());
            return Ok(0);
        };

        let mut saved = 0;
        for (position, chunk) in self.chunks.iter_mut() {
            chunk.save(&dir)?;
            count_call!(RAYCAST_COUNTERS.chunks_saved);
            self.on_disk.insert(*position);
            saved += 1;
        }
        log::info!("saved {} chunks to {}", saved, dir.display());
        Ok(saved)
    }
}
