/// Fixed-size world held in one flat array and one `.map` file
use super::{check_known_blocks, quarantine, VoxelStore};
use crate::error::ChunkError;
use crate::voxel::chunk::{map_file_name, write_atomically};
use crate::voxel::{BlockId, BlockRegistry, Generator};
use glam::{IVec3, UVec3};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Largest map the engine will allocate, one byte per cell
pub const MAX_FLAT_CELLS: usize = 1 << 30;

/// Cell count of a `size` map, None if it overflows `usize`
pub fn flat_volume(size: UVec3) -> Option<usize> {
    (size.x as usize)
        .checked_mul(size.y as usize)?
        .checked_mul(size.z as usize)
}

pub struct FlatWorld {
    size: UVec3,
    /// Index `y*W*D + x*D + z`, same axis order as a chunk
    cells: Vec<BlockId>,
    map_id: u32,
    save_dir: Option<PathBuf>,
    blocks: Arc<BlockRegistry>,
}

impl FlatWorld {
    /// An all-air world of `size` cells. Panics above `MAX_FLAT_CELLS`.
    pub fn new(size: UVec3, blocks: Arc<BlockRegistry>) -> Self {
        let volume = match flat_volume(size) {
            Some(volume) if volume <= MAX_FLAT_CELLS => volume,
            _ => panic!("flat world {size} exceeds {MAX_FLAT_CELLS} cells"),
        };
        Self {
            size,
            cells: vec![BlockId::AIR; volume],
            map_id: 0,
            save_dir: None,
            blocks,
        }
    }

    /// Persist to `dir/{map_id:08x}.map` on save
    pub fn with_storage(mut self, dir: impl Into<PathBuf>, map_id: u32) -> Self {
        self.save_dir = Some(dir.into());
        self.map_id = map_id;
        self
    }

    /// Load the map file if present, otherwise fill from the generator.
    pub fn open(
        size: UVec3,
        map_id: u32,
        save_dir: Option<PathBuf>,
        generator: &Generator,
        blocks: Arc<BlockRegistry>,
        regenerate_corrupt: bool,
    ) -> Result<Self, ChunkError> {
        let mut world = Self::new(size, blocks);
        world.map_id = map_id;
        world.save_dir = save_dir;

        let Some(path) = world.file_path() else {
            world.fill(generator);
            return Ok(world);
        };

        match world.load(&path) {
            Ok(()) => log::info!("loaded map {} ({})", path.display(), size),
            Err(ChunkError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                log::info!("no map at {}, generating", path.display());
                world.fill(generator);
            }
            Err(err @ (ChunkError::Corrupt { .. } | ChunkError::UnknownBlock { .. }))
                if regenerate_corrupt =>
            {
                log::warn!("regenerating map {}: {}", map_id, err);
                quarantine(&path)?;
                world.fill(generator);
            }
            Err(err) => return Err(err),
        }
        Ok(world)
    }

    /// Overwrite every cell with the generator's content
    pub fn fill(&mut self, generator: &Generator) {
        for y in 0..self.size.y as i32 {
            for x in 0..self.size.x as i32 {
                for z in 0..self.size.z as i32 {
                    let pos = IVec3::new(x, y, z);
                    let index = self.index(pos);
                    self.cells[index] = generator.block_at(pos);
                }
            }
        }
    }

    /// Replace all cells from a map file. Short files are corrupt.
    pub fn load(&mut self, path: &Path) -> Result<(), ChunkError> {
        let bytes = fs::read(path).map_err(|e| ChunkError::io(path, e))?;
        let volume = self.cells.len();
        if bytes.len() < volume {
            return Err(ChunkError::Corrupt {
                path: path.to_path_buf(),
                actual: bytes.len(),
                expected: volume,
            });
        }
        check_known_blocks(&bytes[..volume], &self.blocks, path)?;

        for (cell, &byte) in self.cells.iter_mut().zip(&bytes) {
            *cell = BlockId(byte);
        }
        Ok(())
    }

    /// Write the whole cell array to `path`
    pub fn save_to(&self, path: &Path) -> Result<(), ChunkError> {
        write_atomically(path, &self.to_bytes())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.cells.iter().map(|b| b.0).collect()
    }

    pub fn file_path(&self) -> Option<PathBuf> {
        self.save_dir
            .as_ref()
            .map(|dir| dir.join(map_file_name(self.map_id)))
    }

    pub fn size(&self) -> UVec3 {
        self.size
    }

    pub fn map_id(&self) -> u32 {
        self.map_id
    }

    #[inline]
    fn index(&self, pos: IVec3) -> usize {
        let (w, d) = (self.size.x as usize, self.size.z as usize);
        pos.y as usize * w * d + pos.x as usize * d + pos.z as usize
    }
}

impl VoxelStore for FlatWorld {
    #[inline]
    fn contains(&self, pos: IVec3) -> bool {
        pos.cmpge(IVec3::ZERO).all() && pos.as_uvec3().cmplt(self.size).all()
    }

    #[inline]
    fn get_block(&self, pos: IVec3) -> BlockId {
        if !self.contains(pos) {
            return BlockId::AIR;
        }
        self.cells[self.index(pos)]
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
        let index = self.index(pos);
        self.cells[index] = block;
    }

    fn save(&mut self) -> Result<usize, ChunkError> {
        let Some(path) = self.file_path() else {
            log::warn!("map {:08x} has no save directory, edits discarded", self.map_id);
            return Ok(0);
        };
        self.save_to(&path)?;
        log::info!("saved map {}", path.display());
        Ok(1)
    }
}
