/// Chunk data structure and its on-disk form
/// Uses enum to handle uniform chunks efficiently (common case)
use super::generator::Generator;
use super::BlockId;
use crate::error::ChunkError;
use glam::IVec3;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const CHUNK_SIZE: usize = 16;
pub const CHUNK_SIZE_I32: i32 = CHUNK_SIZE as i32;
pub const CHUNK_VOLUME: usize = CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE;

/// Chunk coordinates are packed 8 bits per axis, which bounds them to i8
pub const CHUNK_COORD_MIN: i32 = i8::MIN as i32;
pub const CHUNK_COORD_MAX: i32 = i8::MAX as i32;

pub const CHUNK_FILE_EXTENSION: &str = "map";

/// Stable chunk identity, also the file name stem
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(pub u32);

impl ChunkId {
    /// Pack chunk coordinates. Returns None outside the addressable range.
    pub fn from_coords(coords: IVec3) -> Option<Self> {
        if !chunk_coords_in_range(coords) {
            return None;
        }
        let pack = |v: i32| (v as i8 as u8) as u32;
        Some(ChunkId(pack(coords.x) << 16 | pack(coords.y) << 8 | pack(coords.z)))
    }

    pub fn coords(self) -> IVec3 {
        let unpack = |shift: u32| ((self.0 >> shift) & 0xFF) as u8 as i8 as i32;
        IVec3::new(unpack(16), unpack(8), unpack(0))
    }

    /// Zero-padded lowercase hex, e.g. `00ff0001.map`
    pub fn file_name(self) -> String {
        map_file_name(self.0)
    }

    /// Inverse of `file_name`. Names that no chunk would be saved under are None.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(CHUNK_FILE_EXTENSION)?.strip_suffix('.')?;
        if stem.len() != 8 || !stem.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let id = u32::from_str_radix(stem, 16).ok()?;
        (id >> 24 == 0).then_some(ChunkId(id))
    }
}

pub fn map_file_name(id: u32) -> String {
    format!("{:08x}.{}", id, CHUNK_FILE_EXTENSION)
}

#[inline]
pub fn chunk_coords_in_range(coords: IVec3) -> bool {
    coords.cmpge(IVec3::splat(CHUNK_COORD_MIN)).all()
        && coords.cmple(IVec3::splat(CHUNK_COORD_MAX)).all()
}

/// Lifecycle of a resident chunk
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChunkState {
    Unloaded,
    Generated,
    Loaded,
    Dirty,
    Saved,
}

/// Chunk storage optimized for common cases
/// Uniform chunks (all air/all solid) are stored as single value
pub enum ChunkData {
    Uniform(BlockId),
    Varied(Box<[BlockId; CHUNK_VOLUME]>),
}

pub struct Chunk {
    pub position: IVec3,
    pub data: ChunkData,
    state: ChunkState,
}

impl Chunk {
    /// An unloaded all-air chunk at chunk coordinates `position`
    pub fn new(position: IVec3) -> Self {
        Self {
            position,
            data: ChunkData::Uniform(BlockId::AIR),
            state: ChunkState::Unloaded,
        }
    }

    pub fn uniform(position: IVec3, block: BlockId) -> Self {
        Self {
            position,
            data: ChunkData::Uniform(block),
            state: ChunkState::Generated,
        }
    }

    #[inline]
    pub fn id(&self) -> Option<ChunkId> {
        ChunkId::from_coords(self.position)
    }

    #[inline]
    pub fn state(&self) -> ChunkState {
        self.state
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.state == ChunkState::Dirty
    }

    /// Get block at local coordinates (0..CHUNK_SIZE)
    #[inline]
    pub fn get_block(&self, x: usize, y: usize, z: usize) -> BlockId {
        debug_assert!(x < CHUNK_SIZE && y < CHUNK_SIZE && z < CHUNK_SIZE);

        match &self.data {
            ChunkData::Uniform(block) => *block,
            ChunkData::Varied(blocks) => blocks[coords_to_index(x, y, z)],
        }
    }

    /// Set block at local coordinates (0..CHUNK_SIZE)
    /// Converts uniform chunks to varied if necessary
    pub fn set_block(&mut self, x: usize, y: usize, z: usize, block: BlockId) {
        debug_assert!(x < CHUNK_SIZE && y < CHUNK_SIZE && z < CHUNK_SIZE);

        if let ChunkData::Uniform(uniform) = self.data {
            if uniform == block {
                self.state = ChunkState::Dirty;
                return;
            }
            self.data = ChunkData::Varied(Box::new([uniform; CHUNK_VOLUME]));
        }

        if let ChunkData::Varied(ref mut blocks) = self.data {
            blocks[coords_to_index(x, y, z)] = block;
        }
        self.state = ChunkState::Dirty;
    }

    #[inline]
    pub fn is_uniform(&self) -> bool {
        matches!(self.data, ChunkData::Uniform(_))
    }

    /// Fill with the generator's content for this chunk coordinate
    pub fn generate(&mut self, generator: &Generator) {
        self.data = generator.generate(self.position);
        self.state = ChunkState::Generated;
    }

    /// Full flat cell array, always CHUNK_VOLUME bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        match &self.data {
            ChunkData::Uniform(block) => vec![block.0; CHUNK_VOLUME],
            ChunkData::Varied(blocks) => blocks.iter().map(|b| b.0).collect(),
        }
    }

    /// Replace contents from a persisted cell array.
    /// Extra trailing bytes are ignored, short input is corrupt.
    pub fn load_bytes(&mut self, bytes: &[u8], path: &Path) -> Result<(), ChunkError> {
        if bytes.len() < CHUNK_VOLUME {
            return Err(ChunkError::Corrupt {
                path: path.to_path_buf(),
                actual: bytes.len(),
                expected: CHUNK_VOLUME,
            });
        }

        let cells = &bytes[..CHUNK_VOLUME];
        self.data = if cells.iter().all(|&b| b == cells[0]) {
            ChunkData::Uniform(BlockId(cells[0]))
        } else {
            let mut blocks = Box::new([BlockId::AIR; CHUNK_VOLUME]);
            for (dst, &src) in blocks.iter_mut().zip(cells) {
                *dst = BlockId(src);
            }
            ChunkData::Varied(blocks)
        };
        self.state = ChunkState::Loaded;
        Ok(())
    }

    /// Path of this chunk's file under `dir`
    pub fn file_path(&self, dir: &Path) -> Option<PathBuf> {
        self.id().map(|id| dir.join(id.file_name()))
    }

    pub fn load(&mut self, dir: &Path) -> Result<(), ChunkError> {
        let path = self.file_path(dir).ok_or_else(|| out_of_range(dir, self.position))?;
        let bytes = fs::read(&path).map_err(|e| ChunkError::io(&path, e))?;
        self.load_bytes(&bytes, &path)
    }

    /// Write the whole cell array, replacing any previous file atomically
    pub fn save(&mut self, dir: &Path) -> Result<(), ChunkError> {
        let path = self.file_path(dir).ok_or_else(|| out_of_range(dir, self.position))?;
        write_atomically(&path, &self.to_bytes())?;
        self.state = ChunkState::Saved;
        Ok(())
    }
}

fn out_of_range(dir: &Path, position: IVec3) -> ChunkError {
    ChunkError::io(
        dir,
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("chunk {position} is outside the addressable range"),
        ),
    )
}

/// Write to a sibling temp file and rename over the target
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), ChunkError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ChunkError::io(parent, e))?;
    }
    let tmp = path.with_extension("map.tmp");
    {
        let mut file = fs::File::create(&tmp).map_err(|e| ChunkError::io(&tmp, e))?;
        file.write_all(bytes).map_err(|e| ChunkError::io(&tmp, e))?;
        file.sync_all().map_err(|e| ChunkError::io(&tmp, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| ChunkError::io(path, e))
}

/// Convert 3D local coordinates to the flat index (y outermost, z innermost)
#[inline]
pub const fn coords_to_index(x: usize, y: usize, z: usize) -> usize {
    (y * CHUNK_SIZE + x) * CHUNK_SIZE + z
}

/// Convert linear index to 3D local coordinates
#[inline]
pub const fn index_to_coords(index: usize) -> (usize, usize, usize) {
    let y = index / (CHUNK_SIZE * CHUNK_SIZE);
    let remainder = index % (CHUNK_SIZE * CHUNK_SIZE);
    let x = remainder / CHUNK_SIZE;
    let z = remainder % CHUNK_SIZE;
    (x, y, z)
}
