/// Voxel data: block table, chunk storage and deterministic generation
pub mod block;
pub mod chunk;
pub mod generator;

pub use block::{Block, BlockFace, BlockId, BlockRegistry, MAX_BLOCK_TYPES};
pub use chunk::{Chunk, ChunkData, ChunkId, ChunkState, CHUNK_SIZE, CHUNK_VOLUME};
pub use generator::{Generator, GeneratorKind};
