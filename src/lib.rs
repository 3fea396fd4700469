pub mod camera;
pub mod config;
pub mod error;
pub mod game;
pub mod input;
pub mod perf;
pub mod player;
/// Voxel Raycaster - CPU first-person voxel engine
/// Per-pixel DDA raycasting over a paged chunk world, parallelized with rayon
pub mod rendering;
pub mod voxel;
pub mod world;

pub use camera::Camera;
pub use config::EngineConfig;
pub use error::{AssetLoadError, ChunkError, ConfigError, EngineError, RegistryError};
pub use game::Game;
pub use input::{FrameInput, MovementKeys};
pub use perf::{CounterSnapshot, FrameStats, RaycastCounters, RAYCAST_COUNTERS};
pub use player::{Interaction, Player};
pub use rendering::{Framebuffer, Raycaster, RenderMode, ShadingConfig, TextureRegistry};
pub use voxel::{BlockId, BlockRegistry, Chunk, Generator, GeneratorKind, CHUNK_SIZE, CHUNK_VOLUME};
pub use world::{FlatWorld, VoxelStore, World, WorldConfig};
