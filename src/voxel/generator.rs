/// Deterministic chunk content, keyed only by chunk coordinate.
/// Regenerating an evicted, never-saved chunk yields identical cells.
use super::chunk::{coords_to_index, ChunkData, CHUNK_SIZE, CHUNK_SIZE_I32, CHUNK_VOLUME};
use super::BlockId;
use glam::IVec3;
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

/// Generator selection as written in configuration
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratorKind {
    /// Nothing but air
    Empty,
    /// A single solid layer at world y = 0
    Flat { ground: BlockId },
    /// Perlin height field around `base_height`
    Terrain { seed: u32, base_height: i32 },
}

impl Default for GeneratorKind {
    fn default() -> Self {
        GeneratorKind::Flat {
            ground: BlockId::GRASS,
        }
    }
}

const TERRAIN_SCALE: f64 = 0.03;
const TERRAIN_AMPLITUDE: f64 = 6.0;
const TOPSOIL_DEPTH: i32 = 3;

#[derive(Clone)]
pub struct Generator {
    kind: GeneratorKind,
    // Reuse single Perlin instance across all height calculations
    perlin: Perlin,
}

impl Generator {
    pub fn new(kind: GeneratorKind) -> Self {
        let seed = match kind {
            GeneratorKind::Terrain { seed, .. } => seed,
            _ => 0,
        };
        Self {
            kind,
            perlin: Perlin::new(seed),
        }
    }

    pub fn empty() -> Self {
        Self::new(GeneratorKind::Empty)
    }

    pub fn flat(ground: BlockId) -> Self {
        Self::new(GeneratorKind::Flat { ground })
    }

    pub fn kind(&self) -> GeneratorKind {
        self.kind
    }

    /// Block the generator places at a world position
    #[inline]
    pub fn block_at(&self, pos: IVec3) -> BlockId {
        match self.kind {
            GeneratorKind::Empty => BlockId::AIR,
            GeneratorKind::Flat { ground } => {
                if pos.y == 0 {
                    ground
                } else {
                    BlockId::AIR
                }
            }
            GeneratorKind::Terrain { base_height, .. } => {
                let height = self.sample_terrain_height(base_height, pos.x, pos.z);
                terrain_block(pos.y, height)
            }
        }
    }

    /// Cells for the chunk at chunk coordinate `position`
    pub fn generate(&self, position: IVec3) -> ChunkData {
        let world_offset = position * CHUNK_SIZE_I32;
        let chunk_min_y = world_offset.y;
        let chunk_max_y = world_offset.y + CHUNK_SIZE_I32 - 1;

        match self.kind {
            GeneratorKind::Empty => ChunkData::Uniform(BlockId::AIR),
            GeneratorKind::Flat { ground } => {
                if chunk_min_y > 0 || chunk_max_y < 0 {
                    return ChunkData::Uniform(BlockId::AIR);
                }
                let mut blocks = Box::new([BlockId::AIR; CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE]);
                let local_y = (-chunk_min_y) as usize;
                for x in 0..CHUNK_SIZE {
                    for z in 0..CHUNK_SIZE {
                        blocks[coords_to_index(x, local_y, z)] = ground;
                    }
                }
                ChunkData::Varied(blocks)
            }
            GeneratorKind::Terrain { base_height, .. } => {
                let mut heights = [[0i32; CHUNK_SIZE]; CHUNK_SIZE];
                let mut min_height = i32::MAX;
                let mut max_height = i32::MIN;
                for (x, column) in heights.iter_mut().enumerate() {
                    for (z, height) in column.iter_mut().enumerate() {
                        *height = self.sample_terrain_height(
                            base_height,
                            world_offset.x + x as i32,
                            world_offset.z + z as i32,
                        );
                        min_height = min_height.min(*height);
                        max_height = max_height.max(*height);
                    }
                }

                // All air above terrain
                if chunk_min_y > max_height {
                    return ChunkData::Uniform(BlockId::AIR);
                }
                // All subsoil below terrain
                if chunk_max_y < min_height - TOPSOIL_DEPTH {
                    return ChunkData::Uniform(BlockId::DIRT);
                }

                let mut blocks = Box::new([BlockId::AIR; CHUNK_VOLUME]);
                for y in 0..CHUNK_SIZE {
                    let world_y = world_offset.y + y as i32;
                    for x in 0..CHUNK_SIZE {
                        for z in 0..CHUNK_SIZE {
                            blocks[coords_to_index(x, y, z)] =
                                terrain_block(world_y, heights[x][z]);
                        }
                    }
                }
                ChunkData::Varied(blocks)
            }
        }
    }

    #[inline]
    fn sample_terrain_height(&self, base_height: i32, x: i32, z: i32) -> i32 {
        let noise_value = self
            .perlin
            .get([x as f64 * TERRAIN_SCALE, z as f64 * TERRAIN_SCALE]);
        base_height + (noise_value * TERRAIN_AMPLITUDE).floor() as i32
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new(GeneratorKind::default())
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator").field("kind", &self.kind).finish()
    }
}

#[inline]
fn terrain_block(world_y: i32, height: i32) -> BlockId {
    if world_y > height {
        BlockId::AIR
    } else if world_y == height {
        BlockId::GRASS
    } else {
        BlockId::DIRT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::chunk::index_to_coords;

    fn cells(data: &ChunkData) -> Vec<BlockId> {
        match data {
            ChunkData::Uniform(block) => vec![*block; CHUNK_VOLUME],
            ChunkData::Varied(blocks) => blocks.to_vec(),
        }
    }

    #[test]
    fn flat_has_single_ground_layer() {
        let generator = Generator::flat(BlockId::GRASS);
        let data = generator.generate(IVec3::ZERO);
        for (index, block) in cells(&data).into_iter().enumerate() {
            let (_, y, _) = index_to_coords(index);
            let expected = if y == 0 { BlockId::GRASS } else { BlockId::AIR };
            assert_eq!(block, expected);
        }
        assert!(matches!(
            generator.generate(IVec3::new(0, 1, 0)),
            ChunkData::Uniform(BlockId::AIR)
        ));
        assert!(matches!(
            generator.generate(IVec3::new(3, -1, -7)),
            ChunkData::Uniform(BlockId::AIR)
        ));
    }

    #[test]
    fn generation_is_deterministic() {
        for kind in [
            GeneratorKind::Empty,
            GeneratorKind::default(),
            GeneratorKind::Terrain {
                seed: 7,
                base_height: 4,
            },
        ] {
            let a = Generator::new(kind);
            let b = Generator::new(kind);
            for position in [IVec3::ZERO, IVec3::new(-3, 0, 9), IVec3::new(1, -1, 1)] {
                assert_eq!(cells(&a.generate(position)), cells(&b.generate(position)));
            }
        }
    }

    #[test]
    fn block_at_agrees_with_generated_chunk() {
        let generator = Generator::new(GeneratorKind::Terrain {
            seed: 99,
            base_height: 2,
        });
        let position = IVec3::new(-1, 0, 2);
        let data = cells(&generator.generate(position));
        for index in (0..CHUNK_VOLUME).step_by(97) {
            let (x, y, z) = index_to_coords(index);
            let world = position * CHUNK_SIZE_I32 + IVec3::new(x as i32, y as i32, z as i32);
            assert_eq!(data[index], generator.block_at(world));
        }
    }
}
