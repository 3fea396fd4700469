/// Block ids, faces and the immutable block registry
/// Using u8 ids so a chunk cell is one byte on disk and in memory
use crate::error::{AssetLoadError, RegistryError};
use crate::rendering::texture::{Texture, TextureId, TextureRegistry};
use serde::{Deserialize, Serialize};

/// Upper bound on registered block types
pub const MAX_BLOCK_TYPES: usize = 16;

#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct BlockId(pub u8);

impl BlockId {
    pub const AIR: BlockId = BlockId(0);
    pub const GRASS: BlockId = BlockId(1);
    pub const DIRT: BlockId = BlockId(2);
    pub const OAK_PLANKS: BlockId = BlockId(3);
    pub const QUARTZ: BlockId = BlockId(4);
    pub const BARRIER: BlockId = BlockId(5);

    #[inline]
    pub const fn is_air(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Cube face, in the order block texture tables are written
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockFace {
    NegZ = 0,
    PosZ = 1,
    NegY = 2,
    PosY = 3,
    NegX = 4,
    PosX = 5,
}

impl BlockFace {
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Immutable block descriptor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    id: BlockId,
    name: String,
    /// Rays pass through, collision still blocks
    transparent: bool,
    faces: [TextureId; 6],
}

impl Block {
    pub fn new(id: BlockId, name: impl Into<String>, faces: [TextureId; 6]) -> Self {
        Self {
            id,
            name: name.into(),
            transparent: false,
            faces,
        }
    }

    pub fn air() -> Self {
        Self::new(BlockId::AIR, "air", [0; 6]).with_transparency(true)
    }

    pub fn with_transparency(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    #[inline]
    pub fn id(&self) -> BlockId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is_air(&self) -> bool {
        self.id.is_air()
    }

    #[inline]
    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    /// True when a ray should stop at this block
    #[inline]
    pub fn is_opaque(&self) -> bool {
        !self.is_air() && !self.transparent
    }

    #[inline]
    pub fn texture_id(&self, face: BlockFace) -> TextureId {
        self.faces[face.index()]
    }

    pub fn faces(&self) -> &[TextureId; 6] {
        &self.faces
    }

    /// Resolve the texture for one face
    pub fn texture<'a>(
        &self,
        face: BlockFace,
        textures: &'a TextureRegistry,
    ) -> Result<&'a Texture, AssetLoadError> {
        textures.texture(self.texture_id(face))
    }
}

/// Block table indexed by id. Built once, shared read-only.
#[derive(Clone, Debug)]
pub struct BlockRegistry {
    blocks: Vec<Block>,
    /// Cached opacity so the DDA inner loop avoids touching descriptors
    opaque: [bool; MAX_BLOCK_TYPES],
}

impl BlockRegistry {
    pub fn new(blocks: Vec<Block>) -> Result<Self, RegistryError> {
        if blocks.is_empty() {
            return Err(RegistryError::Empty);
        }
        if blocks.len() > MAX_BLOCK_TYPES {
            return Err(RegistryError::TooManyBlocks {
                count: blocks.len(),
                max: MAX_BLOCK_TYPES,
            });
        }
        for (index, block) in blocks.iter().enumerate() {
            if block.id.index() != index {
                return Err(RegistryError::IdMismatch {
                    index,
                    id: block.id.0,
                });
            }
        }
        // Id 0 always reads as air, so its descriptor must not claim to be solid
        if !blocks[0].transparent {
            return Err(RegistryError::AirNotFirst {
                name: blocks[0].name.clone(),
            });
        }

        let mut opaque = [false; MAX_BLOCK_TYPES];
        for block in &blocks {
            opaque[block.id.index()] = block.is_opaque();
        }

        Ok(Self { blocks, opaque })
    }

    /// The stock block table. Faces ordered -Z, +Z, -Y, +Y, -X, +X.
    pub fn builtin() -> Self {
        use crate::rendering::texture::builtin as tex;

        let blocks = vec![
            Block::air(),
            Block::new(
                BlockId::GRASS,
                "grass",
                [
                    tex::GRASS_SIDE,
                    tex::GRASS_SIDE,
                    tex::DIRT,
                    tex::GRASS_TOP,
                    tex::GRASS_SIDE,
                    tex::GRASS_SIDE,
                ],
            ),
            Block::new(BlockId::DIRT, "dirt", [tex::DIRT; 6]),
            Block::new(BlockId::OAK_PLANKS, "oak-plank", [tex::PLANKS; 6]),
            Block::new(
                BlockId::QUARTZ,
                "quartz-block-chiseled",
                [
                    tex::QUARTZ_SIDE,
                    tex::QUARTZ_SIDE,
                    tex::QUARTZ_TOP,
                    tex::QUARTZ_TOP,
                    tex::QUARTZ_SIDE,
                    tex::QUARTZ_SIDE,
                ],
            ),
            Block::new(BlockId::BARRIER, "barrier", [0; 6]).with_transparency(true),
        ];

        match Self::new(blocks) {
            Ok(registry) => registry,
            Err(err) => unreachable!("builtin block table is invalid: {err}"),
        }
    }

    /// Look up a block. Panics on ids outside the table.
    #[inline]
    pub fn get(&self, id: BlockId) -> &Block {
        match self.blocks.get(id.index()) {
            Some(block) => block,
            None => panic!(
                "block id {} out of range (registry holds {})",
                id.0,
                self.blocks.len()
            ),
        }
    }

    #[inline]
    pub fn contains(&self, id: BlockId) -> bool {
        id.index() < self.blocks.len()
    }

    /// Opacity by id without bounds panics; unregistered ids never stop a ray
    #[inline]
    pub fn is_opaque(&self, id: BlockId) -> bool {
        self.opaque.get(id.index()).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// Ids a player may place: everything visible
    pub fn selectable(&self) -> Vec<BlockId> {
        self.blocks
            .iter()
            .filter(|block| block.is_opaque())
            .map(Block::id)
            .collect()
    }

    /// Check every visible block resolves all six face textures
    pub fn validate(&self, textures: &TextureRegistry) -> Result<(), RegistryError> {
        for block in self.blocks.iter().filter(|b| b.is_opaque()) {
            for &texture in block.faces() {
                if texture as usize >= textures.len() {
                    return Err(RegistryError::MissingTexture {
                        block: block.name.clone(),
                        texture,
                        available: textures.len(),
                    });
                }
            }
        }
        Ok(())
    }
}
