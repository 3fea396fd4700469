/// Voxel stores: the paged chunk world and the fixed-size map
pub mod chunked;
pub mod flat;

pub use chunked::{World, WorldConfig};
pub use flat::{flat_volume, FlatWorld, MAX_FLAT_CELLS};

use crate::error::ChunkError;
use crate::voxel::{BlockId, BlockRegistry, CHUNK_SIZE};
use glam::{IVec3, Vec3};
use std::path::Path;

/// Block storage read by the raycaster and physics.
///
/// Reads never fail: anything outside the store is air. Writes outside the
/// store are ignored. Implementors must be `Sync` so a frame can be cast
/// from many threads against a shared reference.
pub trait VoxelStore: Sync {
    /// True when `pos` addresses a cell this store can hold
    fn contains(&self, pos: IVec3) -> bool;

    fn get_block(&self, pos: IVec3) -> BlockId;

    /// Panics on ids missing from the block registry
    fn set_block(&mut self, pos: IVec3, block: BlockId);

    /// Make the neighbourhood of `focus` resident before a frame
    fn prepare(&mut self, _focus: Vec3) -> Result<(), ChunkError> {
        Ok(())
    }

    /// Persist everything resident. Returns the number of files written.
    fn save(&mut self) -> Result<usize, ChunkError>;
}

/// Chunk coordinate containing a voxel (floor division)
#[inline]
pub fn world_to_chunk(pos: IVec3) -> IVec3 {
    pos.div_euclid(IVec3::splat(CHUNK_SIZE as i32))
}

/// Offset of a voxel inside its chunk, always in 0..CHUNK_SIZE
#[inline]
pub fn world_to_local(pos: IVec3) -> (usize, usize, usize) {
    let local = pos.rem_euclid(IVec3::splat(CHUNK_SIZE as i32));
    (local.x as usize, local.y as usize, local.z as usize)
}

/// Convert world position to chunk position
#[inline]
pub fn world_to_chunk_pos(world_pos: Vec3) -> IVec3 {
    world_to_chunk(voxel_at(world_pos))
}

/// Voxel cell containing a continuous point
#[inline]
pub fn voxel_at(point: Vec3) -> IVec3 {
    point.floor().as_ivec3()
}

/// Reject cell arrays naming blocks the registry does not know
pub(crate) fn check_known_blocks(
    cells: &[u8],
    blocks: &BlockRegistry,
    path: &Path,
) -> Result<(), ChunkError> {
    match cells.iter().find(|&&id| !blocks.contains(BlockId(id))) {
        Some(&id) => Err(ChunkError::UnknownBlock {
            path: path.to_path_buf(),
            id,
        }),
        None => Ok(()),
    }
}

/// Move an unreadable file out of the way so the next save does not clobber evidence
pub(crate) fn quarantine(path: &Path) -> Result<(), ChunkError> {
    let target = path.with_extension("map.corrupt");
    std::fs::rename(path, &target).map_err(|e| ChunkError::io(path, e))?;
    log::warn!(
        "moved corrupt map file {} to {}",
        path.display(),
        target.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_to_chunk_pos() {
        assert_eq!(world_to_chunk_pos(Vec3::ZERO), IVec3::ZERO);
        assert_eq!(world_to_chunk_pos(Vec3::new(15.9, 0.0, 15.9)), IVec3::ZERO);
        assert_eq!(
            world_to_chunk_pos(Vec3::new(32.0, 32.0, 32.0)),
            IVec3::new(2, 2, 2)
        );
        assert_eq!(
            world_to_chunk_pos(Vec3::new(-0.5, -1.0, -16.0)),
            IVec3::new(-1, -1, -1)
        );
    }

    #[test]
    fn negative_coordinates_floor() {
        assert_eq!(world_to_chunk(IVec3::new(-1, -16, -17)), IVec3::new(-1, -1, -2));
        assert_eq!(world_to_local(IVec3::new(-1, -16, -17)), (15, 0, 15));
        assert_eq!(world_to_local(IVec3::new(17, 0, 31)), (1, 0, 15));
    }

    #[test]
    fn unknown_ids_are_reported() {
        let blocks = BlockRegistry::builtin();
        let path = Path::new("00000000.map");
        assert!(check_known_blocks(&[0, 1, 2, 5], &blocks, path).is_ok());
        assert!(matches!(
            check_known_blocks(&[0, 1, 9], &blocks, path),
            Err(ChunkError::UnknownBlock { id: 9, .. })
        ));
    }
}
