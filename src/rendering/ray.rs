/// Grid traversal (DDA) through a voxel store
///
/// The ray direction is never normalized: per-axis delta distances are
/// derived from it directly, so distances come out in units of the ray
/// parameter and stay free of fisheye distortion.
use crate::count_add;
use crate::perf::RAYCAST_COUNTERS;
use crate::voxel::{BlockFace, BlockId, BlockRegistry};
use crate::world::{voxel_at, VoxelStore};
use glam::{IVec3, Vec3};

/// Stand-in for an infinite delta when a direction component is zero
pub const NO_CROSSING: f32 = 1e30;

/// Axis whose cell boundary the ray crossed on its final step
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// A ray that stopped on an opaque cell
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
    /// Cell that stopped the ray
    pub cell: IVec3,
    pub block: BlockId,
    /// Collision side
    pub side: Axis,
    /// Distance along the ray parameter to the struck face
    pub perp_wall_dist: f32,
    /// Largest distance reachable on `side` before the cutoff, used for fog
    pub max_perp_wall_dist: f32,
    /// Cells stepped through, including the hit cell
    pub steps: u32,
}

impl Ray {
    /// Point where the ray meets the struck face
    #[inline]
    pub fn hit_point(&self) -> Vec3 {
        self.origin + self.dir * self.perp_wall_dist
    }

    /// Face of the hit cell the ray struck.
    /// Travelling towards +axis strikes the cell's -axis face.
    #[inline]
    pub fn face(&self) -> BlockFace {
        match self.side {
            Axis::X if self.dir.x > 0.0 => BlockFace::NegX,
            Axis::X => BlockFace::PosX,
            Axis::Y if self.dir.y > 0.0 => BlockFace::NegY,
            Axis::Y => BlockFace::PosY,
            Axis::Z if self.dir.z < 0.0 => BlockFace::PosZ,
            Axis::Z => BlockFace::NegZ,
        }
    }

    /// Empty cell in front of the struck face, one step back along `side`
    #[inline]
    pub fn adjacent_cell(&self) -> IVec3 {
        let component = self.dir[self.side.index()];
        let mut cell = self.cell;
        cell[self.side.index()] += if component < 0.0 { 1 } else { -1 };
        cell
    }
}

#[inline]
fn delta_dist(component: f32) -> f32 {
    if component == 0.0 {
        NO_CROSSING
    } else {
        (1.0 / component).abs()
    }
}

/// Cast from `origin` along `dir` until an opaque cell is entered.
///
/// Returns None when every axis would pass `max_distance` or the ray leaves
/// the store. The cell containing `origin` is never reported.
pub fn cast_ray<S: VoxelStore + ?Sized>(
    store: &S,
    blocks: &BlockRegistry,
    origin: Vec3,
    dir: Vec3,
    max_distance: f32,
) -> Option<Ray> {
    let delta = Vec3::new(delta_dist(dir.x), delta_dist(dir.y), delta_dist(dir.z));
    let mut cell = voxel_at(origin);
    let cell_origin = cell.as_vec3();

    let mut step = IVec3::ONE;
    let mut side_dist = Vec3::ZERO;
    for axis in 0..3 {
        if dir[axis] < 0.0 {
            step[axis] = -1;
            side_dist[axis] = (origin[axis] - cell_origin[axis]) * delta[axis];
        } else {
            side_dist[axis] = (cell_origin[axis] + 1.0 - origin[axis]) * delta[axis];
        }
    }

    let mut steps = 0u32;
    loop {
        // Ties prefer x, then y, then z
        let side = if side_dist.x <= side_dist.y
            && side_dist.x <= side_dist.z
            && side_dist.x <= max_distance
        {
            Axis::X
        } else if side_dist.y <= side_dist.z && side_dist.y <= max_distance {
            Axis::Y
        } else if side_dist.z <= max_distance {
            Axis::Z
        } else {
            count_add!(RAYCAST_COUNTERS.dda_steps, steps as u64);
            return None;
        };

        let axis = side.index();
        side_dist[axis] += delta[axis];
        cell[axis] += step[axis];
        steps += 1;

        if !store.contains(cell) {
            count_add!(RAYCAST_COUNTERS.dda_steps, steps as u64);
            return None;
        }
        let block = store.get_block(cell);
        if blocks.is_opaque(block) {
            count_add!(RAYCAST_COUNTERS.dda_steps, steps as u64);
            return Some(Ray {
                origin,
                dir,
                cell,
                block,
                side,
                perp_wall_dist: side_dist[axis] - delta[axis],
                max_perp_wall_dist: max_distance - delta[axis],
                steps,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::FlatWorld;
    use glam::UVec3;
    use std::sync::Arc;

    fn store_with(cells: &[(IVec3, BlockId)]) -> (FlatWorld, BlockRegistry) {
        let blocks = BlockRegistry::builtin();
        let mut world = FlatWorld::new(UVec3::splat(8), Arc::new(blocks.clone()));
        for &(pos, id) in cells {
            world.set_block(pos, id);
        }
        (world, blocks)
    }

    #[test]
    fn zero_component_uses_sentinel() {
        assert_eq!(delta_dist(0.0), NO_CROSSING);
        assert_eq!(delta_dist(-0.5), 2.0);
    }

    #[test]
    fn straight_ray_hits_near_face() {
        let (world, blocks) = store_with(&[(IVec3::new(4, 1, 1), BlockId::DIRT)]);
        let ray = cast_ray(&world, &blocks, Vec3::new(1.5, 1.5, 1.5), Vec3::X, 30.0).unwrap();
        assert_eq!(ray.cell, IVec3::new(4, 1, 1));
        assert_eq!(ray.side, Axis::X);
        assert_eq!(ray.face(), BlockFace::NegX);
        assert!((ray.perp_wall_dist - 2.5).abs() < 1e-6);
        assert_eq!(ray.adjacent_cell(), IVec3::new(3, 1, 1));
        assert_eq!(ray.steps, 3);
    }

    #[test]
    fn negative_direction_hits_positive_face() {
        let (world, blocks) = store_with(&[(IVec3::new(1, 0, 2), BlockId::GRASS)]);
        let ray = cast_ray(&world, &blocks, Vec3::new(1.5, 3.5, 2.5), Vec3::NEG_Y, 30.0).unwrap();
        assert_eq!(ray.side, Axis::Y);
        assert_eq!(ray.face(), BlockFace::PosY);
        assert!((ray.perp_wall_dist - 2.5).abs() < 1e-6);
        assert_eq!(ray.adjacent_cell(), IVec3::new(1, 1, 2));
    }

    #[test]
    fn start_cell_is_never_reported() {
        let (world, blocks) = store_with(&[(IVec3::new(2, 2, 2), BlockId::QUARTZ)]);
        assert!(cast_ray(&world, &blocks, Vec3::splat(2.5), Vec3::Z, 30.0).is_none());
    }

    #[test]
    fn transparent_cells_let_rays_through() {
        let (world, blocks) = store_with(&[
            (IVec3::new(2, 0, 0), BlockId::BARRIER),
            (IVec3::new(3, 0, 0), BlockId::OAK_PLANKS),
        ]);
        let ray = cast_ray(&world, &blocks, Vec3::new(0.5, 0.5, 0.5), Vec3::X, 30.0).unwrap();
        assert_eq!(ray.cell, IVec3::new(3, 0, 0));
        assert_eq!(ray.block, BlockId::OAK_PLANKS);
    }

    #[test]
    fn cutoff_stops_short_of_far_blocks() {
        let (world, blocks) = store_with(&[(IVec3::new(7, 0, 0), BlockId::DIRT)]);
        let origin = Vec3::new(0.5, 0.5, 0.5);
        assert!(cast_ray(&world, &blocks, origin, Vec3::X, 5.0).is_none());
        let ray = cast_ray(&world, &blocks, origin, Vec3::X, 7.0).unwrap();
        assert!((ray.max_perp_wall_dist - 6.0).abs() < 1e-6);
    }
}
