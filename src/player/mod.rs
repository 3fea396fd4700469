/// First-person player: position, view basis, collision body and block interaction
use crate::camera::Camera;
use crate::input::MovementKeys;
use crate::rendering::{Axis, Raycaster};
use crate::voxel::BlockId;
use crate::world::{voxel_at, VoxelStore};
use glam::{IVec3, Vec2, Vec3};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SPAWN: Vec3 = Vec3::new(1.5, 3.5, 1.5);
pub const DEFAULT_MOVE_SPEED: f32 = 5.0;
pub const DEFAULT_LOOK_SENSITIVITY: f32 = 0.002;
pub const DEFAULT_REACH: f32 = 4.5;

/// Collision box around the eye position.
/// Only 12 points of it are ever tested: two x columns, two z columns and
/// three heights (feet, one block above the feet, just above the eye).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerBody {
    pub half_width: f32,
    pub half_depth: f32,
    /// Eye to top of head
    pub upper_half_height: f32,
    /// Eye to feet
    pub lower_half_height: f32,
}

impl Default for PlayerBody {
    fn default() -> Self {
        Self {
            half_width: 0.3,
            half_depth: 0.3,
            upper_half_height: 0.1,
            lower_half_height: 1.5,
        }
    }
}

impl PlayerBody {
    /// Cell under sample point (px, py, pz), px/pz in 0..2 and py in 0..3
    #[inline]
    pub fn sample_point(&self, position: Vec3, px: usize, py: usize, pz: usize) -> IVec3 {
        debug_assert!(px < 2 && py < 3 && pz < 2);
        let x = position.x + if px == 0 { -self.half_width } else { self.half_width };
        let y = match py {
            0 => position.y - self.lower_half_height,
            1 => position.y - self.lower_half_height + 1.0,
            _ => position.y + self.upper_half_height,
        };
        let z = position.z + if pz == 0 { -self.half_depth } else { self.half_depth };
        voxel_at(Vec3::new(x, y, z))
    }

    /// All 12 sample cells
    pub fn sample_points(&self, position: Vec3) -> impl Iterator<Item = IVec3> + '_ {
        (0..2).flat_map(move |px| {
            (0..3).flat_map(move |py| (0..2).map(move |pz| self.sample_point(position, px, py, pz)))
        })
    }

    /// Sample cells on the face leading a move along `axis`:
    /// 6 points for x and z, 4 for y
    pub fn leading_face(
        &self,
        position: Vec3,
        axis: Axis,
        positive: bool,
    ) -> impl Iterator<Item = IVec3> + '_ {
        (0..2).flat_map(move |px| {
            (0..3).flat_map(move |py| {
                (0..2).filter_map(move |pz| {
                    let on_face = match axis {
                        Axis::X => px == positive as usize,
                        Axis::Y => py == if positive { 2 } else { 0 },
                        Axis::Z => pz == positive as usize,
                    };
                    on_face.then(|| self.sample_point(position, px, py, pz))
                })
            })
        })
    }

    /// True when any sample cell holds a non-air block
    pub fn intersects<S: VoxelStore + ?Sized>(&self, store: &S, position: Vec3) -> bool {
        self.sample_points(position)
            .any(|cell| !store.get_block(cell).is_air())
    }
}

/// Outcome of a place or remove request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Placed(IVec3),
    Removed(IVec3),
    /// Centre ray hit nothing
    NoTarget,
    /// Hit lies beyond reach
    OutOfReach,
    /// Cell in front of the hit is not air
    Occupied,
    /// Cell in front of the hit lies outside the store
    OutOfBounds,
    /// New block would overlap the player
    Obstructed,
    /// No placeable block is selected
    NothingSelected,
}

pub struct Player {
    pub position: Vec3,
    pub camera: Camera,
    pub body: PlayerBody,
    pub move_speed: f32,
    pub look_sensitivity: f32,
    pub reach: f32,
    palette: Vec<BlockId>,
    selected: usize,
}

impl Player {
    /// `palette` lists the blocks selection cycles through
    pub fn new(position: Vec3, palette: Vec<BlockId>) -> Self {
        Self {
            position,
            camera: Camera::default(),
            body: PlayerBody::default(),
            move_speed: DEFAULT_MOVE_SPEED,
            look_sensitivity: DEFAULT_LOOK_SENSITIVITY,
            reach: DEFAULT_REACH,
            palette,
            selected: 0,
        }
    }

    pub fn selected_block(&self) -> Option<BlockId> {
        self.palette.get(self.selected).copied()
    }

    pub fn palette(&self) -> &[BlockId] {
        &self.palette
    }

    /// Step the selection by `delta`, wrapping at both ends
    pub fn cycle_selection(&mut self, delta: i32) {
        if self.palette.is_empty() || delta == 0 {
            return;
        }
        let len = self.palette.len() as i64;
        self.selected = (self.selected as i64 + delta as i64).rem_euclid(len) as usize;
    }

    /// Apply a relative pointer motion to the view
    pub fn look(&mut self, mouse_delta: Vec2) {
        self.camera
            .rotate(mouse_delta.x, mouse_delta.y, self.look_sensitivity);
    }

    /// Move for `dt` seconds along the held keys' direction.
    /// Returns the displacement actually applied.
    pub fn walk<S: VoxelStore + ?Sized>(&mut self, store: &S, keys: &MovementKeys, dt: f32) -> Vec3 {
        let intent = keys.intent(&self.camera);
        if intent == Vec3::ZERO {
            return Vec3::ZERO;
        }
        let displacement = intent.normalize() * self.move_speed * dt;
        self.move_by(store, displacement)
    }

    /// Axis-separated move: x, then y, then z. An axis whose leading face
    /// lands in a solid cell is reverted; the others still apply.
    pub fn move_by<S: VoxelStore + ?Sized>(&mut self, store: &S, displacement: Vec3) -> Vec3 {
        let mut applied = Vec3::ZERO;
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let i = axis.index();
            let amount = displacement[i];
            if amount == 0.0 {
                continue;
            }

            let previous = self.position[i];
            self.position[i] += amount;
            let blocked = self
                .body
                .leading_face(self.position, axis, amount > 0.0)
                .any(|cell| !store.get_block(cell).is_air());
            if blocked {
                self.position[i] = previous;
            } else {
                applied[i] = amount;
            }
        }
        applied
    }

    /// Clear the block under the crosshair
    pub fn remove_block<S: VoxelStore + ?Sized>(
        &self,
        store: &mut S,
        raycaster: &Raycaster,
    ) -> Interaction {
        let Some(ray) = raycaster.cast_centre(store, self.position, &self.camera) else {
            return Interaction::NoTarget;
        };
        if ray.perp_wall_dist > self.reach {
            return Interaction::OutOfReach;
        }
        store.set_block(ray.cell, BlockId::AIR);
        log::debug!("removed {:?} at {}", ray.block, ray.cell);
        Interaction::Removed(ray.cell)
    }

    /// Put the selected block against the face under the crosshair
    pub fn place_block<S: VoxelStore + ?Sized>(
        &self,
        store: &mut S,
        raycaster: &Raycaster,
    ) -> Interaction {
        let Some(block) = self.selected_block() else {
            return Interaction::NothingSelected;
        };
        let Some(ray) = raycaster.cast_centre(store, self.position, &self.camera) else {
            return Interaction::NoTarget;
        };
        if ray.perp_wall_dist > self.reach {
            return Interaction::OutOfReach;
        }

        let target = ray.adjacent_cell();
        if !store.contains(target) {
            return Interaction::OutOfBounds;
        }
        if !store.get_block(target).is_air() {
            return Interaction::Occupied;
        }

        store.set_block(target, block);
        if self.body.intersects(store, self.position) {
            store.set_block(target, BlockId::AIR);
            return Interaction::Obstructed;
        }
        log::debug!("placed {:?} at {}", block, target);
        Interaction::Placed(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_faces_have_expected_sizes() {
        let body = PlayerBody::default();
        let position = Vec3::new(5.5, 5.5, 5.5);
        assert_eq!(body.sample_points(position).count(), 12);
        assert_eq!(body.leading_face(position, Axis::X, true).count(), 6);
        assert_eq!(body.leading_face(position, Axis::Y, false).count(), 4);
        assert_eq!(body.leading_face(position, Axis::Z, false).count(), 6);
    }

    #[test]
    fn sample_heights_span_feet_to_head() {
        let body = PlayerBody::default();
        let position = Vec3::new(1.5, 3.5, 1.5);
        assert_eq!(body.sample_point(position, 0, 0, 0), IVec3::new(1, 2, 1));
        assert_eq!(body.sample_point(position, 1, 1, 1), IVec3::new(1, 3, 1));
        assert_eq!(body.sample_point(position, 1, 2, 0), IVec3::new(1, 3, 1));
        let head: Vec<_> = body.leading_face(position, Axis::Y, true).collect();
        assert!(head.iter().all(|cell| cell.y == 3));
    }

    #[test]
    fn negative_positions_floor() {
        let body = PlayerBody::default();
        let position = Vec3::new(-0.1, 1.0, 0.1);
        assert_eq!(body.sample_point(position, 0, 0, 0), IVec3::new(-1, -1, -1));
        assert_eq!(body.sample_point(position, 1, 0, 1), IVec3::new(0, -1, 0));
    }

    #[test]
    fn selection_wraps_both_ways() {
        let mut player = Player::new(DEFAULT_SPAWN, vec![BlockId::GRASS, BlockId::DIRT, BlockId::QUARTZ]);
        assert_eq!(player.selected_block(), Some(BlockId::GRASS));
        player.cycle_selection(-1);
        assert_eq!(player.selected_block(), Some(BlockId::QUARTZ));
        player.cycle_selection(2);
        assert_eq!(player.selected_block(), Some(BlockId::DIRT));

        let mut empty = Player::new(DEFAULT_SPAWN, Vec::new());
        empty.cycle_selection(1);
        assert_eq!(empty.selected_block(), None);
    }
}
