/// Per-pixel raycaster: one DDA walk per pixel (or per block in coarse mode)
/// fanned out over rayon, one task per framebuffer stripe
use super::framebuffer::{FrameSlice, Framebuffer};
use super::ray::{cast_ray, Ray};
use super::shading::ShadingConfig;
use super::texture::TextureRegistry;
use crate::camera::Camera;
use crate::count_call;
use crate::error::AssetLoadError;
use crate::perf::{FrameStats, RAYCAST_COUNTERS};
use crate::voxel::BlockRegistry;
use crate::world::VoxelStore;
use glam::Vec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Rays stop once the next boundary crossing lies beyond this distance
pub const DEFAULT_MAX_RAY_DISTANCE: f32 = 30.0;

/// How many rays a frame casts
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderMode {
    /// One ray per pixel
    #[default]
    Full,
    /// One ray per `block` x `block` square, cast through its centre and replicated
    Coarse { block: usize },
}

impl RenderMode {
    /// Side of the pixel square that shares one ray
    #[inline]
    pub fn block_size(self) -> usize {
        match self {
            RenderMode::Full => 1,
            RenderMode::Coarse { block } => block.max(1),
        }
    }
}

pub struct Raycaster {
    blocks: Arc<BlockRegistry>,
    textures: Arc<TextureRegistry>,
    pub shading: ShadingConfig,
    pub mode: RenderMode,
    pub max_ray_distance: f32,
}

impl Raycaster {
    pub fn new(blocks: Arc<BlockRegistry>, textures: Arc<TextureRegistry>) -> Self {
        Self {
            blocks,
            textures,
            shading: ShadingConfig::default(),
            mode: RenderMode::Full,
            max_ray_distance: DEFAULT_MAX_RAY_DISTANCE,
        }
    }

    pub fn with_shading(mut self, shading: ShadingConfig) -> Self {
        self.shading = shading;
        self
    }

    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_ray_distance(mut self, max_ray_distance: f32) -> Self {
        self.max_ray_distance = max_ray_distance;
        self
    }

    pub fn blocks(&self) -> &Arc<BlockRegistry> {
        &self.blocks
    }

    pub fn textures(&self) -> &Arc<TextureRegistry> {
        &self.textures
    }

    /// Cast a single ray with this raycaster's registry and cutoff
    #[inline]
    pub fn cast<S: VoxelStore + ?Sized>(&self, store: &S, origin: Vec3, dir: Vec3) -> Option<Ray> {
        cast_ray(store, &self.blocks, origin, dir, self.max_ray_distance)
    }

    /// The ray through the screen centre, used for block interaction
    #[inline]
    pub fn cast_centre<S: VoxelStore + ?Sized>(
        &self,
        store: &S,
        origin: Vec3,
        camera: &Camera,
    ) -> Option<Ray> {
        self.cast(store, origin, camera.dir)
    }

    /// Shaded color along `dir`, None when the ray hits nothing
    pub fn trace<S: VoxelStore + ?Sized>(
        &self,
        store: &S,
        origin: Vec3,
        dir: Vec3,
    ) -> Result<Option<u32>, AssetLoadError> {
        count_call!(RAYCAST_COUNTERS.rays_cast);
        match self.cast(store, origin, dir) {
            Some(ray) => {
                count_call!(RAYCAST_COUNTERS.rays_hit);
                self.shading.shade(&ray, &self.blocks, &self.textures).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Render a full frame. Framebuffer rows run top-down, so screen row
    /// `y` lands in framebuffer row `height - y - 1`.
    pub fn render<S: VoxelStore + ?Sized>(
        &self,
        store: &S,
        origin: Vec3,
        camera: &Camera,
        framebuffer: &mut Framebuffer,
    ) -> Result<FrameStats, AssetLoadError> {
        let frame_start = Instant::now();
        count_call!(RAYCAST_COUNTERS.frames);

        let block = self.mode.block_size();
        let thread_count = rayon::current_num_threads();
        let stripe_count = thread_count * 4; // Over-subscribe for load balancing

        let totals = framebuffer
            .split_into_stripes(stripe_count, block)
            .into_par_iter()
            .map(|mut slice| self.render_stripe(store, origin, camera, &mut slice, block))
            .try_reduce(
                || (0u64, 0u64),
                |a, b| Ok((a.0 + b.0, a.1 + b.1)),
            )?;

        Ok(FrameStats {
            rays: totals.0,
            hits: totals.1,
            elapsed: frame_start.elapsed(),
        })
    }

    /// Fill one stripe. Returns (rays, hits).
    fn render_stripe<S: VoxelStore + ?Sized>(
        &self,
        store: &S,
        origin: Vec3,
        camera: &Camera,
        slice: &mut FrameSlice<'_>,
        block: usize,
    ) -> Result<(u64, u64), AssetLoadError> {
        let width = slice.width;
        let height = slice.full_height;
        let (_, y0, _, y1) = slice.bounds();
        let mut rays = 0u64;
        let mut hits = 0u64;

        for row in (y0..y1).step_by(block) {
            // Sample the centre of each block, clamped to the frame
            let sample_row = (row + block / 2).min(height - 1);
            let screen_y = height - sample_row - 1;

            for column in (0..width).step_by(block) {
                let sample_x = (column + block / 2).min(width - 1);
                let dir = camera.pixel_ray(sample_x, screen_y, width, height);
                let color = match self.trace(store, origin, dir)? {
                    Some(color) => {
                        hits += 1;
                        color
                    }
                    None => self.shading.background,
                };
                rays += 1;

                if block == 1 {
                    slice.set_pixel(column, row, color);
                } else {
                    slice.fill_rect(column, row, column + block, row + block, color);
                }
            }
        }

        Ok((rays, hits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::BlockId;
    use crate::world::FlatWorld;
    use glam::{IVec3, UVec3};

    fn raycaster() -> Raycaster {
        Raycaster::new(
            Arc::new(BlockRegistry::builtin()),
            Arc::new(TextureRegistry::procedural()),
        )
    }

    #[test]
    fn empty_world_renders_background() {
        let raycaster = raycaster();
        let world = FlatWorld::new(UVec3::splat(4), raycaster.blocks().clone());
        let mut fb = Framebuffer::new(16, 10);
        let stats = raycaster
            .render(&world, Vec3::splat(2.0), &Camera::default(), &mut fb)
            .unwrap();
        assert_eq!(stats.rays, 160);
        assert_eq!(stats.hits, 0);
        assert!(fb.pixels().iter().all(|&p| p == 0xFF_FF_FF));
    }

    #[test]
    fn coarse_mode_casts_one_ray_per_block() {
        let raycaster = raycaster().with_mode(RenderMode::Coarse { block: 3 });
        let world = FlatWorld::new(UVec3::splat(4), raycaster.blocks().clone());
        let mut fb = Framebuffer::new(10, 7);
        let stats = raycaster
            .render(&world, Vec3::splat(2.0), &Camera::default(), &mut fb)
            .unwrap();
        // ceil(10/3) * ceil(7/3)
        assert_eq!(stats.rays, 4 * 3);
    }

    #[test]
    fn floor_appears_in_bottom_rows() {
        let raycaster = raycaster().with_shading(ShadingConfig {
            fog: false,
            ..ShadingConfig::default()
        });
        let mut world = FlatWorld::new(UVec3::new(16, 4, 16), raycaster.blocks().clone());
        for x in 0..16 {
            for z in 0..16 {
                world.set_block(IVec3::new(x, 0, z), BlockId::DIRT);
            }
        }
        let mut fb = Framebuffer::new(32, 20);
        let origin = Vec3::new(8.5, 1.5, 2.5);
        raycaster
            .render(&world, origin, &Camera::default(), &mut fb)
            .unwrap();

        let bottom = fb.pixel(16, 19).unwrap();
        let top = fb.pixel(16, 0).unwrap();
        assert_ne!(bottom, 0xFF_FF_FF, "looking down the bottom row meets the floor");
        assert_eq!(top, 0xFF_FF_FF, "top row looks over the world");
    }

    #[test]
    fn centre_ray_follows_camera_dir() {
        let raycaster = raycaster();
        let mut world = FlatWorld::new(UVec3::splat(8), raycaster.blocks().clone());
        world.set_block(IVec3::new(2, 2, 6), BlockId::QUARTZ);
        let ray = raycaster
            .cast_centre(&world, Vec3::new(2.5, 2.5, 1.5), &Camera::default())
            .unwrap();
        assert_eq!(ray.cell, IVec3::new(2, 2, 6));
        assert!((ray.perp_wall_dist - 4.5).abs() < 1e-6);
    }
}
