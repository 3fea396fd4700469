/// Pixel shading for ray hits.
/// Kept separate from traversal so the color model can evolve
/// independently of the DDA loop.
use super::ray::{Axis, Ray};
use super::texture::{TextureRegistry, TEXTURE_HEIGHT, TEXTURE_WIDTH};
use crate::error::AssetLoadError;
use crate::voxel::BlockRegistry;
use serde::{Deserialize, Serialize};

/// Directional darkening plus linear fog towards white.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingConfig {
    /// Color for rays that hit nothing, 0x00RRGGBB
    pub background: u32,
    /// Blend hits towards white by distance
    pub fog: bool,
    /// Halve Y and Z faces so edges read without lighting
    pub side_shading: bool,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            background: 0xFF_FF_FF,
            fog: true,
            side_shading: true,
        }
    }
}

impl ShadingConfig {
    /// Final color of a hit pixel.
    /// Fails only when the face texture cannot be loaded.
    pub fn shade(
        &self,
        ray: &Ray,
        blocks: &BlockRegistry,
        textures: &TextureRegistry,
    ) -> Result<u32, AssetLoadError> {
        let (tex_x, tex_y) = texel_coords(ray);
        let texture = blocks.get(ray.block).texture(ray.face(), textures)?;
        // Texture rows run top-down, wall coordinates bottom-up
        let mut color = texture.pixel(tex_x, TEXTURE_HEIGHT - tex_y - 1);

        if self.side_shading && ray.side != Axis::X {
            color = darken(color);
        }
        if self.fog {
            color = add_fog(color, fog_amount(ray.perp_wall_dist, ray.max_perp_wall_dist));
        }
        Ok(color)
    }
}

/// Texel under the hit point, before the vertical flip.
/// X is mirrored on faces seen from their back so opposite faces read the same way round.
#[inline]
pub fn texel_coords(ray: &Ray) -> (usize, usize) {
    let hit = ray.hit_point();
    let (wall_x, wall_y) = match ray.side {
        Axis::X => (hit.z, hit.y),
        Axis::Y => (hit.x, hit.z),
        Axis::Z => (hit.x, hit.y),
    };
    let wall_x = wall_x - wall_x.floor();
    let wall_y = wall_y - wall_y.floor();

    let mut tex_x = ((wall_x * TEXTURE_WIDTH as f32) as usize).min(TEXTURE_WIDTH - 1);
    let tex_y = ((wall_y * TEXTURE_HEIGHT as f32) as usize).min(TEXTURE_HEIGHT - 1);

    let mirrored = match ray.side {
        Axis::X => ray.dir.x > 0.0,
        Axis::Y => ray.dir.y > 0.0,
        Axis::Z => ray.dir.z < 0.0,
    };
    if mirrored {
        tex_x = TEXTURE_WIDTH - tex_x - 1;
    }
    (tex_x, tex_y)
}

/// Halve every channel
#[inline]
pub const fn darken(color: u32) -> u32 {
    (color >> 1) & 0x7F_7F_7F
}

/// Fog strength in 0..=255, linear in distance
#[inline]
pub fn fog_amount(perp_wall_dist: f32, max_perp_wall_dist: f32) -> u32 {
    let ratio = perp_wall_dist / max_perp_wall_dist.max(f32::EPSILON);
    (255.0 * ratio).clamp(0.0, 255.0) as u32
}

/// Add `fog` to each channel, saturating at 255
#[inline]
pub fn add_fog(color: u32, fog: u32) -> u32 {
    let r = (((color >> 16) & 0xFF) + fog).min(0xFF);
    let g = (((color >> 8) & 0xFF) + fog).min(0xFF);
    let b = ((color & 0xFF) + fog).min(0xFF);
    (r << 16) | (g << 8) | b
}
