pub mod framebuffer;
/// Software raycasting pipeline
/// DDA traversal, texel shading and parallel frame assembly
pub mod ray;
pub mod raycaster;
pub mod shading;
pub mod texture;

pub use framebuffer::{FrameSlice, Framebuffer};
pub use ray::{cast_ray, Axis, Ray};
pub use raycaster::{Raycaster, RenderMode, DEFAULT_MAX_RAY_DISTANCE};
pub use shading::ShadingConfig;
pub use texture::{Texture, TextureId, TextureRegistry, TEXTURE_HEIGHT, TEXTURE_WIDTH};
