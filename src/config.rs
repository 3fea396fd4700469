/// Engine configuration, read from TOML.
/// Every section falls back to defaults, so an empty file is a valid config.
use crate::camera::{PLANE_X_LENGTH, PLANE_Y_LENGTH};
use crate::error::ConfigError;
use crate::player::{
    PlayerBody, DEFAULT_LOOK_SENSITIVITY, DEFAULT_MOVE_SPEED, DEFAULT_REACH, DEFAULT_SPAWN,
};
use crate::rendering::{RenderMode, ShadingConfig, DEFAULT_MAX_RAY_DISTANCE};
use crate::voxel::{GeneratorKind, CHUNK_SIZE};
use crate::world::{flat_volume, WorldConfig, MAX_FLAT_CELLS};
use glam::{UVec3, Vec3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Widest view cube the ray reach alone may ask for
const MAX_REACH_VIEW_DISTANCE: i32 = 4;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub screen: ScreenSettings,
    pub render: RenderSettings,
    pub world: WorldSettings,
    pub textures: TextureSettings,
    pub player: PlayerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenSettings {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for ScreenSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 400,
            title: "voxel-raycaster".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub max_ray_distance: f32,
    pub mode: RenderMode,
    pub shading: ShadingConfig,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            max_ray_distance: DEFAULT_MAX_RAY_DISTANCE,
            mode: RenderMode::Full,
            shading: ShadingConfig::default(),
        }
    }
}

/// Which voxel store backs the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorldLayout {
    /// Unbounded-looking world paged in 16^3 chunks
    #[default]
    Chunked,
    /// One fixed-size map stored as a single file
    Flat {
        width: u32,
        height: u32,
        depth: u32,
        map_id: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    pub layout: WorldLayout,
    pub generator: GeneratorKind,
    /// Chunks kept resident around the player, per direction
    pub view_distance: i32,
    pub max_resident_chunks: usize,
    /// Where `.map` files live; None keeps the world in memory only
    pub save_dir: Option<PathBuf>,
    pub regenerate_corrupt: bool,
}

impl Default for WorldSettings {
    fn default() -> Self {
        let chunked = WorldConfig::default();
        Self {
            layout: WorldLayout::Chunked,
            generator: GeneratorKind::default(),
            view_distance: chunked.view_distance,
            max_resident_chunks: chunked.max_resident_chunks,
            save_dir: chunked.save_dir,
            regenerate_corrupt: chunked.regenerate_corrupt,
        }
    }
}

impl WorldSettings {
    pub fn chunk_config(&self) -> WorldConfig {
        WorldConfig {
            view_distance: self.view_distance,
            max_resident_chunks: self.max_resident_chunks,
            save_dir: self.save_dir.clone(),
            regenerate_corrupt: self.regenerate_corrupt,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureSettings {
    /// Directory with the block PNGs; None selects the procedural set
    pub dir: Option<PathBuf>,
    /// Decode every texture at startup instead of on first use
    pub preload: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub spawn: Vec3,
    pub move_speed: f32,
    /// Radians per pixel of pointer motion
    pub look_sensitivity: f32,
    pub reach: f32,
    pub body: PlayerBody,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            spawn: DEFAULT_SPAWN,
            move_speed: DEFAULT_MOVE_SPEED,
            look_sensitivity: DEFAULT_LOOK_SENSITIVITY,
            reach: DEFAULT_REACH,
            body: PlayerBody::default(),
        }
    }
}

impl EngineConfig {
    /// Read and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.screen.width == 0 || self.screen.height == 0 {
            return Err(invalid(format!(
                "screen must be at least 1x1, got {}x{}",
                self.screen.width, self.screen.height
            )));
        }

        let max = self.render.max_ray_distance;
        if !max.is_finite() || max <= 0.0 {
            return Err(invalid(format!("max_ray_distance must be positive, got {max}")));
        }
        if let RenderMode::Coarse { block: 0 } = self.render.mode {
            return Err(invalid("coarse render block must be at least 1 pixel"));
        }

        if self.world.view_distance < 0 {
            return Err(invalid(format!(
                "view_distance must not be negative, got {}",
                self.world.view_distance
            )));
        }
        if let WorldLayout::Flat {
            width,
            height,
            depth,
            ..
        } = self.world.layout
        {
            if width == 0 || height == 0 || depth == 0 {
                return Err(invalid(format!(
                    "flat world must be at least 1x1x1, got {width}x{height}x{depth}"
                )));
            }
            match flat_volume(UVec3::new(width, height, depth)) {
                Some(cells) if cells <= MAX_FLAT_CELLS => {}
                _ => {
                    return Err(invalid(format!(
                        "flat world {width}x{height}x{depth} exceeds {MAX_FLAT_CELLS} cells"
                    )))
                }
            }
        }

        let player = &self.player;
        if !player.spawn.is_finite() {
            return Err(invalid("player spawn must be finite"));
        }
        if player.move_speed < 0.0 || player.reach <= 0.0 || player.look_sensitivity < 0.0 {
            return Err(invalid(
                "move_speed and look_sensitivity must be non-negative, reach positive",
            ));
        }
        let body = &player.body;
        if body.half_width < 0.0
            || body.half_depth < 0.0
            || body.upper_half_height < 0.0
            || body.lower_half_height < 0.0
        {
            return Err(invalid("player body extents must be non-negative"));
        }
        Ok(())
    }

    /// Chunked world settings, with the view cube widened to cover the longest ray
    pub fn chunk_config(&self) -> WorldConfig {
        let mut world = self.world.chunk_config();
        let reach = ray_reach_chunks(self.render.max_ray_distance);
        if reach > world.view_distance {
            log::debug!(
                "view distance {} raised to {} chunks for ray reach",
                world.view_distance,
                reach
            );
            world.view_distance = reach;
        }
        world
    }

    /// Flat world size, if the layout is flat
    pub fn flat_size(&self) -> Option<UVec3> {
        match self.world.layout {
            WorldLayout::Flat {
                width,
                height,
                depth,
                ..
            } => Some(UVec3::new(width, height, depth)),
            WorldLayout::Chunked => None,
        }
    }
}

/// Chunks a screen-corner ray can cross, capped so long rays fall back to reading files
fn ray_reach_chunks(max_ray_distance: f32) -> i32 {
    let corner = Vec3::new(PLANE_X_LENGTH, PLANE_Y_LENGTH, 1.0).length();
    let chunks = (max_ray_distance * corner / CHUNK_SIZE as f32).ceil();
    (chunks as i32).clamp(0, MAX_REACH_VIEW_DISTANCE)
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.validate().is_ok());
        assert_eq!(config.render.max_ray_distance, 30.0);
        assert_eq!(config.player.spawn, Vec3::new(1.5, 3.5, 1.5));
    }

    #[test]
    fn parses_every_section() {
        let raw = r#"
            [screen]
            width = 320
            height = 200

            [render]
            mode = { kind = "coarse", block = 3 }
            shading = { background = 0, fog = false }

            [world]
            layout = { kind = "flat", width = 32, height = 16, depth = 32, map_id = 1 }
            generator = { kind = "terrain", seed = 42, base_height = 4 }
            save_dir = "saves"

            [textures]
            dir = "assets/textures"
            preload = true

            [player]
            spawn = [2.5, 6.0, 2.5]
            reach = 6.0
        "#;
        let config: EngineConfig = toml::from_str(raw).unwrap();
        config.validate().unwrap();
        assert_eq!(config.screen.width, 320);
        assert_eq!(config.render.mode, RenderMode::Coarse { block: 3 });
        assert!(!config.render.shading.fog);
        assert!(config.render.shading.side_shading);
        assert_eq!(config.flat_size(), Some(UVec3::new(32, 16, 32)));
        assert_eq!(
            config.world.generator,
            GeneratorKind::Terrain {
                seed: 42,
                base_height: 4
            }
        );
        assert_eq!(config.world.chunk_config().save_dir, Some(PathBuf::from("saves")));
        assert!(config.textures.preload);
        assert_eq!(config.player.spawn, Vec3::new(2.5, 6.0, 2.5));
        assert_eq!(config.player.move_speed, DEFAULT_MOVE_SPEED);
    }

    #[test]
    fn rejects_nonsense() {
        let mut config = EngineConfig::default();
        config.render.max_ray_distance = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = EngineConfig::default();
        config.render.mode = RenderMode::Coarse { block: 0 };
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.world.layout = WorldLayout::Flat {
            width: 4,
            height: 0,
            depth: 4,
            map_id: 0,
        };
        assert!(config.validate().is_err());

        // 2048*2048*1024 wraps to zero in u32
        config.world.layout = WorldLayout::Flat {
            width: 2048,
            height: 2048,
            depth: 1024,
            map_id: 0,
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn view_cube_covers_corner_rays() {
        let mut config = EngineConfig::default();
        config.world.view_distance = 1;
        // 30 * |(0.66, 0.4125, 1)| is just over 38 cells
        assert_eq!(config.chunk_config().view_distance, 3);

        config.world.view_distance = 5;
        assert_eq!(config.chunk_config().view_distance, 5);

        config.world.view_distance = 0;
        config.render.max_ray_distance = 1e6;
        assert_eq!(config.chunk_config().view_distance, MAX_REACH_VIEW_DISTANCE);
    }

    #[test]
    fn load_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        fs::write(&path, "[screen\nwidth = 1").unwrap();
        match EngineConfig::load(&path) {
            Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected parse error, got {other:?}"),
        }
        assert!(matches!(
            EngineConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
