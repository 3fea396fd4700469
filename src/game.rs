/// Session: owns the world, the player and the frame target, and advances
/// them one frame at a time from window-agnostic input
use crate::config::{EngineConfig, WorldLayout};
use crate::error::{AssetLoadError, ChunkError, EngineError};
use crate::input::{ButtonEdges, FrameInput};
use crate::perf::FrameStats;
use crate::perf_scope;
use crate::player::{Interaction, Player};
use crate::rendering::{Framebuffer, Raycaster, TextureRegistry};
use crate::voxel::{BlockRegistry, Generator};
use crate::world::{FlatWorld, VoxelStore, World};
use std::sync::Arc;

/// Highest number of cells the spawn point is lifted to clear terrain
const MAX_SPAWN_LIFT: u32 = 256;

pub struct Game {
    blocks: Arc<BlockRegistry>,
    store: Box<dyn VoxelStore>,
    player: Player,
    raycaster: Raycaster,
    framebuffer: Framebuffer,
    buttons: ButtonEdges,
    frame_index: u64,
}

impl Game {
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let blocks = Arc::new(BlockRegistry::builtin());
        let textures = match &config.textures.dir {
            Some(dir) => TextureRegistry::from_dir(dir),
            None => TextureRegistry::procedural(),
        };
        blocks.validate(&textures)?;
        if config.textures.preload {
            textures.load_all()?;
            log::info!("preloaded {} textures", textures.len());
        }

        let store = build_store(config, blocks.clone())?;
        Self::with_store(config, blocks, Arc::new(textures), store)
    }

    /// Session over a caller-built store
    pub fn with_store(
        config: &EngineConfig,
        blocks: Arc<BlockRegistry>,
        textures: Arc<TextureRegistry>,
        mut store: Box<dyn VoxelStore>,
    ) -> Result<Self, EngineError> {
        let settings = &config.player;
        let mut player = Player::new(settings.spawn, blocks.selectable());
        player.body = settings.body;
        player.move_speed = settings.move_speed;
        player.look_sensitivity = settings.look_sensitivity;
        player.reach = settings.reach;

        store.prepare(player.position)?;
        lift_clear(store.as_ref(), &mut player);

        let raycaster = Raycaster::new(blocks.clone(), textures)
            .with_shading(config.render.shading)
            .with_mode(config.render.mode)
            .with_max_ray_distance(config.render.max_ray_distance);
        let framebuffer = Framebuffer::new(
            config.screen.width as usize,
            config.screen.height as usize,
        );

        log::info!(
            "session ready: {}x{} {:?}, player at {}",
            config.screen.width,
            config.screen.height,
            config.render.mode,
            player.position
        );

        Ok(Self {
            blocks,
            store,
            player,
            raycaster,
            framebuffer,
            buttons: ButtonEdges::new(),
            frame_index: 0,
        })
    }

    /// Advance one frame: look, move, interact, page the world, render
    pub fn step(&mut self, input: &FrameInput, dt: f32) -> Result<FrameStats, AssetLoadError> {
        perf_scope!("frame");
        self.frame_index += 1;

        self.player.look(input.mouse_delta);
        self.player.walk(self.store.as_ref(), &input.movement, dt);

        let pressed = self.buttons.update(input.left_down, input.right_down);
        if pressed.left {
            let outcome = self.player.remove_block(self.store.as_mut(), &self.raycaster);
            log_interaction("remove", outcome);
        }
        if pressed.right {
            let outcome = self.player.place_block(self.store.as_mut(), &self.raycaster);
            log_interaction("place", outcome);
        }
        if input.select_delta != 0 {
            self.player.cycle_selection(input.select_delta);
            if let Some(id) = self.player.selected_block() {
                log::info!("selected {}", self.blocks.get(id).name());
            }
        }

        // A failed page-in leaves the generator's content visible; keep going
        if let Err(err) = self.store.prepare(self.player.position) {
            log::error!("world update failed: {}", err);
        }

        let stats = self.raycaster.render(
            self.store.as_ref(),
            self.player.position,
            &self.player.camera,
            &mut self.framebuffer,
        )?;

        if stats.over_budget() {
            log::warn!(
                "frame {} took {:.2}ms ({} rays, {:.0}% hit)",
                self.frame_index,
                stats.elapsed.as_secs_f64() * 1000.0,
                stats.rays,
                stats.hit_ratio() * 100.0
            );
        }
        Ok(stats)
    }

    /// Write the world to disk. Returns the number of files written.
    pub fn save(&mut self) -> Result<usize, ChunkError> {
        let written = self.store.save()?;
        log::info!("saved {} file(s)", written);
        Ok(written)
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if width == 0 || height == 0 {
            return;
        }
        self.framebuffer.resize(width, height);
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    pub fn store(&self) -> &dyn VoxelStore {
        self.store.as_ref()
    }

    pub fn raycaster(&self) -> &Raycaster {
        &self.raycaster
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }
}

fn build_store(
    config: &EngineConfig,
    blocks: Arc<BlockRegistry>,
) -> Result<Box<dyn VoxelStore>, ChunkError> {
    let settings = &config.world;
    let generator = Generator::new(settings.generator);

    Ok(match settings.layout {
        WorldLayout::Chunked => {
            let chunk_config = config.chunk_config();
            log::info!(
                "chunked world, view distance {}, {:?}",
                chunk_config.view_distance,
                settings.generator
            );
            Box::new(World::new(chunk_config, generator, blocks))
        }
        WorldLayout::Flat { map_id, .. } => {
            let size = config.flat_size().unwrap_or_default();
            Box::new(FlatWorld::open(
                size,
                map_id,
                settings.save_dir.clone(),
                &generator,
                blocks,
                settings.regenerate_corrupt,
            )?)
        }
    })
}

/// Raise the player cell by cell until its body is clear of solid blocks
fn lift_clear(store: &dyn VoxelStore, player: &mut Player) {
    let start = player.position;
    for _ in 0..MAX_SPAWN_LIFT {
        if !player.body.intersects(store, player.position) {
            if player.position != start {
                log::info!("spawn {} is blocked, moved to {}", start, player.position);
            }
            return;
        }
        player.position.y += 1.0;
    }
    log::warn!("no free space above spawn {}", start);
    player.position = start;
}

fn log_interaction(action: &str, outcome: Interaction) {
    match outcome {
        Interaction::Placed(_) | Interaction::Removed(_) => log::debug!("{}: {:?}", action, outcome),
        _ => log::trace!("{} rejected: {:?}", action, outcome),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldLayout;
    use crate::voxel::{BlockId, GeneratorKind};
    use glam::{IVec3, Vec3};

    fn flat_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.screen.width = 32;
        config.screen.height = 20;
        config.world.layout = WorldLayout::Flat {
            width: 8,
            height: 8,
            depth: 8,
            map_id: 0,
        };
        config.world.generator = GeneratorKind::Flat {
            ground: BlockId::GRASS,
        };
        config
    }

    #[test]
    fn spawn_is_lifted_out_of_terrain() {
        let mut config = flat_config();
        config.player.spawn = Vec3::new(1.5, 0.5, 1.5);
        let game = Game::new(&config).unwrap();
        assert!(!game.player().body.intersects(game.store(), game.player().position));
        assert!(game.player().position.y > 0.5);
    }

    #[test]
    fn button_press_acts_once() {
        let mut game = Game::new(&flat_config()).unwrap();
        // Look straight down at the grass layer
        assert!(game.player_mut().camera.try_pitch(1.5));
        let below = IVec3::new(1, 0, 1);
        assert_eq!(game.store().get_block(below), BlockId::GRASS);

        let input = FrameInput {
            left_down: true,
            ..FrameInput::default()
        };
        game.step(&input, 0.016).unwrap();
        assert_eq!(game.store().get_block(below), BlockId::AIR);

        // Held button does not repeat
        game.store.set_block(below, BlockId::DIRT);
        game.step(&input, 0.016).unwrap();
        assert_eq!(game.store().get_block(below), BlockId::DIRT);
    }

    #[test]
    fn step_renders_the_frame() {
        let mut game = Game::new(&flat_config()).unwrap();
        let stats = game.step(&FrameInput::default(), 0.016).unwrap();
        assert_eq!(stats.rays, 32 * 20);
        assert_eq!(game.frame_index(), 1);
        assert!(stats.hits > 0);
    }
}
