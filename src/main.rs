/// Main application entry point
/// Handles window creation, input, and the frame loop
use anyhow::{anyhow, Context};
use glam::Vec2;
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;
use voxel_raycaster::*;
use winit::{
    event::*,
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => EngineConfig::default(),
    };

    log::info!("Controls: WASD move, Space/Shift up/down, mouse look");
    log::info!("          left click remove, right click place, arrows select, ESC exit");

    let mut game = Game::new(&config).context("starting session")?;

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.screen.title.as_str())
            .with_inner_size(winit::dpi::LogicalSize::new(
                config.screen.width,
                config.screen.height,
            ))
            .build(&event_loop)?,
    );

    let context = softbuffer::Context::new(window.clone()).map_err(|e| anyhow!("{e}"))?;
    let mut surface =
        softbuffer::Surface::new(&context, window.clone()).map_err(|e| anyhow!("{e}"))?;

    let mut input = FrameInput::default();
    let mut last_mouse_pos: Option<(f64, f64)> = None;
    let mut last_frame = Instant::now();
    let mut frame_count = 0u32;
    let mut fps_timer = Instant::now();

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    if let Err(err) = game.save() {
                        log::error!("save failed: {}", err);
                    }
                    elwt.exit();
                }
                WindowEvent::Resized(new_size) => {
                    game.resize(new_size.width as usize, new_size.height as usize);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    let pressed = event.state == ElementState::Pressed;

                    if let PhysicalKey::Code(keycode) = event.physical_key {
                        match keycode {
                            KeyCode::KeyW => input.movement.forward_pressed = pressed,
                            KeyCode::KeyS => input.movement.backward_pressed = pressed,
                            KeyCode::KeyA => input.movement.left_pressed = pressed,
                            KeyCode::KeyD => input.movement.right_pressed = pressed,
                            KeyCode::Space => input.movement.up_pressed = pressed,
                            KeyCode::ShiftLeft => input.movement.down_pressed = pressed,
                            KeyCode::ArrowRight | KeyCode::ArrowUp if pressed => {
                                input.select_delta += 1;
                            }
                            KeyCode::ArrowLeft | KeyCode::ArrowDown if pressed => {
                                input.select_delta -= 1;
                            }
                            KeyCode::Escape if pressed => {
                                if let Err(err) = game.save() {
                                    log::error!("save failed: {}", err);
                                }
                                elwt.exit();
                            }
                            _ => {}
                        }
                    }
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    let down = state == ElementState::Pressed;
                    match button {
                        MouseButton::Left => input.left_down = down,
                        MouseButton::Right => input.right_down = down,
                        _ => {}
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    if let Some(last_pos) = last_mouse_pos {
                        input.mouse_delta += Vec2::new(
                            (position.x - last_pos.0) as f32,
                            (position.y - last_pos.1) as f32,
                        );
                    }
                    last_mouse_pos = Some((position.x, position.y));
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let dt = (now - last_frame).as_secs_f32();
                    last_frame = now;

                    if let Err(err) = game.step(&input, dt) {
                        log::error!("frame failed: {}", err);
                    }
                    input.mouse_delta = Vec2::ZERO;
                    input.select_delta = 0;

                    if let Err(err) = present(&mut surface, game.framebuffer()) {
                        log::error!("present failed: {}", err);
                    }

                    frame_count += 1;
                    if fps_timer.elapsed().as_secs() >= 1 {
                        log::info!(
                            "FPS: {} | position: {:.1} | block: {:?}",
                            frame_count,
                            game.player().position,
                            game.player().selected_block()
                        );
                        frame_count = 0;
                        fps_timer = Instant::now();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    #[cfg(feature = "profiling")]
    RAYCAST_COUNTERS.snapshot().log_report();

    Ok(())
}

/// Copy the framebuffer to the window surface
fn present(
    surface: &mut softbuffer::Surface<Arc<winit::window::Window>, Arc<winit::window::Window>>,
    framebuffer: &Framebuffer,
) -> anyhow::Result<()> {
    let (Some(width), Some(height)) = (
        NonZeroU32::new(framebuffer.width as u32),
        NonZeroU32::new(framebuffer.height as u32),
    ) else {
        return Ok(());
    };
    surface.resize(width, height).map_err(|e| anyhow!("{e}"))?;

    let mut buffer = surface.buffer_mut().map_err(|e| anyhow!("{e}"))?;
    buffer.copy_from_slice(framebuffer.pixels());
    buffer.present().map_err(|e| anyhow!("{e}"))?;
    Ok(())
}
