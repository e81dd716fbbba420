//! Windowed game loop
//!
//! Each redraw runs input, scene update and scene render in order on the
//! main thread. Network tasks run on the tokio runtime and only reach the
//! game through the session queues.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use furrow_game::{AppContext, SceneManager, WorldScene};
use furrow_net::{transport, Message, NetMode, Session};
use furrow_render::window::{create_event_loop, window_attributes, WindowConfig};
use furrow_render::{SpriteBatch, WgpuBackend, DEFAULT_CAPACITY};
use furrow_services::GameConfig;
use glam::Vec2;
use tokio::runtime::Runtime;
use tracing::{debug, error, info};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

use crate::keymap::{key_code, mouse_code};
use crate::launch::Launch;

/// Pixels of a touchpad scroll counted as one wheel notch.
const PIXELS_PER_NOTCH: f64 = 40.0;

struct Gpu {
    backend: WgpuBackend,
    batch: SpriteBatch,
}

struct App {
    // keeps network tasks alive
    _runtime: Runtime,
    ctx: AppContext,
    scenes: SceneManager,
    window_config: WindowConfig,
    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,
    last_frame: Instant,
    failure: Option<anyhow::Error>,
}

pub fn run(runtime: Runtime, config: GameConfig, launch: Launch) -> Result<()> {
    let session = match launch.net_mode {
        NetMode::Client => {
            let endpoint = runtime.block_on(transport::connect(launch.address.as_str()))?;
            endpoint.send(Message::RequestSave)?;
            info!(server = %launch.address, "joined");
            Session::Client(endpoint)
        }
        _ => Session::Standalone,
    };
    let save = launch.world()?;

    let window_config = WindowConfig {
        width: config.window_size.x,
        height: config.window_size.y,
        vsync: config.use_vsync,
        ..WindowConfig::default()
    };
    let mut scenes = SceneManager::new();
    scenes.change_scene(Box::new(WorldScene::new(save)));

    let mut app = App {
        _runtime: runtime,
        ctx: AppContext::new(config, &launch.asset_dir, &launch.save_dir).with_session(session),
        scenes,
        window_config,
        window: None,
        gpu: None,
        last_frame: Instant::now(),
        failure: None,
    };

    let event_loop = create_event_loop()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    event_loop.run_app(&mut app)?;

    match app.failure.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

impl App {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!(%err, "stopping");
        self.failure = Some(err);
        self.shutdown(event_loop);
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut gpu) = self.gpu.take() {
            self.scenes.shutdown(&mut self.ctx, &mut gpu.backend);
            gpu.batch.destroy(&mut gpu.backend);
        }
        event_loop.exit();
    }

    fn start_graphics(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = Arc::new(event_loop.create_window(window_attributes(&self.window_config))?);
        let mut backend =
            pollster::block_on(WgpuBackend::new(window.clone(), self.window_config.vsync))?;
        let batch = SpriteBatch::new(&mut backend, DEFAULT_CAPACITY)?;
        self.window = Some(window);
        self.gpu = Some(Gpu { backend, batch });
        self.last_frame = Instant::now();
        Ok(())
    }

    fn frame(&mut self) -> Result<()> {
        let Some(gpu) = self.gpu.as_mut() else {
            return Ok(());
        };
        let now = Instant::now();
        let dt = now - self.last_frame;
        self.last_frame = now;

        self.scenes.update(dt, &mut self.ctx, &mut gpu.backend)?;
        self.scenes.render(&mut gpu.batch, &self.ctx, &mut gpu.backend)?;
        gpu.backend.render_frame()?;
        self.ctx.input.begin_frame();
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.start_graphics(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),
            WindowEvent::Resized(size) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.backend.resize(size.width, size.height);
                }
                self.scenes
                    .resize(Vec2::new(size.width as f32, size.height as f32));
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(key) = event.physical_key else {
                    return;
                };
                match key_code(key) {
                    Some(code) => self
                        .ctx
                        .input
                        .set_key(code, event.state == ElementState::Pressed),
                    None => debug!(?key, "key outside the binding space"),
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.ctx
                    .input
                    .set_mouse_button(mouse_code(button), state == ElementState::Pressed);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.ctx
                    .input
                    .set_mouse_position(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let notches = match delta {
                    MouseScrollDelta::LineDelta(x, y) => Vec2::new(x, y),
                    MouseScrollDelta::PixelDelta(p) => Vec2::new(
                        (p.x / PIXELS_PER_NOTCH) as f32,
                        (p.y / PIXELS_PER_NOTCH) as f32,
                    ),
                };
                self.ctx.input.add_scroll(notches);
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.frame() {
                    self.fail(event_loop, err);
                    return;
                }
                if self.ctx.should_quit() {
                    self.shutdown(event_loop);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}
