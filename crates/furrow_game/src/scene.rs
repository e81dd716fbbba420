//! Scene management
//!
//! One scene is active at a time. A change requested during a frame takes
//! effect at the start of the next update: the old scene is destroyed, its
//! registry emptied and the shared resources released before the next one
//! initializes.

use std::time::Duration;

use furrow_core::ecs::Registry;
use furrow_render::{Camera2D, FrameStats, RenderBackend, SpriteBatch};
use glam::Vec2;
use tracing::{debug, info};

use crate::context::AppContext;
use crate::error::WorldError;

/// What the manager should do after a scene update.
pub enum Transition {
    Stay,
    Switch(Box<dyn Scene>),
    Quit,
}

pub trait Scene {
    fn name(&self) -> &str;

    fn initialize(
        &mut self,
        ctx: &mut AppContext,
        backend: &mut dyn RenderBackend,
    ) -> Result<(), WorldError>;

    fn update(&mut self, dt: Duration, ctx: &mut AppContext) -> Result<Transition, WorldError>;

    /// Queue this frame's draws. The manager owns `begin` and `end`.
    fn render(&self, batch: &mut SpriteBatch, ctx: &AppContext);

    fn camera(&self) -> Option<&Camera2D> {
        None
    }

    fn registry_mut(&mut self) -> Option<&mut Registry> {
        None
    }

    fn resize(&mut self, _viewport: Vec2) {}

    fn destroy(&mut self, _ctx: &mut AppContext, _backend: &mut dyn RenderBackend) {}
}

#[derive(Default)]
pub struct SceneManager {
    current: Option<Box<dyn Scene>>,
    pending: Option<Box<dyn Scene>>,
}

impl SceneManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn change_scene(&mut self, next: Box<dyn Scene>) {
        if let Some(replaced) = self.pending.replace(next) {
            debug!(scene = replaced.name(), "pending scene replaced");
        }
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current.as_deref().map(|scene| scene.name())
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Swap in the pending scene, if any. Returns whether a swap happened.
    pub fn apply_pending(
        &mut self,
        ctx: &mut AppContext,
        backend: &mut dyn RenderBackend,
    ) -> Result<bool, WorldError> {
        let Some(mut next) = self.pending.take() else {
            return Ok(false);
        };
        self.teardown(ctx, backend);
        next.initialize(ctx, backend)?;
        info!(scene = next.name(), "scene started");
        self.current = Some(next);
        Ok(true)
    }

    fn teardown(&mut self, ctx: &mut AppContext, backend: &mut dyn RenderBackend) {
        let Some(mut scene) = self.current.take() else {
            return;
        };
        scene.destroy(ctx, backend);
        if let Some(registry) = scene.registry_mut() {
            registry.clear();
        }
        ctx.resources.clear(backend);
        ctx.events.clear();
        info!(scene = scene.name(), "scene stopped");
    }

    pub fn update(
        &mut self,
        dt: Duration,
        ctx: &mut AppContext,
        backend: &mut dyn RenderBackend,
    ) -> Result<(), WorldError> {
        self.apply_pending(ctx, backend)?;
        let Some(scene) = self.current.as_mut() else {
            return Ok(());
        };
        match scene.update(dt, ctx)? {
            Transition::Stay => {}
            Transition::Switch(next) => self.change_scene(next),
            Transition::Quit => ctx.request_quit(),
        }
        Ok(())
    }

    /// Draw the current scene through `batch` and flush it.
    pub fn render(
        &self,
        batch: &mut SpriteBatch,
        ctx: &AppContext,
        backend: &mut dyn RenderBackend,
    ) -> Result<FrameStats, WorldError> {
        let scene = self.current.as_deref();
        batch.begin(scene.and_then(|scene| scene.camera()));
        if let Some(scene) = scene {
            scene.render(batch, ctx);
        }
        Ok(batch.end(backend)?)
    }

    pub fn resize(&mut self, viewport: Vec2) {
        if let Some(scene) = self.current.as_mut() {
            scene.resize(viewport);
        }
    }

    /// Destroy the current scene and drop any pending one.
    pub fn shutdown(&mut self, ctx: &mut AppContext, backend: &mut dyn RenderBackend) {
        self.pending = None;
        self.teardown(ctx, backend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use furrow_render::{DrawParams, RecordingBackend};
    use furrow_services::GameConfig;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Journal = Rc<RefCell<Vec<String>>>;

    struct Probe {
        name: &'static str,
        journal: Journal,
        registry: Registry,
        next: Option<&'static str>,
        quit: bool,
    }

    impl Probe {
        fn boxed(name: &'static str, journal: &Journal) -> Box<Self> {
            Box::new(Self {
                name,
                journal: journal.clone(),
                registry: Registry::new(),
                next: None,
                quit: false,
            })
        }

        fn log(&self, what: &str) {
            self.journal.borrow_mut().push(format!("{} {what}", self.name));
        }
    }

    impl Scene for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn initialize(
            &mut self,
            ctx: &mut AppContext,
            backend: &mut dyn RenderBackend,
        ) -> Result<(), WorldError> {
            self.registry.create_entity();
            ctx.resources.textures.load(backend, "missing.png")?;
            self.log("init");
            Ok(())
        }

        fn update(&mut self, _dt: Duration, _ctx: &mut AppContext) -> Result<Transition, WorldError> {
            self.log("update");
            if self.quit {
                return Ok(Transition::Quit);
            }
            Ok(match self.next.take() {
                Some(name) => Transition::Switch(Probe::boxed(name, &self.journal)),
                None => Transition::Stay,
            })
        }

        fn render(&self, batch: &mut SpriteBatch, _ctx: &AppContext) {
            batch.filled_rectangle(Vec2::ZERO, Vec2::splat(8.0), DrawParams::at_z(0));
        }

        fn registry_mut(&mut self) -> Option<&mut Registry> {
            Some(&mut self.registry)
        }

        fn destroy(&mut self, _ctx: &mut AppContext, _backend: &mut dyn RenderBackend) {
            self.log(&format!("destroy with {} entities", self.registry.entity_count()));
        }
    }

    fn context() -> AppContext {
        AppContext::new(GameConfig::default(), "no-assets", "no-saves")
    }

    #[test]
    fn change_is_deferred_to_the_next_update() {
        let journal = Journal::default();
        let mut ctx = context();
        let mut backend = RecordingBackend::new();
        let mut scenes = SceneManager::new();

        scenes.change_scene(Probe::boxed("menu", &journal));
        assert!(scenes.has_pending());
        assert_eq!(scenes.current_name(), None);
        assert!(journal.borrow().is_empty());

        scenes.update(Duration::ZERO, &mut ctx, &mut backend).unwrap();
        assert_eq!(scenes.current_name(), Some("menu"));
        assert_eq!(*journal.borrow(), ["menu init", "menu update"]);
    }

    #[test]
    fn switching_tears_the_old_scene_down_first() {
        let journal = Journal::default();
        let mut ctx = context();
        let mut backend = RecordingBackend::new();
        let mut scenes = SceneManager::new();

        let mut menu = Probe::boxed("menu", &journal);
        menu.next = Some("world");
        scenes.change_scene(menu);
        scenes.update(Duration::ZERO, &mut ctx, &mut backend).unwrap();
        let checkerboard = backend.textures[0].handle();
        assert!(backend.is_live(checkerboard));

        scenes.update(Duration::ZERO, &mut ctx, &mut backend).unwrap();
        assert_eq!(scenes.current_name(), Some("world"));
        assert_eq!(
            *journal.borrow(),
            [
                "menu init",
                "menu update",
                "menu destroy with 1 entities",
                "world init",
                "world update"
            ]
        );
        assert!(!backend.is_live(checkerboard), "resources released on teardown");
    }

    #[test]
    fn render_flushes_the_current_scene() {
        let journal = Journal::default();
        let mut ctx = context();
        let mut backend = RecordingBackend::new();
        let mut batch = SpriteBatch::new(&mut backend, 16).unwrap();
        let mut scenes = SceneManager::new();

        let idle = scenes.render(&mut batch, &ctx, &mut backend).unwrap();
        assert_eq!(idle.elements, 0);

        scenes.change_scene(Probe::boxed("menu", &journal));
        scenes.update(Duration::ZERO, &mut ctx, &mut backend).unwrap();
        backend.reset_frame();
        let stats = scenes.render(&mut batch, &ctx, &mut backend).unwrap();
        assert_eq!(stats.elements, 1);
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(backend.draws.len(), 1);
    }

    #[test]
    fn quit_and_shutdown() {
        let journal = Journal::default();
        let mut ctx = context();
        let mut backend = RecordingBackend::new();
        let mut scenes = SceneManager::new();

        let mut menu = Probe::boxed("menu", &journal);
        menu.quit = true;
        scenes.change_scene(menu);
        scenes.update(Duration::ZERO, &mut ctx, &mut backend).unwrap();
        assert!(ctx.should_quit());

        scenes.change_scene(Probe::boxed("never", &journal));
        scenes.shutdown(&mut ctx, &mut backend);
        assert_eq!(scenes.current_name(), None);
        assert!(!scenes.has_pending());
        assert_eq!(journal.borrow().last().map(String::as_str), Some("menu destroy with 1 entities"));
    }
}
