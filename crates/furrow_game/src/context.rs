//! Application context
//!
//! Everything a scene may reach outside of itself. The context is passed
//! by reference into every scene call; nothing is looked up globally.

use std::path::PathBuf;

use furrow_asset::Resources;
use furrow_core::event::EventBus;
use furrow_net::Session;
use furrow_services::{GameConfig, InputState};

pub struct AppContext {
    pub config: GameConfig,
    pub resources: Resources,
    pub input: InputState,
    pub events: EventBus,
    pub session: Session,
    /// Where new worlds are saved.
    pub save_dir: PathBuf,
    quit: bool,
}

impl AppContext {
    pub fn new(
        config: GameConfig,
        asset_root: impl Into<PathBuf>,
        save_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            resources: Resources::new(asset_root),
            input: InputState::new(),
            events: EventBus::new(),
            session: Session::Standalone,
            save_dir: save_dir.into(),
            quit: false,
        }
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    pub fn is_action_down(&self, action: &str) -> bool {
        self.input.is_action_down(&self.config.commands, action)
    }

    pub fn is_action_pressed(&self, action: &str) -> bool {
        self.input.is_action_pressed(&self.config.commands, action)
    }

    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use furrow_services::input::keys;

    #[test]
    fn actions_resolve_through_the_config() {
        let mut ctx = AppContext::new(GameConfig::default(), "assets", "saves");
        assert!(!ctx.is_action_down("endTurn"));

        ctx.input.set_key(keys::ENTER, true);
        assert!(ctx.is_action_down("endTurn"));
        assert!(ctx.is_action_pressed("endTurn"));

        ctx.input.begin_frame();
        assert!(ctx.is_action_down("endTurn"));
        assert!(!ctx.is_action_pressed("endTurn"));
        assert!(!ctx.is_action_down("noSuchAction"));
    }

    #[test]
    fn starts_standalone() {
        let mut ctx = AppContext::new(GameConfig::default(), "assets", "saves");
        assert!(ctx.session.has_authority());
        assert!(!ctx.should_quit());
        ctx.request_quit();
        assert!(ctx.should_quit());
    }
}
