//! Furrow Game
//!
//! The farming game itself: the persisted world, its turn rules and bots,
//! and the scenes that show it.

pub mod bot;
pub mod cell;
pub mod components;
pub mod context;
pub mod error;
pub mod events;
pub mod item;
pub mod player;
pub mod save;
pub mod scene;
pub mod scenes;
pub mod turn;

pub use cell::Cell;
pub use context::AppContext;
pub use error::WorldError;
pub use item::{Item, ItemKind};
pub use player::{Player, PlayerColors, PlayerType, Village};
pub use save::{Save, WorldSettings};
pub use scene::{Scene, SceneManager, Transition};
pub use scenes::WorldScene;
pub use turn::{TurnController, TurnOutcome};
