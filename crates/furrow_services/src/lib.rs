//! Furrow Services Layer
//!
//! Platform-facing services: the config file, input bindings and
//! per-frame input state, and the save directory.

pub mod config;
pub mod input;
pub mod saves;

pub use config::{ConfigError, GameConfig, WindowSize};
pub use input::{Action, BindError, Binding, BindingType, Commands, InputState};
pub use saves::{next_save_path, read_json, write_json, SaveDirError};
