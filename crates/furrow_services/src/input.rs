//! Input bindings and per-frame input state
//!
//! Key codes follow the windowing library's numbering: printable keys at
//! 32..96, F1..F13 at 290..302, keypad digits at 320..329. Mouse buttons
//! are numbered from 0 (left).

use std::collections::{BTreeMap, HashSet};

use furrow_core::glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named key codes used by the default bindings.
pub mod keys {
    pub const SPACE: i32 = 32;
    pub const A: i32 = 65;
    pub const D: i32 = 68;
    pub const S: i32 = 83;
    pub const T: i32 = 84;
    pub const W: i32 = 87;
    pub const GRAVE_ACCENT: i32 = 96;
    pub const ENTER: i32 = 257;
    pub const F1: i32 = 290;
    pub const F2: i32 = 291;
    pub const F13: i32 = 302;
    pub const KP_0: i32 = 320;
    pub const KP_9: i32 = 329;
    pub const LEFT_CONTROL: i32 = 341;
    pub const LEFT_ALT: i32 = 342;
    pub const RIGHT_CONTROL: i32 = 345;
    pub const RIGHT_ALT: i32 = 346;

    pub const MOUSE_LEFT: i32 = 0;
    pub const MOUSE_RIGHT: i32 = 1;
    pub const MOUSE_LAST: i32 = 7;
}

pub type Commands = BTreeMap<String, Action>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingType {
    Keyboard,
    Mouse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binding {
    #[serde(rename = "type")]
    pub kind: BindingType,
    pub key: i32,
}

impl Binding {
    pub fn keyboard(key: i32) -> Self {
        Self {
            kind: BindingType::Keyboard,
            key,
        }
    }

    pub fn mouse(button: i32) -> Self {
        Self {
            kind: BindingType::Mouse,
            key: button,
        }
    }

    /// Display label, `None` for codes that cannot be bound.
    pub fn label(&self) -> Option<String> {
        match self.kind {
            BindingType::Keyboard => key_label(self.key),
            BindingType::Mouse => mouse_label(self.key),
        }
    }
}

/// Ordered bindings of one action. The first one is shown in menus and
/// replaced when rebinding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

impl Action {
    pub fn new(binding: Binding) -> Self {
        Self {
            bindings: vec![binding],
        }
    }

    pub fn first_binding(&self) -> Option<Binding> {
        self.bindings.first().copied()
    }

    pub fn remove_first_binding(&mut self) -> Option<Binding> {
        if self.bindings.is_empty() {
            None
        } else {
            Some(self.bindings.remove(0))
        }
    }

    pub fn insert_first_binding(&mut self, binding: Binding) {
        self.bindings.insert(0, binding);
    }

    pub fn is_bound_to(&self, binding: Binding) -> bool {
        self.bindings.contains(&binding)
    }

    /// Device of the first binding.
    pub fn device(&self) -> Option<BindingType> {
        self.first_binding().map(|binding| binding.kind)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("no action named {0:?}")]
    UnknownAction(String),

    #[error("{binding:?} is already bound to {action:?}")]
    AlreadyBound { binding: Binding, action: String },

    #[error("code {0} has no label and cannot be bound")]
    UnsupportedKey(i32),

    #[error("action {action:?} takes {expected:?} bindings")]
    WrongDevice {
        action: String,
        expected: BindingType,
    },
}

pub fn key_label(key: i32) -> Option<String> {
    match key {
        keys::F1..=keys::F13 => Some(format!("F{}", key - keys::F1 + 1)),
        keys::SPACE => Some("Space".to_string()),
        keys::GRAVE_ACCENT => Some("GraveAccent".to_string()),
        33..=95 => char::from_u32(key as u32).map(|c| c.to_ascii_uppercase().to_string()),
        keys::KP_0..=keys::KP_9 => Some(format!("Keypad {}", key - keys::KP_0)),
        keys::LEFT_CONTROL => Some("LCtrl".to_string()),
        keys::RIGHT_CONTROL => Some("RCtrl".to_string()),
        keys::LEFT_ALT => Some("LAlt".to_string()),
        keys::RIGHT_ALT => Some("RAlt".to_string()),
        _ => None,
    }
}

pub fn mouse_label(button: i32) -> Option<String> {
    match button {
        keys::MOUSE_LEFT => Some("LMB".to_string()),
        keys::MOUSE_RIGHT => Some("RMB".to_string()),
        2..=keys::MOUSE_LAST => Some(format!("Button{}", button + 1)),
        _ => None,
    }
}

pub fn default_commands() -> Commands {
    let entries = [
        ("goUp", Binding::keyboard(keys::W)),
        ("goDown", Binding::keyboard(keys::S)),
        ("goLeft", Binding::keyboard(keys::A)),
        ("goRight", Binding::keyboard(keys::D)),
        ("showTerritory", Binding::keyboard(keys::T)),
        ("putItem", Binding::mouse(keys::MOUSE_LEFT)),
        ("getItem", Binding::mouse(keys::MOUSE_RIGHT)),
        ("debugMenu", Binding::keyboard(keys::F1)),
        ("showPerformance", Binding::keyboard(keys::F2)),
        ("endTurn", Binding::keyboard(keys::ENTER)),
    ];
    entries
        .into_iter()
        .map(|(name, binding)| (name.to_string(), Action::new(binding)))
        .collect()
}

/// Action already holding `binding`, if any.
pub fn find_binding(commands: &Commands, binding: Binding) -> Option<&str> {
    commands
        .iter()
        .find(|(_, action)| action.is_bound_to(binding))
        .map(|(name, _)| name.as_str())
}

/// Replace the first binding of `action_name` with `binding`.
///
/// The binding must use the action's device, have a display label, and not
/// be held by another action.
pub fn rebind(commands: &mut Commands, action_name: &str, binding: Binding) -> Result<(), BindError> {
    let action = commands
        .get(action_name)
        .ok_or_else(|| BindError::UnknownAction(action_name.to_string()))?;

    if let Some(expected) = action.device() {
        if expected != binding.kind {
            return Err(BindError::WrongDevice {
                action: action_name.to_string(),
                expected,
            });
        }
    }
    if binding.label().is_none() {
        return Err(BindError::UnsupportedKey(binding.key));
    }
    if action.first_binding() == Some(binding) {
        return Ok(());
    }
    if let Some(holder) = find_binding(commands, binding) {
        return Err(BindError::AlreadyBound {
            binding,
            action: holder.to_string(),
        });
    }

    if let Some(action) = commands.get_mut(action_name) {
        action.remove_first_binding();
        action.insert_first_binding(binding);
    }
    Ok(())
}

/// Keyboard and mouse state for the current and previous frame.
///
/// The default value has nothing held, which is what headless nodes use.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    keys: HashSet<i32>,
    previous_keys: HashSet<i32>,
    buttons: HashSet<i32>,
    previous_buttons: HashSet<i32>,
    mouse_position: Vec2,
    scroll: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roll current state into the previous frame.
    pub fn begin_frame(&mut self) {
        self.previous_keys.clone_from(&self.keys);
        self.previous_buttons.clone_from(&self.buttons);
        self.scroll = Vec2::ZERO;
    }

    pub fn set_key(&mut self, key: i32, down: bool) {
        if down {
            self.keys.insert(key);
        } else {
            self.keys.remove(&key);
        }
    }

    pub fn set_mouse_button(&mut self, button: i32, down: bool) {
        if down {
            self.buttons.insert(button);
        } else {
            self.buttons.remove(&button);
        }
    }

    pub fn set_mouse_position(&mut self, position: Vec2) {
        self.mouse_position = position;
    }

    pub fn add_scroll(&mut self, delta: Vec2) {
        self.scroll += delta;
    }

    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    pub fn scroll(&self) -> Vec2 {
        self.scroll
    }

    pub fn is_key_down(&self, key: i32) -> bool {
        self.keys.contains(&key)
    }

    pub fn is_key_pressed(&self, key: i32) -> bool {
        self.keys.contains(&key) && !self.previous_keys.contains(&key)
    }

    pub fn is_key_released(&self, key: i32) -> bool {
        !self.keys.contains(&key) && self.previous_keys.contains(&key)
    }

    pub fn is_mouse_down(&self, button: i32) -> bool {
        self.buttons.contains(&button)
    }

    pub fn is_mouse_pressed(&self, button: i32) -> bool {
        self.buttons.contains(&button) && !self.previous_buttons.contains(&button)
    }

    pub fn is_mouse_released(&self, button: i32) -> bool {
        !self.buttons.contains(&button) && self.previous_buttons.contains(&button)
    }

    pub fn is_binding_down(&self, binding: Binding) -> bool {
        match binding.kind {
            BindingType::Keyboard => self.is_key_down(binding.key),
            BindingType::Mouse => self.is_mouse_down(binding.key),
        }
    }

    pub fn is_binding_pressed(&self, binding: Binding) -> bool {
        match binding.kind {
            BindingType::Keyboard => self.is_key_pressed(binding.key),
            BindingType::Mouse => self.is_mouse_pressed(binding.key),
        }
    }

    pub fn is_action_down(&self, commands: &Commands, action: &str) -> bool {
        commands
            .get(action)
            .is_some_and(|a| a.bindings.iter().any(|b| self.is_binding_down(*b)))
    }

    pub fn is_action_pressed(&self, commands: &Commands, action: &str) -> bool {
        commands
            .get(action)
            .is_some_and(|a| a.bindings.iter().any(|b| self.is_binding_pressed(*b)))
    }
}
