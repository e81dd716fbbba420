//! Furrow Core
//!
//! Contains the fundamental simulation systems:
//! - Entity Component System (ECS) registry
//! - Deterministic math and seeded random numbers
//! - Turn clock
//! - Typed event bus

pub mod ecs;
pub mod event;
pub mod math;
pub mod time;

pub use glam;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
