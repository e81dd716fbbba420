//! Concrete scenes

pub mod world;

pub use world::WorldScene;
