//! Fryfall - falling fries for a hero section
//!
//! This library provides:
//! - A headless particle simulation of fries, sparks, steam and debris
//! - A drawing-surface abstraction with a raster backend and a canvas backend
//! - Offscreen rendering to GIF/PNG driven by `fryfall.toml`
//! - Browser bindings (feature `wasm`)

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;
pub mod color;
pub mod config;
pub mod field;
pub mod gif;
pub mod headless;
pub mod hooks;
pub mod impact;
pub mod output;
pub mod particle;
pub mod raster;
pub mod render;
pub mod sim;
pub mod sprites;
pub mod surface;
pub mod theme;
#[cfg(feature = "wasm")]
pub mod wasm;

pub use field::{FrameScheduler, Host, ManualClock, ParticleField};
pub use sim::{SimOptions, Simulation};
pub use surface::{BlendMode, DrawSurface};
