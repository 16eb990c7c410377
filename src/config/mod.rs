//! Configuration for the headless renderer
//!
//! Provides types and loading for `fryfall.toml`.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
