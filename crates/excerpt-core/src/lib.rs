//! Excerpt Core - Region-bounded audio preview engine

pub mod audio;
pub mod clock;
pub mod config;
pub mod envelope;
pub mod playback;
pub mod position;
pub mod region;
pub mod render;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use types::*;
