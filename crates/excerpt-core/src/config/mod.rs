//! Configuration infrastructure for excerpt applications
//!
//! - Generic YAML config loading/saving
//! - Standard config file locations
//! - The persisted preview settings themselves

mod io;
mod paths;
mod preview;

pub use io::{load_config, save_config};
pub use paths::{default_config_dir, default_config_path};
pub use preview::PreviewConfig;
