//! Standard locations for excerpt configuration files

use std::path::PathBuf;

/// Directory holding excerpt configuration
///
/// Returns: `{platform config dir}/excerpt`, e.g. `~/.config/excerpt`
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("excerpt")
}

/// Path of a named config file inside the excerpt config directory
pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}
