//! Preview session settings persisted between runs

use serde::{Deserialize, Serialize};

use crate::envelope::{EnvelopeConfig, FadeToggle};

/// Everything the user tuned last time: envelope shape, global fade
/// toggles, loop mode, and the dimming inversion
///
/// Unknown or missing fields fall back to defaults, so configs written by
/// older versions keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Envelope profile and its parameters
    pub envelope: EnvelopeConfig,
    /// Fixed 2-second fade-in applied after the profile
    pub fade_in_enabled: bool,
    /// Fixed 2-second fade-out applied after the profile
    pub fade_out_enabled: bool,
    /// Restart from the region start at the region end
    pub loop_enabled: bool,
    /// Dim the kept section instead of the excluded ones
    pub delete_mode: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            envelope: EnvelopeConfig::default(),
            fade_in_enabled: false,
            fade_out_enabled: false,
            loop_enabled: false,
            delete_mode: false,
        }
    }
}

impl PreviewConfig {
    /// Global fade toggle view of the two enable flags
    pub fn fade_toggle(&self) -> FadeToggle {
        FadeToggle {
            fade_in: self.fade_in_enabled,
            fade_out: self.fade_out_enabled,
        }
    }
}
