//! Envelope gain calculation
//!
//! Pure mapping from (relative position in region, profile, parameters) to a
//! playback gain in `[0, 1]`. No side effects and no external state; the
//! session samples this on every accepted position update and the render
//! scheduler samples it across the region to build the visible curve.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::types::Seconds;

/// Minimum audible volume floor for the fade-in profile
///
/// Fade-in starts here instead of at true zero so the opening of the region
/// is never perceived as silence. Fade-out still ends at exactly zero.
/// TODO: confirm with product whether fade-out should share this floor or
/// the asymmetry is intentional.
pub const MIN_AUDIBLE_GAIN: f64 = 0.02;

/// Ramp length in seconds for the global fade toggle
///
/// Applied on top of whichever profile is active, independent of the
/// profile's own fade durations.
pub const GLOBAL_FADE_SECONDS: Seconds = 2.0;

/// Exponent for the exponential-in/out shaping curves
pub const EXPONENTIAL_POWER: f64 = 3.0;

/// Gain envelope shape across the region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvelopeProfile {
    /// Constant `baseGain` across the whole region
    #[default]
    Uniform,
    /// Linear ramp from the audible floor up to `baseGain`
    FadeIn,
    /// Linear ramp from `baseGain` down to zero
    FadeOut,
    /// Flat `baseGain` with seconds-based ramps at both edges
    FadeInOut,
    /// Piecewise-linear start/middle/end points plus the edge ramps
    Custom,
    /// Symmetric bump: silent edges, `baseGain` at the midpoint
    Bell,
    /// Symmetric dip: `baseGain` edges, silent midpoint
    Valley,
    /// Slow start, accelerating rise to `baseGain`
    ExponentialIn,
    /// Fast drop from `baseGain`, decelerating tail
    ExponentialOut,
}

impl EnvelopeProfile {
    /// All profiles in display order
    pub const ALL: [EnvelopeProfile; 9] = [
        EnvelopeProfile::Uniform,
        EnvelopeProfile::FadeIn,
        EnvelopeProfile::FadeOut,
        EnvelopeProfile::FadeInOut,
        EnvelopeProfile::Custom,
        EnvelopeProfile::Bell,
        EnvelopeProfile::Valley,
        EnvelopeProfile::ExponentialIn,
        EnvelopeProfile::ExponentialOut,
    ];

    /// Get the name of this profile
    pub fn name(&self) -> &'static str {
        match self {
            EnvelopeProfile::Uniform => "uniform",
            EnvelopeProfile::FadeIn => "fade-in",
            EnvelopeProfile::FadeOut => "fade-out",
            EnvelopeProfile::FadeInOut => "fade-in-out",
            EnvelopeProfile::Custom => "custom",
            EnvelopeProfile::Bell => "bell",
            EnvelopeProfile::Valley => "valley",
            EnvelopeProfile::ExponentialIn => "exponential-in",
            EnvelopeProfile::ExponentialOut => "exponential-out",
        }
    }

    /// Parse a profile from its name (e.g. CLI/config input)
    pub fn from_name(name: &str) -> Option<Self> {
        EnvelopeProfile::ALL.iter().copied().find(|p| p.name() == name)
    }

    /// Number of points the renderer samples for this profile's curve
    ///
    /// Straight-line profiles need only enough points to anchor the line;
    /// curved profiles need a denser sweep to look smooth.
    pub fn curve_sample_count(&self) -> usize {
        match self {
            EnvelopeProfile::Uniform | EnvelopeProfile::FadeIn | EnvelopeProfile::FadeOut => 16,
            EnvelopeProfile::FadeInOut | EnvelopeProfile::Custom => 48,
            EnvelopeProfile::Bell
            | EnvelopeProfile::Valley
            | EnvelopeProfile::ExponentialIn
            | EnvelopeProfile::ExponentialOut => 96,
        }
    }
}

/// Anchor points for the custom profile, each in `[0, 1]`
///
/// The curve runs start -> middle over the first half of the region and
/// middle -> end over the second half.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CustomPoints {
    pub start: f64,
    pub middle: f64,
    pub end: f64,
}

impl Default for CustomPoints {
    fn default() -> Self {
        Self { start: 1.0, middle: 1.0, end: 1.0 }
    }
}

/// Immutable envelope snapshot read by the session and the renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Active profile shape
    pub profile: EnvelopeProfile,
    /// Overall gain scale in `[0, 1]`
    pub base_gain: f64,
    /// Ramp-up length in seconds (FadeInOut and Custom only)
    pub fade_in_seconds: Seconds,
    /// Ramp-down length in seconds (FadeInOut and Custom only)
    pub fade_out_seconds: Seconds,
    /// Anchor points for the Custom profile
    pub custom: CustomPoints,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            profile: EnvelopeProfile::Uniform,
            base_gain: 1.0,
            fade_in_seconds: 0.0,
            fade_out_seconds: 0.0,
            custom: CustomPoints::default(),
        }
    }
}

impl EnvelopeConfig {
    /// Evaluate the profile gain at a relative position in the region
    ///
    /// `rel_pos` is `0` at the region start and `1` at the region end;
    /// `region_seconds` converts the seconds-based ramps. Non-finite input
    /// is substituted with the region start, and the result is clamped to
    /// `[0, 1]` so nothing downstream ever sees NaN or an out-of-range gain.
    pub fn gain_at(&self, rel_pos: f64, region_seconds: Seconds) -> f64 {
        let rel = sanitize_rel(rel_pos);
        let base = self.base_gain.clamp(0.0, 1.0);

        let shaped = match self.profile {
            EnvelopeProfile::Uniform => base,
            EnvelopeProfile::FadeIn => {
                MIN_AUDIBLE_GAIN + (base - MIN_AUDIBLE_GAIN) * rel
            }
            EnvelopeProfile::FadeOut => base * (1.0 - rel),
            EnvelopeProfile::FadeInOut => {
                base * self.edge_ramp_multiplier(rel, region_seconds)
            }
            EnvelopeProfile::Custom => {
                let point = if rel <= 0.5 {
                    lerp(self.custom.start, self.custom.middle, rel * 2.0)
                } else {
                    lerp(self.custom.middle, self.custom.end, (rel - 0.5) * 2.0)
                };
                base * point * self.edge_ramp_multiplier(rel, region_seconds)
            }
            EnvelopeProfile::Bell => base * (PI * rel).sin(),
            EnvelopeProfile::Valley => base * (1.0 - (PI * rel).sin()),
            EnvelopeProfile::ExponentialIn => base * rel.powf(EXPONENTIAL_POWER),
            EnvelopeProfile::ExponentialOut => base * (1.0 - rel).powf(EXPONENTIAL_POWER),
        };

        shaped.clamp(0.0, 1.0)
    }

    /// Seconds-based ramp multiplier at the region edges
    ///
    /// When the two ramps overlap (combined length exceeds the region) the
    /// product of both applies; it can reach zero but never goes negative.
    fn edge_ramp_multiplier(&self, rel: f64, region_seconds: Seconds) -> f64 {
        if !region_seconds.is_finite() || region_seconds <= 0.0 {
            return 1.0;
        }
        let t = rel * region_seconds;
        let rise = if self.fade_in_seconds > 0.0 {
            (t / self.fade_in_seconds).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let fall = if self.fade_out_seconds > 0.0 {
            ((region_seconds - t) / self.fade_out_seconds).clamp(0.0, 1.0)
        } else {
            1.0
        };
        rise * fall
    }
}

/// Independent global fade toggle, evaluated after the profile's own gain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FadeToggle {
    pub fade_in: bool,
    pub fade_out: bool,
}

impl FadeToggle {
    /// Whether either edge fade is enabled
    #[inline]
    pub fn any(&self) -> bool {
        self.fade_in || self.fade_out
    }

    /// Fixed 2-second edge attenuation at a relative position in the region
    pub fn multiplier_at(&self, rel_pos: f64, region_seconds: Seconds) -> f64 {
        if !self.any() || !region_seconds.is_finite() || region_seconds <= 0.0 {
            return 1.0;
        }
        let t = sanitize_rel(rel_pos) * region_seconds;
        let rise = if self.fade_in {
            (t / GLOBAL_FADE_SECONDS).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let fall = if self.fade_out {
            ((region_seconds - t) / GLOBAL_FADE_SECONDS).clamp(0.0, 1.0)
        } else {
            1.0
        };
        rise * fall
    }
}

/// Combined gain: profile shape times the global fade toggle, clamped
///
/// This is the single value that reaches the audio engine's volume API.
pub fn effective_gain(
    config: &EnvelopeConfig,
    toggle: FadeToggle,
    rel_pos: f64,
    region_seconds: Seconds,
) -> f64 {
    let g = config.gain_at(rel_pos, region_seconds) * toggle.multiplier_at(rel_pos, region_seconds);
    g.clamp(0.0, 1.0)
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Substitute non-finite relative positions with the region start
fn sanitize_rel(rel_pos: f64) -> f64 {
    if rel_pos.is_finite() {
        rel_pos.clamp(0.0, 1.0)
    } else {
        log::warn!("non-finite relative position in gain computation, substituting 0.0");
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(profile: EnvelopeProfile) -> EnvelopeConfig {
        EnvelopeConfig { profile, ..EnvelopeConfig::default() }
    }

    #[test]
    fn test_gain_bounded_for_all_profiles() {
        for profile in EnvelopeProfile::ALL {
            let cfg = EnvelopeConfig {
                profile,
                base_gain: 1.0,
                fade_in_seconds: 3.0,
                fade_out_seconds: 3.0,
                custom: CustomPoints { start: 0.2, middle: 1.0, end: 0.4 },
            };
            for i in 0..=100 {
                let rel = i as f64 / 100.0;
                let g = cfg.gain_at(rel, 10.0);
                assert!(
                    (0.0..=1.0).contains(&g),
                    "{} out of range at rel={}: {}",
                    profile.name(),
                    rel,
                    g
                );
            }
        }
    }

    #[test]
    fn test_uniform_is_constant() {
        let cfg = EnvelopeConfig { base_gain: 0.7, ..config(EnvelopeProfile::Uniform) };
        for i in 0..=20 {
            let rel = i as f64 / 20.0;
            assert_eq!(cfg.gain_at(rel, 10.0), 0.7);
        }
    }

    #[test]
    fn test_fade_out_non_increasing() {
        let cfg = config(EnvelopeProfile::FadeOut);
        let mut prev = f64::INFINITY;
        for i in 0..=50 {
            let rel = i as f64 / 50.0;
            let g = cfg.gain_at(rel, 10.0);
            assert!(g <= prev, "fade-out increased at rel={}", rel);
            prev = g;
        }
        assert_eq!(cfg.gain_at(1.0, 10.0), 0.0);
    }

    #[test]
    fn test_fade_in_starts_at_audible_floor() {
        let cfg = config(EnvelopeProfile::FadeIn);
        assert_eq!(cfg.gain_at(0.0, 10.0), MIN_AUDIBLE_GAIN);
        assert!((cfg.gain_at(1.0, 10.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fade_in_out_seconds_based_ramps() {
        // Region of 10s with 3s ramps at both edges
        let cfg = EnvelopeConfig {
            profile: EnvelopeProfile::FadeInOut,
            base_gain: 1.0,
            fade_in_seconds: 3.0,
            fade_out_seconds: 3.0,
            ..EnvelopeConfig::default()
        };
        assert!(cfg.gain_at(0.0, 10.0).abs() < 1e-9);
        // t = 5s sits outside both ramps
        assert_eq!(cfg.gain_at(0.5, 10.0), 1.0);
        // Deeper into the tail ramp means quieter
        assert!(cfg.gain_at(0.95, 10.0) < cfg.gain_at(0.8, 10.0));
    }

    #[test]
    fn test_overlapping_ramps_never_negative() {
        // 3s + 3s of ramp inside a 2s region: ramps overlap everywhere
        let cfg = EnvelopeConfig {
            profile: EnvelopeProfile::FadeInOut,
            base_gain: 1.0,
            fade_in_seconds: 3.0,
            fade_out_seconds: 3.0,
            ..EnvelopeConfig::default()
        };
        for i in 0..=40 {
            let rel = i as f64 / 40.0;
            let g = cfg.gain_at(rel, 2.0);
            assert!((0.0..=1.0).contains(&g));
        }
        // Both multipliers active mid-region: 1/3 * 1/3
        let mid = cfg.gain_at(0.5, 2.0);
        assert!((mid - (1.0 / 3.0) * (1.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_custom_interpolates_through_anchors() {
        let cfg = EnvelopeConfig {
            profile: EnvelopeProfile::Custom,
            base_gain: 1.0,
            custom: CustomPoints { start: 0.2, middle: 1.0, end: 0.4 },
            ..EnvelopeConfig::default()
        };
        assert!((cfg.gain_at(0.0, 10.0) - 0.2).abs() < 1e-9);
        assert!((cfg.gain_at(0.25, 10.0) - 0.6).abs() < 1e-9);
        assert!((cfg.gain_at(0.5, 10.0) - 1.0).abs() < 1e-9);
        assert!((cfg.gain_at(1.0, 10.0) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_custom_layers_edge_ramps() {
        let cfg = EnvelopeConfig {
            profile: EnvelopeProfile::Custom,
            base_gain: 1.0,
            fade_in_seconds: 2.0,
            fade_out_seconds: 0.0,
            custom: CustomPoints { start: 0.8, middle: 0.8, end: 0.8 },
            ..EnvelopeConfig::default()
        };
        // Ramp still pulls the configured anchor level down near the edge
        assert!(cfg.gain_at(0.0, 10.0).abs() < 1e-9);
        let quarter_ramp = cfg.gain_at(0.05, 10.0); // t = 0.5s of a 2s ramp
        assert!((quarter_ramp - 0.8 * 0.25).abs() < 1e-9);
        assert!((cfg.gain_at(0.5, 10.0) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_bell_and_valley_symmetric() {
        let bell = config(EnvelopeProfile::Bell);
        let valley = config(EnvelopeProfile::Valley);
        for i in 0..=25 {
            let rel = i as f64 / 50.0;
            assert!((bell.gain_at(rel, 10.0) - bell.gain_at(1.0 - rel, 10.0)).abs() < 1e-9);
            assert!((valley.gain_at(rel, 10.0) - valley.gain_at(1.0 - rel, 10.0)).abs() < 1e-9);
        }
        assert!((bell.gain_at(0.5, 10.0) - 1.0).abs() < 1e-9);
        assert!(valley.gain_at(0.5, 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_exponential_monotonic() {
        let rising = config(EnvelopeProfile::ExponentialIn);
        let falling = config(EnvelopeProfile::ExponentialOut);
        let mut prev_up = -1.0;
        let mut prev_down = 2.0;
        for i in 0..=50 {
            let rel = i as f64 / 50.0;
            let up = rising.gain_at(rel, 10.0);
            let down = falling.gain_at(rel, 10.0);
            assert!(up >= prev_up);
            assert!(down <= prev_down);
            prev_up = up;
            prev_down = down;
        }
    }

    #[test]
    fn test_non_finite_rel_substitutes_region_start() {
        let cfg = config(EnvelopeProfile::FadeOut);
        assert_eq!(cfg.gain_at(f64::NAN, 10.0), cfg.gain_at(0.0, 10.0));
        assert_eq!(cfg.gain_at(f64::INFINITY, 10.0), cfg.gain_at(0.0, 10.0));
    }

    #[test]
    fn test_global_fade_toggle_applies_after_profile() {
        let cfg = EnvelopeConfig { base_gain: 0.8, ..config(EnvelopeProfile::Uniform) };
        let toggle = FadeToggle { fade_in: true, fade_out: true };

        // Region start: fade-in toggle silences the uniform profile
        assert_eq!(effective_gain(&cfg, toggle, 0.0, 10.0), 0.0);
        // t = 1s: halfway up the 2s toggle ramp
        let g = effective_gain(&cfg, toggle, 0.1, 10.0);
        assert!((g - 0.8 * 0.5).abs() < 1e-9);
        // Mid-region: outside both toggle ramps
        assert_eq!(effective_gain(&cfg, toggle, 0.5, 10.0), 0.8);
    }

    #[test]
    fn test_toggle_disabled_is_identity() {
        let cfg = config(EnvelopeProfile::Uniform);
        let toggle = FadeToggle::default();
        assert_eq!(effective_gain(&cfg, toggle, 0.0, 10.0), 1.0);
        assert_eq!(toggle.multiplier_at(0.0, 10.0), 1.0);
    }

    #[test]
    fn test_profile_names_round_trip() {
        for profile in EnvelopeProfile::ALL {
            assert_eq!(EnvelopeProfile::from_name(profile.name()), Some(profile));
        }
        assert_eq!(EnvelopeProfile::from_name("nope"), None);
    }

    #[test]
    fn test_curve_sample_count_scales_with_complexity() {
        assert!(
            EnvelopeProfile::Bell.curve_sample_count()
                > EnvelopeProfile::Uniform.curve_sample_count()
        );
        assert!(
            EnvelopeProfile::FadeInOut.curve_sample_count()
                > EnvelopeProfile::FadeOut.curve_sample_count()
        );
    }
}
