//! Common types for the excerpt preview engine
//!
//! This module contains the fundamental vocabulary shared across the engine:
//! track handles, region bounds, playback states, and the source tags that
//! travel with every position or bounds mutation.

/// Seconds-based time value used throughout the engine
pub type Seconds = f64;

/// An immutable handle to a decoded audio source
///
/// Created when a file finishes loading; replaced wholesale when a new file
/// loads (which resets region, playhead, and playback state downstream).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Track {
    total_duration: Seconds,
}

impl Track {
    /// Create a track handle; rejects non-finite or non-positive durations
    pub fn new(total_duration: Seconds) -> Option<Self> {
        if total_duration.is_finite() && total_duration > 0.0 {
            Some(Self { total_duration })
        } else {
            None
        }
    }

    /// Total duration of the decoded source in seconds
    #[inline]
    pub fn total_duration(&self) -> Seconds {
        self.total_duration
    }

    /// Clamp an arbitrary time value into this track's timeline
    #[inline]
    pub fn clamp_time(&self, t: Seconds) -> Seconds {
        if t.is_finite() {
            t.clamp(0.0, self.total_duration)
        } else {
            0.0
        }
    }
}

/// The selected `[start, end]` sub-range of a track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionBounds {
    /// Region start in seconds, always `< end`
    pub start: Seconds,
    /// Region end in seconds, always `<= totalDuration`
    pub end: Seconds,
}

impl RegionBounds {
    /// Create bounds without validation (the region model validates)
    pub fn new(start: Seconds, end: Seconds) -> Self {
        Self { start, end }
    }

    /// Region length in seconds
    #[inline]
    pub fn length(&self) -> Seconds {
        self.end - self.start
    }

    /// Whether a time lies within the playable half-open range `[start, end)`
    #[inline]
    pub fn contains(&self, t: Seconds) -> bool {
        t >= self.start && t < self.end
    }

    /// Relative position of a time within the region, clamped to `[0, 1]`
    ///
    /// Non-finite input maps to 0 so corrupt positions never reach the
    /// envelope or the volume path.
    pub fn relative_position(&self, t: Seconds) -> f64 {
        let len = self.length();
        if !t.is_finite() || len <= 0.0 {
            return 0.0;
        }
        ((t - self.start) / len).clamp(0.0, 1.0)
    }
}

/// Playback state machine states
///
/// `Ending` is the window between detecting end-of-region and finishing the
/// pause/reset sequence; a nested end-of-region trigger observed in this
/// state is dropped rather than re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Ending,
    Paused,
}

impl PlaybackState {
    /// Whether audio is (or should be) audible right now
    #[inline]
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }
}

/// Who triggered the most recent region change
///
/// Travels with every bounds mutation so history consumers and style
/// observers can tell a drag apart from a click or an API call without
/// consulting ambient flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditIntent {
    /// No edit in flight (quiescent tag after the trailing window expires)
    #[default]
    None,
    /// Continuous handle drag; history records only the gesture endpoints
    Drag,
    /// Click left of the region snapped the start edge
    ClickExpandStart,
    /// Click right of the region snapped the end edge
    ClickExpandEnd,
    /// External API call
    Programmatic,
}

impl EditIntent {
    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            EditIntent::None => "none",
            EditIntent::Drag => "drag",
            EditIntent::ClickExpandStart => "click-expand-start",
            EditIntent::ClickExpandEnd => "click-expand-end",
            EditIntent::Programmatic => "programmatic",
        }
    }
}

/// Origin of a position synchronization request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSource {
    /// Progress reported by the audio engine while playing
    Engine,
    /// Pointer drag scrubbing the timeline
    Drag,
    /// Explicit seek (user click or API); shown immediately
    Seek,
    /// End-of-region or drift correction; shown immediately
    Correction,
}

impl SyncSource {
    /// Forcing sources bypass the notification rate limit
    #[inline]
    pub fn is_forcing(&self) -> bool {
        matches!(self, SyncSource::Seek | SyncSource::Correction)
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            SyncSource::Engine => "engine",
            SyncSource::Drag => "drag",
            SyncSource::Seek => "seek",
            SyncSource::Correction => "correction",
        }
    }
}
