//! Region model
//!
//! Owns the selected `[start, end]` sub-range of the track: validated edits
//! tagged with who made them, a gesture lifecycle for drags, click routing
//! around the region edges, and the trailing window during which the latest
//! edit intent stays observable to downstream consumers.

use std::time::{Duration, Instant};

use crate::clock::SharedClock;
use crate::types::{EditIntent, RegionBounds, Seconds, Track};

/// How far before a freshly clicked end the preview seek lands
///
/// Clicking past the region end extends the region, then seeks here instead
/// of to the new end itself (which would immediately trip end-of-region), so
/// the user hears the new tail.
pub const PREVIEW_WINDOW_SECONDS: Seconds = 3.0;

/// How long the most recent edit intent stays observable
///
/// Downstream observers (style updates, playback continuation decisions)
/// read the intent tag shortly after the edit lands; it reverts to `None`
/// once this window passes so a later unrelated change is not misattributed.
pub const INTENT_LINGER: Duration = Duration::from_millis(200);

/// Region edit failures surfaced to the caller
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegionError {
    #[error("no track loaded")]
    NoTrack,
    #[error("region start {start:.3}s must come before end {end:.3}s")]
    StartNotBeforeEnd { start: Seconds, end: Seconds },
    #[error("region [{start:.3}s, {end:.3}s] exceeds track duration {duration:.3}s")]
    OutsideTrack {
        start: Seconds,
        end: Seconds,
        duration: Seconds,
    },
    #[error("non-finite region bound")]
    NonFinite,
}

/// Result alias for region operations
pub type RegionResult<T> = Result<T, RegionError>;

/// A successful bounds mutation, dispatched to region-changed observers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionChange {
    /// New region start in seconds
    pub start: Seconds,
    /// New region end in seconds
    pub end: Seconds,
    /// Bounds before this change; for a drag this is the pre-gesture
    /// snapshot, so history consumers undo the whole drag in one step
    pub previous: Option<RegionBounds>,
    /// Whether history consumers should record this change
    pub record_history: bool,
    /// Who made the change
    pub intent: EditIntent,
}

/// Result of routing a timeline click
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickOutcome {
    /// Bounds change, if the click expanded the region
    pub change: Option<RegionChange>,
    /// Where playback should seek as a side effect of the click
    pub seek_to: Seconds,
}

/// Drag gesture lifecycle
#[derive(Debug, Clone, Copy, PartialEq)]
enum GestureState {
    Idle,
    /// A drag is in flight; `snapshot` holds the bounds before it started
    Active { snapshot: RegionBounds },
}

/// The region model
///
/// All bounds mutations go through here; invalid edits are rejected with the
/// previous bounds retained. A fresh track starts with the region spanning
/// the whole file.
pub struct RegionModel {
    clock: SharedClock,
    track: Option<Track>,
    bounds: Option<RegionBounds>,
    gesture: GestureState,
    /// Most recent intent and the instant it stops being observable
    intent: Option<(EditIntent, Instant)>,
}

impl RegionModel {
    /// Create an empty model (no track, no region)
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            track: None,
            bounds: None,
            gesture: GestureState::Idle,
            intent: None,
        }
    }

    /// Install a new track; the region resets to span the whole file
    ///
    /// Any in-flight gesture and pending intent window are cancelled so
    /// nothing fires against the replaced track.
    pub fn load_track(&mut self, track: Track) {
        self.bounds = Some(RegionBounds::new(0.0, track.total_duration()));
        self.track = Some(track);
        self.gesture = GestureState::Idle;
        self.intent = None;
    }

    /// Forget the track and region entirely
    pub fn clear_track(&mut self) {
        self.track = None;
        self.bounds = None;
        self.gesture = GestureState::Idle;
        self.intent = None;
    }

    /// Current bounds (None before the first track loads)
    #[inline]
    pub fn bounds(&self) -> Option<RegionBounds> {
        self.bounds
    }

    /// Duration of the loaded track, if any
    #[inline]
    pub fn track_duration(&self) -> Option<Seconds> {
        self.track.map(|t| t.total_duration())
    }

    /// Whether a drag gesture is currently in flight
    #[inline]
    pub fn gesture_active(&self) -> bool {
        matches!(self.gesture, GestureState::Active { .. })
    }

    /// The intent of the most recent edit, `None` once its window expires
    pub fn change_source(&self) -> EditIntent {
        match self.intent {
            Some((intent, expires)) if self.clock.now() < expires => intent,
            _ => EditIntent::None,
        }
    }

    /// Drop an expired intent window; called once per pump
    pub fn maintain(&mut self) {
        if let Some((intent, expires)) = self.intent {
            if self.clock.now() >= expires {
                log::debug!("edit intent {} expired", intent.label());
                self.intent = None;
            }
        }
    }

    // --- Bounds edits ---

    /// Move the region start; rejects edits that violate the invariants
    pub fn set_start(&mut self, t: Seconds, intent: EditIntent) -> RegionResult<RegionChange> {
        let current = self.bounds.ok_or(RegionError::NoTrack)?;
        self.apply(t, current.end, intent)
    }

    /// Move the region end; rejects edits that violate the invariants
    pub fn set_end(&mut self, t: Seconds, intent: EditIntent) -> RegionResult<RegionChange> {
        let current = self.bounds.ok_or(RegionError::NoTrack)?;
        self.apply(current.start, t, intent)
    }

    /// Replace both bounds at once
    pub fn set_bounds(
        &mut self,
        start: Seconds,
        end: Seconds,
        intent: EditIntent,
    ) -> RegionResult<RegionChange> {
        if self.bounds.is_none() {
            return Err(RegionError::NoTrack);
        }
        self.apply(start, end, intent)
    }

    /// Validate and commit new bounds, stamping the intent window
    fn apply(
        &mut self,
        start: Seconds,
        end: Seconds,
        intent: EditIntent,
    ) -> RegionResult<RegionChange> {
        let track = self.track.ok_or(RegionError::NoTrack)?;
        let previous = self.bounds.ok_or(RegionError::NoTrack)?;

        if !start.is_finite() || !end.is_finite() {
            return Err(RegionError::NonFinite);
        }
        if start >= end {
            return Err(RegionError::StartNotBeforeEnd { start, end });
        }
        if start < 0.0 || end > track.total_duration() {
            return Err(RegionError::OutsideTrack {
                start,
                end,
                duration: track.total_duration(),
            });
        }

        self.bounds = Some(RegionBounds::new(start, end));
        self.stamp_intent(intent);

        // Intermediate drag frames are not history entries; the gesture end
        // reports the whole drag as one change.
        Ok(RegionChange {
            start,
            end,
            previous: Some(previous),
            record_history: !self.gesture_active(),
            intent,
        })
    }

    fn stamp_intent(&mut self, intent: EditIntent) {
        self.intent = Some((intent, self.clock.now() + INTENT_LINGER));
    }

    // --- Gesture lifecycle ---

    /// Mark the start of a contiguous drag; keeps the first snapshot if one
    /// is already captured
    pub fn begin_gesture(&mut self) {
        if let (GestureState::Idle, Some(bounds)) = (self.gesture, self.bounds) {
            self.gesture = GestureState::Active { snapshot: bounds };
        }
    }

    /// Finish the drag; reports one history-relevant change if the region
    /// net-moved, with the pre-drag bounds as the previous value
    pub fn end_gesture(&mut self) -> Option<RegionChange> {
        let GestureState::Active { snapshot } = self.gesture else {
            return None;
        };
        self.gesture = GestureState::Idle;

        let bounds = self.bounds?;
        if bounds == snapshot {
            return None;
        }

        self.stamp_intent(EditIntent::Drag);
        Some(RegionChange {
            start: bounds.start,
            end: bounds.end,
            previous: Some(snapshot),
            record_history: true,
            intent: EditIntent::Drag,
        })
    }

    // --- Click routing ---

    /// Route a timeline click: expand the closest edge when outside the
    /// region, pure seek when inside
    pub fn click_at(&mut self, t: Seconds) -> RegionResult<ClickOutcome> {
        let track = self.track.ok_or(RegionError::NoTrack)?;
        let bounds = self.bounds.ok_or(RegionError::NoTrack)?;
        let t = track.clamp_time(t);

        if t < bounds.start {
            let change = self.apply(t, bounds.end, EditIntent::ClickExpandStart)?;
            Ok(ClickOutcome {
                change: Some(change),
                seek_to: t,
            })
        } else if t > bounds.end {
            let change = self.apply(bounds.start, t, EditIntent::ClickExpandEnd)?;
            // Preview the new tail instead of landing on the end itself
            let seek_to = (t - PREVIEW_WINDOW_SECONDS).max(bounds.start);
            Ok(ClickOutcome {
                change: Some(change),
                seek_to,
            })
        } else {
            Ok(ClickOutcome {
                change: None,
                seek_to: t,
            })
        }
    }
}
