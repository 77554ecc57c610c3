//! Authoritative playhead position
//!
//! Owns the single reconciled playhead value. Audio-engine progress, seeks,
//! drags, and corrections all funnel through `sync`; everything else (render,
//! controller decisions, outward time-update callbacks) reads `current`.
//! Notifications are rate-limited to ~60 Hz, but the stored value is always
//! the latest write, so a burst of drag updates coalesces to one notification
//! without losing the final position.

use std::time::{Duration, Instant};

use crate::clock::SharedClock;
use crate::types::{Seconds, SyncSource};

/// Minimum interval between observer notifications (~60 Hz)
pub const MIN_NOTIFY_INTERVAL: Duration = Duration::from_millis(16);

/// What happened to a sync request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Value stored and the time-update observer should fire
    Notified,
    /// Value stored silently; the notification was coalesced by the limiter
    Coalesced,
    /// Non-finite input; previous value retained
    Rejected,
}

impl SyncOutcome {
    /// Whether the time-update observer is due
    #[inline]
    pub fn notified(&self) -> bool {
        matches!(self, SyncOutcome::Notified)
    }
}

/// The position synchronizer
///
/// Single-threaded by design: exclusive `&mut` access makes a `sync`
/// re-entered from its own observer unrepresentable, so the reentrancy
/// protection lives in the type system rather than a runtime flag. The
/// session dispatches the outward callback only after `sync` returns.
pub struct PositionSync {
    clock: SharedClock,
    /// Authoritative playhead in seconds, always within the track
    position: Seconds,
    /// Track duration used to clamp incoming values (None before load)
    track_duration: Option<Seconds>,
    /// When the observer was last notified
    last_notified: Option<Instant>,
}

impl PositionSync {
    /// Create a synchronizer with no track loaded
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            position: 0.0,
            track_duration: None,
            last_notified: None,
        }
    }

    /// Install the duration clamp for a freshly loaded track and reset
    pub fn set_track_duration(&mut self, duration: Seconds) {
        self.track_duration = Some(duration);
        self.position = 0.0;
        self.last_notified = None;
    }

    /// Forget the track (playhead pins to zero until the next load)
    pub fn clear_track(&mut self) {
        self.track_duration = None;
        self.position = 0.0;
        self.last_notified = None;
    }

    /// The authoritative playhead value
    #[inline]
    pub fn current(&self) -> Seconds {
        self.position
    }

    /// Reconcile a reported position into the authoritative value
    ///
    /// Every finite call stores the (clamped) value, so `current` reflects
    /// the last write even inside a rate-limited burst. Forcing sources and
    /// the first call after a reset always notify; otherwise notifications
    /// are spaced at least `MIN_NOTIFY_INTERVAL` apart.
    pub fn sync(&mut self, new_position: Seconds, source: SyncSource) -> SyncOutcome {
        if !new_position.is_finite() {
            log::warn!(
                "ignoring non-finite position from {} source, keeping {:.3}s",
                source.label(),
                self.position
            );
            return SyncOutcome::Rejected;
        }

        let clamped = match self.track_duration {
            Some(duration) => new_position.clamp(0.0, duration),
            None => new_position.max(0.0),
        };
        self.position = clamped;

        let now = self.clock.now();
        let due = match self.last_notified {
            Some(last) => now.duration_since(last) >= MIN_NOTIFY_INTERVAL,
            None => true,
        };

        if source.is_forcing() || due {
            self.last_notified = Some(now);
            SyncOutcome::Notified
        } else {
            log::debug!(
                "coalesced {} position update to {:.3}s",
                source.label(),
                clamped
            );
            SyncOutcome::Coalesced
        }
    }
}
