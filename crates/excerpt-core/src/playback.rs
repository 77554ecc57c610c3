//! Playback controller
//!
//! State machine keeping audible output inside the region. It decides where
//! play starts, watches the engine position every tick, and resolves
//! end-of-region as either a loop restart or a stop-and-reset. All engine
//! access goes through the [`AudioTransport`] handed in per call, so the
//! controller itself holds no engine state beyond the machine.

use crate::audio::{AudioTransport, TransportError, TransportResult};
use crate::position::PositionSync;
use crate::types::{PlaybackState, RegionBounds, Seconds, SyncSource};

/// Positions this far past the region end count as end-of-region
pub const END_TOLERANCE: Seconds = 0.020;

/// Window past the end in which an engine stop reads as a natural finish
pub const NATURAL_END_WINDOW: Seconds = 0.050;

/// What the session must dispatch after a controller call
///
/// The controller mutates engine and playhead state but never invokes
/// observers itself; callbacks fire from the session in field order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlOutcome {
    /// Play-state observer should fire with this value
    pub play_state_changed: Option<bool>,
    /// Play-end observer should fire (single-shot end of region)
    pub play_ended: bool,
    /// Time-update observer should fire with this position
    pub time_update: Option<Seconds>,
    /// One synchronous repaint, bypassing the render throttle
    pub force_render: bool,
    /// Throttled repaint request
    pub render: bool,
}

/// Play/pause/loop state machine bounded by the region
pub struct PlaybackController {
    state: PlaybackState,
    loop_enabled: bool,
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackController {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
            loop_enabled: false,
        }
    }

    #[inline]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    #[inline]
    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    pub fn set_loop_enabled(&mut self, enabled: bool) {
        self.loop_enabled = enabled;
    }

    // --- Transport control ---

    /// Start playback inside the region
    ///
    /// The start position is the engine position if it already lies within
    /// the region, else the last synchronized position if it does, else the
    /// region start.
    pub fn play(
        &mut self,
        transport: &mut dyn AudioTransport,
        sync: &mut PositionSync,
        bounds: RegionBounds,
    ) -> TransportResult<ControlOutcome> {
        if self.state == PlaybackState::Ending {
            log::debug!("play ignored while end-of-region handling runs");
            return Ok(ControlOutcome::default());
        }

        let engine_pos = transport.position();
        let from = if bounds.contains(engine_pos) {
            engine_pos
        } else if bounds.contains(sync.current()) {
            sync.current()
        } else {
            bounds.start
        };

        transport.play(from, bounds.end)?;
        let was_playing = self.state.is_playing();
        self.state = PlaybackState::Playing;
        sync.sync(from, SyncSource::Seek);

        Ok(ControlOutcome {
            play_state_changed: (!was_playing).then_some(true),
            time_update: Some(from),
            render: true,
            ..ControlOutcome::default()
        })
    }

    /// Pause playback where it is; inert unless playing
    pub fn pause(&mut self, transport: &mut dyn AudioTransport) -> TransportResult<ControlOutcome> {
        if !self.state.is_playing() {
            return Ok(ControlOutcome::default());
        }
        transport.pause()?;
        self.state = PlaybackState::Paused;
        Ok(ControlOutcome {
            play_state_changed: Some(false),
            ..ControlOutcome::default()
        })
    }

    /// Pause and return the playhead to the region start
    pub fn stop(
        &mut self,
        transport: &mut dyn AudioTransport,
        sync: &mut PositionSync,
        bounds: RegionBounds,
    ) -> TransportResult<ControlOutcome> {
        let was_playing = self.state.is_playing();
        transport.pause()?;
        seek_seconds(transport, bounds.start)?;
        self.state = PlaybackState::Paused;
        sync.sync(bounds.start, SyncSource::Seek);

        Ok(ControlOutcome {
            play_state_changed: was_playing.then_some(false),
            time_update: Some(bounds.start),
            force_render: true,
            ..ControlOutcome::default()
        })
    }

    /// Play if paused or idle, pause if playing
    pub fn toggle(
        &mut self,
        transport: &mut dyn AudioTransport,
        sync: &mut PositionSync,
        bounds: RegionBounds,
    ) -> TransportResult<ControlOutcome> {
        if self.state.is_playing() {
            self.pause(transport)
        } else {
            self.play(transport, sync, bounds)
        }
    }

    // --- Per-pump maintenance ---

    /// Reconcile with the engine once per tick while playing
    pub fn tick(
        &mut self,
        transport: &mut dyn AudioTransport,
        sync: &mut PositionSync,
        bounds: RegionBounds,
    ) -> TransportResult<ControlOutcome> {
        if self.state != PlaybackState::Playing {
            return Ok(ControlOutcome::default());
        }
        if !transport.is_playing() {
            return self.handle_engine_stopped(transport, sync, bounds);
        }

        let pos = transport.position();
        if pos < bounds.start {
            // Drifted below the region (external seek); restart from start
            log::debug!("position {:.3}s below region start, correcting", pos);
            transport.play(bounds.start, bounds.end)?;
            let outcome = sync.sync(bounds.start, SyncSource::Correction);
            return Ok(ControlOutcome {
                time_update: outcome.notified().then_some(bounds.start),
                force_render: true,
                ..ControlOutcome::default()
            });
        }
        if pos > bounds.end + END_TOLERANCE {
            return self.finish_region(transport, sync, bounds);
        }

        let outcome = sync.sync(pos, SyncSource::Engine);
        Ok(ControlOutcome {
            time_update: outcome.notified().then_some(pos),
            render: true,
            ..ControlOutcome::default()
        })
    }

    /// Resolve an engine stop reported while we believe we are playing
    ///
    /// A stop just past the end is a natural finish; a stop far outside the
    /// region is corrected back to the start; a stop inside the region is an
    /// external pause and only resynchronizes.
    pub fn handle_engine_stopped(
        &mut self,
        transport: &mut dyn AudioTransport,
        sync: &mut PositionSync,
        bounds: RegionBounds,
    ) -> TransportResult<ControlOutcome> {
        if self.state != PlaybackState::Playing {
            return Ok(ControlOutcome::default());
        }

        let pos = transport.position();
        if pos >= bounds.end && pos <= bounds.end + NATURAL_END_WINDOW {
            return self.finish_region(transport, sync, bounds);
        }

        if pos < bounds.start - END_TOLERANCE || pos > bounds.end + END_TOLERANCE {
            // Stopped out of bounds; reset to the region start
            log::debug!("engine stopped out of bounds at {:.3}s, resetting", pos);
            seek_seconds(transport, bounds.start)?;
            self.state = PlaybackState::Paused;
            let outcome = sync.sync(bounds.start, SyncSource::Correction);
            return Ok(ControlOutcome {
                play_state_changed: Some(false),
                time_update: outcome.notified().then_some(bounds.start),
                force_render: true,
                ..ControlOutcome::default()
            });
        }

        // Benign external pause inside the region
        self.state = PlaybackState::Paused;
        let outcome = sync.sync(pos, SyncSource::Correction);
        Ok(ControlOutcome {
            play_state_changed: Some(false),
            time_update: outcome.notified().then_some(pos),
            ..ControlOutcome::default()
        })
    }

    /// Restart playback from the region start if the engine escaped it
    ///
    /// Safe to call repeatedly; does nothing while paused or already in
    /// bounds. Used after external bounds mutation during playback.
    pub fn ensure_within_bounds(
        &mut self,
        transport: &mut dyn AudioTransport,
        sync: &mut PositionSync,
        bounds: RegionBounds,
    ) -> TransportResult<ControlOutcome> {
        if self.state != PlaybackState::Playing {
            return Ok(ControlOutcome::default());
        }
        let pos = transport.position();
        if bounds.contains(pos) {
            return Ok(ControlOutcome::default());
        }

        transport.pause()?;
        seek_seconds(transport, bounds.start)?;
        transport.play(bounds.start, bounds.end)?;
        let outcome = sync.sync(bounds.start, SyncSource::Correction);
        Ok(ControlOutcome {
            time_update: outcome.notified().then_some(bounds.start),
            force_render: true,
            ..ControlOutcome::default()
        })
    }

    // --- End of region ---

    /// Loop restart or stop-and-reset once the region end is reached
    ///
    /// Guarded by the `Ending` state so a second invocation (tick overrun
    /// plus a finish event in adjacent pumps) is dropped, not repeated. The
    /// guard state is released before any transport error propagates.
    fn finish_region(
        &mut self,
        transport: &mut dyn AudioTransport,
        sync: &mut PositionSync,
        bounds: RegionBounds,
    ) -> TransportResult<ControlOutcome> {
        if self.state == PlaybackState::Ending {
            log::debug!("end-of-region handling already in progress, dropping");
            return Ok(ControlOutcome::default());
        }
        self.state = PlaybackState::Ending;

        if self.loop_enabled {
            let played = transport.play(bounds.start, bounds.end);
            self.state = PlaybackState::Playing;
            played?;
            let outcome = sync.sync(bounds.start, SyncSource::Correction);
            return Ok(ControlOutcome {
                time_update: outcome.notified().then_some(bounds.start),
                force_render: true,
                ..ControlOutcome::default()
            });
        }

        let paused = transport.pause();
        let sought = seek_seconds(transport, bounds.start);
        self.state = PlaybackState::Paused;
        paused?;
        sought?;

        let outcome = sync.sync(bounds.start, SyncSource::Correction);
        Ok(ControlOutcome {
            play_state_changed: Some(false),
            play_ended: true,
            time_update: outcome.notified().then_some(bounds.start),
            force_render: true,
            ..ControlOutcome::default()
        })
    }
}

/// Seek the transport to an absolute position in seconds
pub(crate) fn seek_seconds(
    transport: &mut dyn AudioTransport,
    position: Seconds,
) -> TransportResult<()> {
    let duration = transport.duration();
    if duration <= 0.0 {
        return Err(TransportError::NoTrackLoaded);
    }
    transport.seek_to(position / duration)
}
