//! Preview session facade
//!
//! Owns the region model, position synchronizer, playback controller,
//! render scheduler, and the audio transport, and multiplexes their events
//! onto one pump. The host embeds the session, registers callbacks, and
//! calls [`PreviewSession::pump`] once per frame; everything else is the
//! imperative API surface.
//!
//! Engine calls made before a track is ready are warned no-ops; bounds
//! validation failures surface to the caller.

use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};

use crate::audio::{AudioBuffer, AudioTransport, TransportEvent};
use crate::clock::{MonotonicClock, SharedClock};
use crate::config::PreviewConfig;
use crate::envelope::{effective_gain, EnvelopeConfig, EnvelopeProfile, FadeToggle};
use crate::playback::{self, ControlOutcome, PlaybackController};
use crate::position::PositionSync;
use crate::region::{RegionChange, RegionModel, RegionResult};
use crate::render::{RenderScheduler, Surface};
use crate::types::{EditIntent, RegionBounds, Seconds, SyncSource, Track};

/// Observers emitted outward by the session
///
/// All four are optional; unset callbacks are skipped.
#[derive(Default)]
pub struct SessionCallbacks {
    /// Full change record after every accepted bounds edit
    pub on_region_change: Option<Box<dyn FnMut(RegionChange)>>,
    /// Authoritative playhead value after every notified sync
    pub on_time_update: Option<Box<dyn FnMut(Seconds)>>,
    /// Play/pause transitions, including the implicit pause at region end
    pub on_play_state_change: Option<Box<dyn FnMut(bool)>>,
    /// Natural end of the region without loop
    pub on_play_end: Option<Box<dyn FnMut()>>,
}

/// Region bounds plus the active envelope profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionSnapshot {
    pub start: Seconds,
    pub end: Seconds,
    pub profile: EnvelopeProfile,
}

/// The region preview engine
pub struct PreviewSession {
    transport: Box<dyn AudioTransport>,
    region: RegionModel,
    sync: PositionSync,
    controller: PlaybackController,
    scheduler: RenderScheduler,
    envelope: EnvelopeConfig,
    fade: FadeToggle,
    callbacks: SessionCallbacks,
    /// Last gain handed to the engine, to skip redundant volume commands
    last_volume: Option<f64>,
}

impl PreviewSession {
    /// Build a session on the monotonic wall clock
    pub fn new(transport: Box<dyn AudioTransport>) -> Self {
        Self::with_clock(transport, Rc::new(MonotonicClock))
    }

    /// Build a session on an injected clock (tests drive time manually)
    pub fn with_clock(transport: Box<dyn AudioTransport>, clock: SharedClock) -> Self {
        Self {
            transport,
            region: RegionModel::new(clock.clone()),
            sync: PositionSync::new(clock.clone()),
            controller: PlaybackController::new(),
            scheduler: RenderScheduler::new(clock),
            envelope: EnvelopeConfig::default(),
            fade: FadeToggle::default(),
            callbacks: SessionCallbacks::default(),
            last_volume: None,
        }
    }

    // --- Callbacks ---

    pub fn set_on_region_change(&mut self, f: impl FnMut(RegionChange) + 'static) {
        self.callbacks.on_region_change = Some(Box::new(f));
    }

    pub fn set_on_time_update(&mut self, f: impl FnMut(Seconds) + 'static) {
        self.callbacks.on_time_update = Some(Box::new(f));
    }

    pub fn set_on_play_state_change(&mut self, f: impl FnMut(bool) + 'static) {
        self.callbacks.on_play_state_change = Some(Box::new(f));
    }

    pub fn set_on_play_end(&mut self, f: impl FnMut() + 'static) {
        self.callbacks.on_play_end = Some(Box::new(f));
    }

    // --- Track lifecycle ---

    /// Decode a WAV file and install it as the current track
    pub fn load_track_file(&mut self, path: &Path) -> Result<()> {
        let buffer = AudioBuffer::from_wav_file(path)?;
        self.load_buffer(buffer)
    }

    /// Install a decoded track; the region resets to span the whole file
    ///
    /// Replacing the track cancels any gesture, pending intent window, and
    /// running playback.
    pub fn load_buffer(&mut self, buffer: AudioBuffer) -> Result<()> {
        let duration = buffer.duration_seconds();
        let track = Track::new(duration).context("track has no playable duration")?;

        self.transport.load(buffer)?;
        self.region.load_track(track);
        self.sync.set_track_duration(duration);

        let loop_enabled = self.controller.loop_enabled();
        self.controller = PlaybackController::new();
        self.controller.set_loop_enabled(loop_enabled);
        self.scheduler.set_dragging(false);
        self.last_volume = None;

        log::info!("Track loaded: {:.2}s", duration);
        if let Some(cb) = &mut self.callbacks.on_region_change {
            cb(RegionChange {
                start: 0.0,
                end: duration,
                previous: None,
                record_history: false,
                intent: EditIntent::Programmatic,
            });
        }
        self.scheduler.request_repaint(true);
        Ok(())
    }

    // --- Settings ---

    /// Replace the envelope; non-finite fields are sanitized with a warning
    pub fn set_envelope(&mut self, envelope: EnvelopeConfig) {
        let mut envelope = envelope;
        if !envelope.base_gain.is_finite() {
            log::warn!("Non-finite base gain, keeping previous value");
            envelope.base_gain = self.envelope.base_gain;
        }
        envelope.base_gain = envelope.base_gain.clamp(0.0, 1.0);
        if !envelope.fade_in_seconds.is_finite() || envelope.fade_in_seconds < 0.0 {
            envelope.fade_in_seconds = 0.0;
        }
        if !envelope.fade_out_seconds.is_finite() || envelope.fade_out_seconds < 0.0 {
            envelope.fade_out_seconds = 0.0;
        }
        self.envelope = envelope;
        self.scheduler.request_repaint(false);
    }

    #[inline]
    pub fn envelope(&self) -> &EnvelopeConfig {
        &self.envelope
    }

    /// Enable or disable the fixed 2-second global fades; returns whether
    /// any fade is now active
    pub fn toggle_fade(&mut self, fade_in: bool, fade_out: bool) -> bool {
        self.fade = FadeToggle { fade_in, fade_out };
        self.scheduler.request_repaint(false);
        self.fade.any()
    }

    pub fn set_fade_in_duration(&mut self, seconds: Seconds) {
        if !seconds.is_finite() || seconds < 0.0 {
            log::warn!("Ignoring invalid fade-in duration {}", seconds);
            return;
        }
        self.envelope.fade_in_seconds = seconds;
        self.scheduler.request_repaint(false);
    }

    pub fn set_fade_out_duration(&mut self, seconds: Seconds) {
        if !seconds.is_finite() || seconds < 0.0 {
            log::warn!("Ignoring invalid fade-out duration {}", seconds);
            return;
        }
        self.envelope.fade_out_seconds = seconds;
        self.scheduler.request_repaint(false);
    }

    pub fn set_loop_enabled(&mut self, enabled: bool) {
        self.controller.set_loop_enabled(enabled);
    }

    #[inline]
    pub fn loop_enabled(&self) -> bool {
        self.controller.loop_enabled()
    }

    pub fn set_delete_mode(&mut self, delete_mode: bool) {
        self.scheduler.set_delete_mode(delete_mode);
        self.scheduler.request_repaint(false);
    }

    /// Apply persisted settings in one step
    pub fn apply_config(&mut self, config: &PreviewConfig) {
        self.set_envelope(config.envelope);
        self.fade = config.fade_toggle();
        self.controller.set_loop_enabled(config.loop_enabled);
        self.scheduler.set_delete_mode(config.delete_mode);
        self.scheduler.request_repaint(true);
    }

    /// Current settings in persistable form
    pub fn config_snapshot(&self) -> PreviewConfig {
        PreviewConfig {
            envelope: self.envelope,
            fade_in_enabled: self.fade.fade_in,
            fade_out_enabled: self.fade.fade_out,
            loop_enabled: self.controller.loop_enabled(),
            delete_mode: self.scheduler.delete_mode(),
        }
    }

    // --- Region edits ---

    /// Move the region start programmatically
    pub fn set_region_start(&mut self, t: Seconds) -> RegionResult<()> {
        let change = self.region.set_start(t, EditIntent::Programmatic)?;
        self.dispatch_region_change(change);
        self.after_bounds_change();
        Ok(())
    }

    /// Move the region end programmatically
    pub fn set_region_end(&mut self, t: Seconds) -> RegionResult<()> {
        let change = self.region.set_end(t, EditIntent::Programmatic)?;
        self.dispatch_region_change(change);
        self.after_bounds_change();
        Ok(())
    }

    /// Replace both bounds; `false` means the edit was rejected and the
    /// previous bounds remain
    pub fn set_region_bounds(&mut self, start: Seconds, end: Seconds) -> bool {
        match self.region.set_bounds(start, end, EditIntent::Programmatic) {
            Ok(change) => {
                self.dispatch_region_change(change);
                self.after_bounds_change();
                true
            }
            Err(e) => {
                log::warn!("Rejected region bounds: {}", e);
                false
            }
        }
    }

    #[inline]
    pub fn region_bounds(&self) -> Option<RegionBounds> {
        self.region.bounds()
    }

    /// Bounds plus the active profile, for UI state displays
    pub fn current_region(&self) -> Option<RegionSnapshot> {
        self.region.bounds().map(|bounds| RegionSnapshot {
            start: bounds.start,
            end: bounds.end,
            profile: self.envelope.profile,
        })
    }

    // --- Drag gesture ---

    /// Mark the start of a handle drag; frames until the matching end call
    /// repaint unthrottled and skip per-frame history entries
    pub fn begin_region_drag(&mut self) {
        self.region.begin_gesture();
        self.scheduler.set_dragging(true);
    }

    /// One drag frame moving the start handle
    pub fn drag_region_start(&mut self, t: Seconds) -> RegionResult<()> {
        let change = self.region.set_start(t, EditIntent::Drag)?;
        self.dispatch_region_change(change);
        Ok(())
    }

    /// One drag frame moving the end handle
    pub fn drag_region_end(&mut self, t: Seconds) -> RegionResult<()> {
        let change = self.region.set_end(t, EditIntent::Drag)?;
        self.dispatch_region_change(change);
        Ok(())
    }

    /// Finish the drag; reports the whole gesture as one history entry
    pub fn end_region_drag(&mut self) {
        self.scheduler.set_dragging(false);
        if let Some(change) = self.region.end_gesture() {
            self.dispatch_region_change(change);
        }
        self.after_bounds_change();
    }

    // --- Clicks ---

    /// Route a timeline click: expand the nearest edge outside the region,
    /// pure seek inside
    pub fn click_timeline(&mut self, t: Seconds) {
        match self.region.click_at(t) {
            Ok(outcome) => {
                if let Some(change) = outcome.change {
                    self.dispatch_region_change(change);
                }
                self.seek_seconds(outcome.seek_to);
                if outcome.change.is_some() {
                    self.after_bounds_change();
                }
            }
            Err(e) => log::warn!("Click ignored: {}", e),
        }
    }

    // --- Playback ---

    pub fn play(&mut self) {
        let Some(bounds) = self.region.bounds() else {
            log::warn!("play ignored: no track loaded");
            return;
        };
        match self
            .controller
            .play(self.transport.as_mut(), &mut self.sync, bounds)
        {
            Ok(outcome) => self.dispatch(outcome),
            Err(e) => log::warn!("play failed: {}", e),
        }
    }

    pub fn pause(&mut self) {
        match self.controller.pause(self.transport.as_mut()) {
            Ok(outcome) => self.dispatch(outcome),
            Err(e) => log::warn!("pause failed: {}", e),
        }
    }

    /// Pause and return the playhead to the region start
    pub fn stop(&mut self) {
        let Some(bounds) = self.region.bounds() else {
            log::warn!("stop ignored: no track loaded");
            return;
        };
        match self
            .controller
            .stop(self.transport.as_mut(), &mut self.sync, bounds)
        {
            Ok(outcome) => self.dispatch(outcome),
            Err(e) => log::warn!("stop failed: {}", e),
        }
    }

    pub fn toggle_play_pause(&mut self) {
        let Some(bounds) = self.region.bounds() else {
            log::warn!("toggle ignored: no track loaded");
            return;
        };
        match self
            .controller
            .toggle(self.transport.as_mut(), &mut self.sync, bounds)
        {
            Ok(outcome) => self.dispatch(outcome),
            Err(e) => log::warn!("toggle failed: {}", e),
        }
    }

    /// Move the playhead to a fraction of the total duration
    pub fn seek_to(&mut self, fraction: f64) {
        let Some(duration) = self.region.track_duration() else {
            log::warn!("seek ignored: no track loaded");
            return;
        };
        if !fraction.is_finite() {
            log::warn!("Ignoring non-finite seek fraction");
            return;
        }
        self.seek_seconds(fraction.clamp(0.0, 1.0) * duration);
    }

    /// Restart from the region start if the engine escaped the region
    pub fn ensure_playback_within_bounds(&mut self) {
        let Some(bounds) = self.region.bounds() else {
            return;
        };
        match self
            .controller
            .ensure_within_bounds(self.transport.as_mut(), &mut self.sync, bounds)
        {
            Ok(outcome) => self.dispatch(outcome),
            Err(e) => log::warn!("bounds correction failed: {}", e),
        }
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.controller.is_playing()
    }

    /// Authoritative playhead position
    #[inline]
    pub fn position(&self) -> Seconds {
        self.sync.current()
    }

    // --- Pump ---

    /// One frame of work: drain engine events, run the playback tick,
    /// expire stale edit intents, push the envelope gain, and paint if due
    pub fn pump(&mut self, surface: &mut dyn Surface) {
        self.drain_transport_events();
        self.run_tick();
        self.region.maintain();
        self.update_volume();
        self.run_render(surface);
    }

    fn drain_transport_events(&mut self) {
        while let Some(event) = self.transport.poll_event() {
            match event {
                TransportEvent::Ready => {
                    log::debug!("transport ready");
                    self.scheduler.request_repaint(true);
                }
                TransportEvent::Progress(pos) => {
                    if self.controller.is_playing() {
                        let outcome = self.sync.sync(pos, SyncSource::Engine);
                        if outcome.notified() {
                            self.notify_time(self.sync.current());
                        }
                        self.scheduler.request_repaint(false);
                    }
                }
                TransportEvent::Seeking(pos) | TransportEvent::Seek(pos) => {
                    let outcome = self.sync.sync(pos, SyncSource::Seek);
                    if outcome.notified() {
                        self.notify_time(self.sync.current());
                    }
                    self.scheduler.request_repaint(false);
                }
                TransportEvent::Finish => {
                    let Some(bounds) = self.region.bounds() else {
                        continue;
                    };
                    match self.controller.handle_engine_stopped(
                        self.transport.as_mut(),
                        &mut self.sync,
                        bounds,
                    ) {
                        Ok(outcome) => self.dispatch(outcome),
                        Err(e) => log::warn!("finish handling failed: {}", e),
                    }
                }
            }
        }
    }

    fn run_tick(&mut self) {
        let Some(bounds) = self.region.bounds() else {
            return;
        };
        match self
            .controller
            .tick(self.transport.as_mut(), &mut self.sync, bounds)
        {
            Ok(outcome) => self.dispatch(outcome),
            Err(e) => log::warn!("tick failed: {}", e),
        }
    }

    /// Push the instantaneous envelope gain to the engine when it changed
    fn update_volume(&mut self) {
        let Some(bounds) = self.region.bounds() else {
            return;
        };
        let rel = bounds.relative_position(self.sync.current());
        let gain = effective_gain(&self.envelope, self.fade, rel, bounds.length());
        if self.last_volume == Some(gain) {
            return;
        }
        match self.transport.set_volume(gain) {
            Ok(()) => self.last_volume = Some(gain),
            Err(e) => log::warn!("volume update failed: {}", e),
        }
    }

    fn run_render(&mut self, surface: &mut dyn Surface) {
        let Some(bounds) = self.region.bounds() else {
            return;
        };
        let Some(duration) = self.region.track_duration() else {
            return;
        };
        self.scheduler.run(
            surface,
            bounds,
            duration,
            self.sync.current(),
            &self.envelope,
            self.fade,
        );
    }

    // --- Dispatch helpers ---

    /// Seek the engine and force the authoritative position along
    fn seek_seconds(&mut self, pos: Seconds) {
        if let Err(e) = playback::seek_seconds(self.transport.as_mut(), pos) {
            log::warn!("seek failed: {}", e);
            return;
        }
        let outcome = self.sync.sync(pos, SyncSource::Seek);
        if outcome.notified() {
            self.notify_time(self.sync.current());
        }
        self.scheduler.request_repaint(true);
    }

    /// Refresh the engine play window after the bounds moved while playing
    ///
    /// Without this the engine would keep the stale window and stop at the
    /// old end. Skipped mid-gesture; the gesture end refreshes once.
    fn after_bounds_change(&mut self) {
        if self.region.gesture_active() || !self.controller.is_playing() {
            return;
        }
        let Some(bounds) = self.region.bounds() else {
            return;
        };
        let result = if bounds.contains(self.transport.position()) {
            self.controller
                .play(self.transport.as_mut(), &mut self.sync, bounds)
        } else {
            self.controller
                .ensure_within_bounds(self.transport.as_mut(), &mut self.sync, bounds)
        };
        match result {
            Ok(outcome) => self.dispatch(outcome),
            Err(e) => log::warn!("window refresh failed: {}", e),
        }
    }

    fn dispatch_region_change(&mut self, change: RegionChange) {
        if let Some(cb) = &mut self.callbacks.on_region_change {
            cb(change);
        }
        // Drags repaint unthrottled for responsiveness
        self.scheduler.request_repaint(self.region.gesture_active());
    }

    fn dispatch(&mut self, outcome: ControlOutcome) {
        if let Some(playing) = outcome.play_state_changed {
            if let Some(cb) = &mut self.callbacks.on_play_state_change {
                cb(playing);
            }
        }
        if outcome.play_ended {
            if let Some(cb) = &mut self.callbacks.on_play_end {
                cb();
            }
        }
        if let Some(pos) = outcome.time_update {
            self.notify_time(pos);
        }
        if outcome.force_render {
            self.scheduler.request_repaint(true);
        } else if outcome.render {
            self.scheduler.request_repaint(false);
        }
    }

    fn notify_time(&mut self, pos: Seconds) {
        if let Some(cb) = &mut self.callbacks.on_time_update {
            cb(pos);
        }
    }
}
