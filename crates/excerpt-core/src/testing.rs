//! Shared test doubles
//!
//! Deterministic stand-ins for the wall clock, the audio engine, and the
//! paint surface, so component tests control time and observe every engine
//! call without real devices.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::audio::{AudioBuffer, AudioTransport, TransportEvent, TransportResult};
use crate::clock::Clock;
use crate::position::PositionSync;
use crate::render::{Scene, Surface};
use crate::types::Seconds;

/// Clock that only moves when told to
pub(crate) struct ManualClock {
    origin: Instant,
    offset: Cell<Duration>,
}

impl ManualClock {
    pub(crate) fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Cell::new(Duration::ZERO),
        }
    }

    pub(crate) fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }
}

/// Position synchronizer on a manual clock with a track installed
pub(crate) fn manual_sync(duration: Seconds) -> (PositionSync, Rc<ManualClock>) {
    let clock = Rc::new(ManualClock::new());
    let mut sync = PositionSync::new(clock.clone());
    sync.set_track_duration(duration);
    (sync, clock)
}

/// Transport double with settable state and a full call record
pub(crate) struct ScriptedTransport {
    pub position: Seconds,
    pub duration: Seconds,
    pub playing: bool,
    pub volume: f64,
    pub events: VecDeque<TransportEvent>,
    pub play_calls: Vec<(Seconds, Seconds)>,
    pub seek_calls: Vec<f64>,
    pub pause_count: usize,
}

impl ScriptedTransport {
    pub(crate) fn with_duration(duration: Seconds) -> Self {
        Self {
            position: 0.0,
            duration,
            playing: false,
            volume: 1.0,
            events: VecDeque::new(),
            play_calls: Vec::new(),
            seek_calls: Vec::new(),
            pause_count: 0,
        }
    }
}

impl AudioTransport for ScriptedTransport {
    fn load(&mut self, buffer: AudioBuffer) -> TransportResult<()> {
        self.duration = buffer.duration_seconds();
        self.position = 0.0;
        self.playing = false;
        self.events.push_back(TransportEvent::Ready);
        Ok(())
    }

    fn play(&mut self, from: Seconds, to: Seconds) -> TransportResult<()> {
        self.play_calls.push((from, to));
        self.position = from;
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> TransportResult<()> {
        self.pause_count += 1;
        self.playing = false;
        Ok(())
    }

    fn seek_to(&mut self, fraction: f64) -> TransportResult<()> {
        self.seek_calls.push(fraction);
        self.position = fraction.clamp(0.0, 1.0) * self.duration;
        Ok(())
    }

    fn position(&self) -> Seconds {
        self.position
    }

    fn duration(&self) -> Seconds {
        self.duration
    }

    fn set_volume(&mut self, gain: f64) -> TransportResult<()> {
        self.volume = gain;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.events.pop_front()
    }
}

/// The session owns its transport, so tests hand it a shared handle and
/// keep the other one for scripting engine state mid-test
impl AudioTransport for Rc<RefCell<ScriptedTransport>> {
    fn load(&mut self, buffer: AudioBuffer) -> TransportResult<()> {
        self.borrow_mut().load(buffer)
    }

    fn play(&mut self, from: Seconds, to: Seconds) -> TransportResult<()> {
        self.borrow_mut().play(from, to)
    }

    fn pause(&mut self) -> TransportResult<()> {
        self.borrow_mut().pause()
    }

    fn seek_to(&mut self, fraction: f64) -> TransportResult<()> {
        self.borrow_mut().seek_to(fraction)
    }

    fn position(&self) -> Seconds {
        self.borrow().position
    }

    fn duration(&self) -> Seconds {
        self.borrow().duration
    }

    fn set_volume(&mut self, gain: f64) -> TransportResult<()> {
        self.borrow_mut().set_volume(gain)
    }

    fn is_playing(&self) -> bool {
        self.borrow().playing
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.borrow_mut().poll_event()
    }
}

/// Surface that keeps every painted scene
#[derive(Default)]
pub(crate) struct RecordingSurface {
    pub scenes: Vec<Scene>,
}

impl Surface for RecordingSurface {
    fn paint(&mut self, scene: &Scene) {
        self.scenes.push(scene.clone());
    }
}
