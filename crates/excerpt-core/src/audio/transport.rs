//! Playback engine interface consumed by the session
//!
//! The session core never talks to a concrete audio backend; it drives this
//! trait. [`CpalTransport`](super::CpalTransport) implements it against a
//! real output device, and tests substitute a scripted double.

use super::buffer::AudioBuffer;
use super::error::TransportResult;
use crate::types::Seconds;

/// Events reported by the playback engine, drained once per pump
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportEvent {
    /// A track finished loading and is ready to play
    Ready,
    /// Forward progress while playing (position in seconds)
    Progress(Seconds),
    /// A seek is in flight (position in seconds)
    Seeking(Seconds),
    /// A seek completed (position in seconds)
    Seek(Seconds),
    /// Playback stopped on its own at the end of the play window
    Finish,
}

/// Imperative control surface of the playback engine
///
/// Positions are seconds except [`seek_to`](AudioTransport::seek_to), which
/// takes a fraction of the total duration. Commands may be applied
/// asynchronously by the backend; [`position`](AudioTransport::position) and
/// [`is_playing`](AudioTransport::is_playing) reflect its latest known state.
pub trait AudioTransport {
    /// Install a decoded track, replacing any previous one
    fn load(&mut self, buffer: AudioBuffer) -> TransportResult<()>;

    /// Play the window `[from, to)` in seconds; the engine stops on its own
    /// when it reaches `to`
    fn play(&mut self, from: Seconds, to: Seconds) -> TransportResult<()>;

    /// Pause playback, keeping the cursor where it is
    fn pause(&mut self) -> TransportResult<()>;

    /// Move the cursor to `fraction` of the total duration, in `[0, 1]`
    fn seek_to(&mut self, fraction: f64) -> TransportResult<()>;

    /// Latest known cursor position in seconds
    fn position(&self) -> Seconds;

    /// Total duration of the loaded track in seconds, 0 before any load
    fn duration(&self) -> Seconds;

    /// Output gain in `[0, 1]`; non-finite input is a warned no-op
    fn set_volume(&mut self, gain: f64) -> TransportResult<()>;

    /// Whether the engine is currently producing audio
    fn is_playing(&self) -> bool;

    /// Next pending engine event, `None` once drained
    fn poll_event(&mut self) -> Option<TransportEvent>;
}
