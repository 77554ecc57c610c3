//! Lock-free command queue for real-time transport control
//!
//! The UI thread sends commands via a lock-free queue and the audio thread
//! applies them at buffer boundaries. The `rtrb` ringbuffer is wait-free on
//! both ends and allocation-free after startup, so a burst of UI commands
//! can never stall the audio callback into a dropout.

use super::buffer::AudioBuffer;

/// Commands sent from the UI thread to the audio thread
///
/// Positions are in buffer frames; the UI side converts from seconds before
/// queueing so the callback never does float math on the wire format.
pub enum TransportCommand {
    /// Install a decoded track, replacing any previous one
    ///
    /// Boxed so the command enum itself stays pointer-sized for
    /// cache-efficient queueing.
    Load(Box<AudioBuffer>),
    /// Start playback of the window `[from_frame, to_frame)`
    Play { from_frame: usize, to_frame: usize },
    /// Pause playback, keeping the cursor where it is
    Pause,
    /// Move the cursor without changing the play state
    Seek { frame: usize },
    /// Set the output gain in `[0, 1]`
    SetVolume { gain: f32 },
}

/// Capacity of the command queue
///
/// Seeks are throttled to ~60 Hz upstream, so even a busy drag produces a
/// handful of commands per callback interval. 64 leaves generous headroom.
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Create a new command channel (producer/consumer pair)
///
/// The producer side is owned by the UI thread, the consumer side by the
/// audio callback. Bounded to [`COMMAND_QUEUE_CAPACITY`] commands.
pub fn command_channel() -> (
    rtrb::Producer<TransportCommand>,
    rtrb::Consumer<TransportCommand>,
) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}
