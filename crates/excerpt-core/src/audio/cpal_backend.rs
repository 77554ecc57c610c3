//! CPAL audio backend implementation
//!
//! Drives a single stereo output stream and implements [`AudioTransport`]
//! on top of it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                     ┌─────────────────────┐
//! │     UI Thread    │───push()───────────►│   Command Queue     │
//! │  (session pump)  │                     │  (lock-free SPSC)   │
//! └──────────────────┘                     └──────────┬──────────┘
//!        ▲    ▲                                       │ pop()
//!        │    │ Relaxed atomics                       ▼
//!        │    │ (position/playing)         ┌─────────────────────┐
//!        │    └─────────────────────────── │  CPAL Audio Thread  │
//!        │                                 │ (owns StreamState)  │
//!        │         finish events           └──────────┬──────────┘
//!        └──────────◄─────────────────────────────────┘
//!              (bounded crossbeam channel)
//! ```
//!
//! The callback owns the decoded buffer and a play window in frames; when
//! the cursor reaches the window end it stops on its own and reports a
//! finish event. Nothing on the callback path locks or allocates.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use crossbeam::channel::{Receiver, Sender};

use super::buffer::AudioBuffer;
use super::command::{command_channel, TransportCommand};
use super::error::{TransportError, TransportResult};
use super::transport::{AudioTransport, TransportEvent};
use crate::types::Seconds;

/// Capacity of the callback-to-UI event channel
///
/// Only finish events travel this way and the UI drains every pump, so a
/// small bound suffices.
const EVENT_QUEUE_CAPACITY: usize = 16;

/// Lock-free playback state shared between the audio thread and the UI
///
/// The audio thread publishes after each callback; the UI reads with
/// relaxed ordering. Play/pause/seek also store optimistically from the UI
/// side so reads are coherent before the callback applies the command.
pub struct TransportAtomics {
    position_frames: AtomicUsize,
    playing: AtomicBool,
}

impl TransportAtomics {
    fn new() -> Self {
        Self {
            position_frames: AtomicUsize::new(0),
            playing: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn position_frames(&self) -> usize {
        self.position_frames.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_position_frames(&self, frames: usize) {
        self.position_frames.store(frames, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Relaxed);
    }
}

// --- Audio thread side ---

/// State owned exclusively by the audio callback
struct StreamState {
    commands: rtrb::Consumer<TransportCommand>,
    atomics: Arc<TransportAtomics>,
    events: Sender<TransportEvent>,
    buffer: Option<AudioBuffer>,
    /// Next frame to play, in buffer frames
    cursor: usize,
    /// Exclusive end of the current play window, in buffer frames
    window_end: usize,
    playing: bool,
    volume: f32,
    output_channels: usize,
}

impl StreamState {
    fn new(
        commands: rtrb::Consumer<TransportCommand>,
        atomics: Arc<TransportAtomics>,
        events: Sender<TransportEvent>,
        output_channels: usize,
    ) -> Self {
        Self {
            commands,
            atomics,
            events,
            buffer: None,
            cursor: 0,
            window_end: 0,
            playing: false,
            volume: 1.0,
            output_channels,
        }
    }

    /// Apply pending UI commands at the buffer boundary (lock-free)
    fn apply_pending_commands(&mut self) {
        while let Ok(cmd) = self.commands.pop() {
            match cmd {
                TransportCommand::Load(buffer) => {
                    self.cursor = 0;
                    self.window_end = buffer.len_frames();
                    self.playing = false;
                    self.buffer = Some(*buffer);
                }
                TransportCommand::Play {
                    from_frame,
                    to_frame,
                } => {
                    if let Some(buffer) = &self.buffer {
                        let len = buffer.len_frames();
                        self.cursor = from_frame.min(len);
                        self.window_end = to_frame.min(len);
                        self.playing = true;
                    }
                }
                TransportCommand::Pause => self.playing = false,
                TransportCommand::Seek { frame } => {
                    let len = self.buffer.as_ref().map_or(0, AudioBuffer::len_frames);
                    self.cursor = frame.min(len);
                }
                TransportCommand::SetVolume { gain } => self.volume = gain.clamp(0.0, 1.0),
            }
        }
    }

    fn at_window_end(&self) -> bool {
        match &self.buffer {
            Some(buffer) => self.cursor >= self.window_end || self.cursor >= buffer.len_frames(),
            None => true,
        }
    }

    /// Fill one output buffer; called by the stream callback
    fn fill(&mut self, out: &mut [f32]) {
        self.apply_pending_commands();

        for frame_out in out.chunks_mut(self.output_channels) {
            frame_out.fill(0.0);
            if !self.playing {
                continue;
            }
            if self.at_window_end() {
                self.playing = false;
                let _ = self.events.try_send(TransportEvent::Finish);
                continue;
            }
            if let Some(buffer) = &self.buffer {
                let (l, r) = buffer.frame(self.cursor);
                frame_out[0] = l * self.volume;
                if self.output_channels > 1 {
                    frame_out[1] = r * self.volume;
                }
            }
            self.cursor += 1;
        }

        self.atomics.set_position_frames(self.cursor);
        self.atomics.set_playing(self.playing);
    }
}

// --- UI thread side ---

/// [`AudioTransport`] backed by a CPAL output stream
///
/// Dropping the transport stops audio output.
pub struct CpalTransport {
    commands: rtrb::Producer<TransportCommand>,
    atomics: Arc<TransportAtomics>,
    events: Receiver<TransportEvent>,
    /// Events produced synchronously on the UI side (ready, seek)
    pending: VecDeque<TransportEvent>,
    duration: Seconds,
    /// Sample rate of the loaded buffer, 0 before any load
    sample_rate: u32,
    /// Sample rate the output stream runs at
    stream_rate: u32,
    total_frames: usize,
    last_progress_frame: Option<usize>,
    _stream: Stream,
}

impl CpalTransport {
    /// Open the default output device and start a stream
    pub fn new() -> TransportResult<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(TransportError::NoDevices)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using audio device: {}", device_name);

        let supported = get_output_config(&device)?;
        let stream_rate = supported.sample_rate().0;
        let output_channels = supported.channels() as usize;
        log::info!("Audio config: {} channels, {}Hz", output_channels, stream_rate);

        let atomics = Arc::new(TransportAtomics::new());
        let (command_tx, command_rx) = command_channel();
        let (event_tx, event_rx) = crossbeam::channel::bounded(EVENT_QUEUE_CAPACITY);

        let mut state = StreamState::new(command_rx, Arc::clone(&atomics), event_tx, output_channels);
        let stream_config: StreamConfig = supported.config();
        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| state.fill(data),
                |err| log::error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| TransportError::StreamBuildError(e.to_string()))?;
        stream
            .play()
            .map_err(|e| TransportError::StreamPlayError(e.to_string()))?;
        log::info!("Audio stream started");

        Ok(Self {
            commands: command_tx,
            atomics,
            events: event_rx,
            pending: VecDeque::new(),
            duration: 0.0,
            sample_rate: 0,
            stream_rate,
            total_frames: 0,
            last_progress_frame: None,
            _stream: stream,
        })
    }

    fn push(&mut self, cmd: TransportCommand) -> TransportResult<()> {
        self.commands
            .push(cmd)
            .map_err(|_| TransportError::CommandQueueFull)
    }

    fn seconds_to_frame(&self, seconds: Seconds) -> usize {
        let frame = (seconds.max(0.0) * self.sample_rate as f64) as usize;
        frame.min(self.total_frames)
    }

    fn frame_to_seconds(&self, frame: usize) -> Seconds {
        if self.sample_rate == 0 {
            return 0.0;
        }
        frame as Seconds / self.sample_rate as Seconds
    }
}

impl AudioTransport for CpalTransport {
    fn load(&mut self, buffer: AudioBuffer) -> TransportResult<()> {
        if buffer.sample_rate() != self.stream_rate {
            log::warn!(
                "Track rate {}Hz differs from stream rate {}Hz; playing without resampling",
                buffer.sample_rate(),
                self.stream_rate
            );
        }
        self.duration = buffer.duration_seconds();
        self.sample_rate = buffer.sample_rate();
        self.total_frames = buffer.len_frames();
        self.last_progress_frame = None;
        self.atomics.set_position_frames(0);
        self.atomics.set_playing(false);
        self.push(TransportCommand::Load(Box::new(buffer)))?;
        self.pending.push_back(TransportEvent::Ready);
        Ok(())
    }

    fn play(&mut self, from: Seconds, to: Seconds) -> TransportResult<()> {
        if self.duration <= 0.0 {
            return Err(TransportError::NoTrackLoaded);
        }
        let from_frame = self.seconds_to_frame(from);
        let to_frame = self.seconds_to_frame(to);
        self.push(TransportCommand::Play {
            from_frame,
            to_frame,
        })?;
        self.atomics.set_position_frames(from_frame);
        self.atomics.set_playing(true);
        Ok(())
    }

    fn pause(&mut self) -> TransportResult<()> {
        self.push(TransportCommand::Pause)?;
        self.atomics.set_playing(false);
        Ok(())
    }

    fn seek_to(&mut self, fraction: f64) -> TransportResult<()> {
        if self.duration <= 0.0 {
            return Err(TransportError::NoTrackLoaded);
        }
        if !fraction.is_finite() {
            log::warn!("Ignoring non-finite seek fraction");
            return Ok(());
        }
        let frame = (self.total_frames as f64 * fraction.clamp(0.0, 1.0)) as usize;
        let frame = frame.min(self.total_frames);
        self.push(TransportCommand::Seek { frame })?;
        self.atomics.set_position_frames(frame);
        self.pending
            .push_back(TransportEvent::Seek(self.frame_to_seconds(frame)));
        Ok(())
    }

    fn position(&self) -> Seconds {
        self.frame_to_seconds(self.atomics.position_frames())
    }

    fn duration(&self) -> Seconds {
        self.duration
    }

    fn set_volume(&mut self, gain: f64) -> TransportResult<()> {
        if !gain.is_finite() {
            log::warn!("Ignoring non-finite volume");
            return Ok(());
        }
        self.push(TransportCommand::SetVolume {
            gain: gain.clamp(0.0, 1.0) as f32,
        })
    }

    fn is_playing(&self) -> bool {
        self.atomics.is_playing()
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        if let Ok(event) = self.events.try_recv() {
            return Some(event);
        }
        // Synthesize progress reports from the advancing cursor
        if self.is_playing() {
            let frame = self.atomics.position_frames();
            if self.last_progress_frame != Some(frame) {
                self.last_progress_frame = Some(frame);
                return Some(TransportEvent::Progress(self.frame_to_seconds(frame)));
            }
        }
        None
    }
}

/// Pick an f32 output configuration for the device
fn get_output_config(device: &cpal::Device) -> TransportResult<cpal::SupportedStreamConfig> {
    let default = device
        .default_output_config()
        .map_err(|e| TransportError::ConfigError(e.to_string()))?;
    if default.sample_format() == SampleFormat::F32 {
        return Ok(default);
    }

    // Fall back to any f32 config the device supports
    let mut configs = device
        .supported_output_configs()
        .map_err(|e| TransportError::ConfigError(e.to_string()))?;
    configs
        .find(|c| c.sample_format() == SampleFormat::F32)
        .map(|c| c.with_max_sample_rate())
        .ok_or_else(|| {
            TransportError::UnsupportedFormat(format!("{:?}", default.sample_format()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Callback state wired to fresh channels, no device needed
    fn make_state() -> (
        rtrb::Producer<TransportCommand>,
        Receiver<TransportEvent>,
        Arc<TransportAtomics>,
        StreamState,
    ) {
        let (tx, rx) = command_channel();
        let (event_tx, event_rx) = crossbeam::channel::bounded(EVENT_QUEUE_CAPACITY);
        let atomics = Arc::new(TransportAtomics::new());
        let state = StreamState::new(rx, Arc::clone(&atomics), event_tx, 2);
        (tx, event_rx, atomics, state)
    }

    /// Buffer whose frame i holds the value i, for easy assertions
    fn counting_buffer(frames: usize) -> AudioBuffer {
        AudioBuffer::from_mono((0..frames).map(|i| i as f32).collect(), 100)
    }

    #[test]
    fn test_plays_window_then_stops_with_finish() {
        let (mut tx, events, atomics, mut state) = make_state();
        tx.push(TransportCommand::Load(Box::new(counting_buffer(100))))
            .unwrap();
        tx.push(TransportCommand::Play {
            from_frame: 10,
            to_frame: 20,
        })
        .unwrap();

        let mut out = vec![f32::NAN; 64];
        state.fill(&mut out);

        // Ten frames of audio, silence after the window end
        assert_eq!(out[0], 10.0);
        assert_eq!(out[18], 19.0);
        assert_eq!(out[20], 0.0);
        assert_eq!(out[63], 0.0);

        assert_eq!(atomics.position_frames(), 20);
        assert!(!atomics.is_playing());
        assert_eq!(events.try_recv(), Ok(TransportEvent::Finish));
    }

    #[test]
    fn test_pause_holds_cursor() {
        let (mut tx, _events, atomics, mut state) = make_state();
        tx.push(TransportCommand::Load(Box::new(counting_buffer(100))))
            .unwrap();
        tx.push(TransportCommand::Play {
            from_frame: 0,
            to_frame: 100,
        })
        .unwrap();

        let mut out = vec![0.0; 64];
        state.fill(&mut out);
        assert_eq!(atomics.position_frames(), 32);

        tx.push(TransportCommand::Pause).unwrap();
        state.fill(&mut out);
        assert_eq!(atomics.position_frames(), 32);
        assert!(!atomics.is_playing());
        assert_eq!(out[0], 0.0);
    }

    #[test]
    fn test_seek_moves_cursor_without_playing() {
        let (mut tx, _events, atomics, mut state) = make_state();
        tx.push(TransportCommand::Load(Box::new(counting_buffer(100))))
            .unwrap();
        tx.push(TransportCommand::Seek { frame: 40 }).unwrap();

        let mut out = vec![0.0; 8];
        state.fill(&mut out);
        assert_eq!(atomics.position_frames(), 40);
        assert!(!atomics.is_playing());
        assert_eq!(out[0], 0.0);
    }

    #[test]
    fn test_volume_scales_output() {
        let (mut tx, _events, _atomics, mut state) = make_state();
        tx.push(TransportCommand::Load(Box::new(AudioBuffer::from_mono(
            vec![1.0; 16],
            100,
        ))))
        .unwrap();
        tx.push(TransportCommand::SetVolume { gain: 0.5 }).unwrap();
        tx.push(TransportCommand::Play {
            from_frame: 0,
            to_frame: 16,
        })
        .unwrap();

        let mut out = vec![0.0; 8];
        state.fill(&mut out);
        assert_eq!(out[0], 0.5);
        assert_eq!(out[1], 0.5);
    }

    #[test]
    fn test_play_without_buffer_ignored() {
        let (mut tx, events, atomics, mut state) = make_state();
        tx.push(TransportCommand::Play {
            from_frame: 0,
            to_frame: 100,
        })
        .unwrap();

        let mut out = vec![1.0; 8];
        state.fill(&mut out);
        assert!(!atomics.is_playing());
        assert_eq!(out, vec![0.0; 8]);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_atomics_round_trip() {
        let atomics = TransportAtomics::new();
        assert_eq!(atomics.position_frames(), 0);
        assert!(!atomics.is_playing());

        atomics.set_position_frames(44100);
        atomics.set_playing(true);
        assert_eq!(atomics.position_frames(), 44100);
        assert!(atomics.is_playing());
    }
}
