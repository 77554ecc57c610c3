//! Audio transport for region preview
//!
//! The session core drives the [`AudioTransport`] trait; this module provides
//! the real backend and its plumbing:
//!
//! - **UI Thread**: sends commands via a lock-free ringbuffer
//! - **Audio Thread**: owns the decoded buffer and the play window, applies
//!   commands at buffer boundaries
//! - **Atomics**: the UI reads position/playing via relaxed atomics
//! - **Events**: finish notifications travel back over a bounded channel
//!
//! Decoded audio comes from [`AudioBuffer`], currently WAV via `hound`.

mod buffer;
mod command;
mod cpal_backend;
mod error;
mod transport;

pub use buffer::AudioBuffer;
pub use command::{command_channel, TransportCommand, COMMAND_QUEUE_CAPACITY};
pub use cpal_backend::{CpalTransport, TransportAtomics};
pub use error::{TransportError, TransportResult};
pub use transport::{AudioTransport, TransportEvent};
