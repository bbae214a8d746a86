//! MIDI hardware backends.
//!
//! The bridge treats the device API as an opaque capability: enumerate
//! inputs and outputs, open or close one by index, send a raw word, and
//! receive raw words through a callback.
//!
//! # Threading
//!
//! Backends invoke the input callback from a thread the bridge does not
//! control (the OS MIDI thread). The callback must not block; the registry
//! only decodes the word and hands it to a non-blocking sink.
//!
//! # Testability
//!
//! [`MidiBackend`] lets tests (and builds without the `hardware` feature)
//! run against [`mock::MockBackend`] instead of real devices.

use std::sync::Arc;

use midi_bridge_core::Direction;
use thiserror::Error;

pub mod mock;

#[cfg(feature = "hardware")]
pub mod midir;

/// Something a hardware input reports to its callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSignal {
    /// A short message packed as `status | data1 << 8 | data2 << 16`.
    Data(u32),
    /// The device went away; the handle stays registered until closed.
    Disconnected,
}

/// Callback installed on an open input.
pub type SignalCallback = Arc<dyn Fn(DeviceSignal) + Send + Sync>;

/// Error type for hardware backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("MIDI backend initialisation failed: {0}")]
    Init(String),

    #[error("no {direction} endpoint at index {index}")]
    NoSuchEndpoint { direction: Direction, index: usize },

    #[error("failed to open {direction} {index}: {reason}")]
    OpenFailed {
        direction: Direction,
        index: usize,
        reason: String,
    },

    #[error("failed to send to output {index}: {reason}")]
    SendFailed { index: usize, reason: String },
}

/// The device API seen by the registry.
pub trait MidiBackend: Send + Sync {
    /// Names of all input endpoints, in index order.
    fn input_names(&self) -> Vec<String>;

    /// Names of all output endpoints, in index order.
    fn output_names(&self) -> Vec<String>;

    /// Opens input `index`; `callback` receives every message it produces
    /// until the returned handle is closed.
    fn open_input(
        &self,
        index: usize,
        callback: SignalCallback,
    ) -> Result<Box<dyn InputHandle>, BackendError>;

    /// Opens output `index`.
    fn open_output(&self, index: usize) -> Result<Box<dyn OutputHandle>, BackendError>;
}

/// An open input endpoint.
pub trait InputHandle: Send {
    /// Stops delivery and releases the endpoint.
    fn close(self: Box<Self>);
}

/// An open output endpoint.
pub trait OutputHandle: Send {
    /// Plays one packed short message.
    fn send_raw(&mut self, word: u32) -> Result<(), BackendError>;

    /// Releases the endpoint.
    fn close(self: Box<Self>);
}

/// Packs the leading bytes of a short message the way drivers report them.
///
/// ```rust
/// use midi_bridge::infrastructure::midi_backend::pack_short_message;
///
/// assert_eq!(pack_short_message(&[0x90, 0x3C, 0x7F]), 0x007F_3C90);
/// assert_eq!(pack_short_message(&[0xF8]), 0x0000_00F8);
/// ```
pub fn pack_short_message(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(3)
        .enumerate()
        .fold(0u32, |word, (i, b)| word | (u32::from(*b) << (8 * i)))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
