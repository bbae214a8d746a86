//! Frame codec for the bridge's wire protocol.
//!
//! Wire format:
//! ```text
//! [status:1][data1:1][data2:1][data3:1]
//! ```
//! Exactly four bytes per event, no header and no length prefix. Decoding is
//! deliberately permissive: a frame whose status byte disagrees with its data
//! bytes is decoded literally, never rejected, so that clients speaking newer
//! or non-standard message types still get through.

use thiserror::Error;

use crate::protocol::event::MidiEvent;
use crate::protocol::FRAME_SIZE;

/// Errors that can occur while decoding frames from a byte slice.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The byte slice is shorter than one frame.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes an event as one wire frame.
///
/// # Examples
///
/// ```rust
/// use midi_bridge_core::{encode_frame, MidiEvent};
///
/// let bytes = encode_frame(MidiEvent::new(0x90, 0x3C, 0x7F, 0xFF));
/// assert_eq!(bytes, [0x90, 0x3C, 0x7F, 0xFF]);
/// ```
pub fn encode_frame(event: MidiEvent) -> [u8; FRAME_SIZE] {
    [event.status, event.data1, event.data2, event.data3]
}

/// Decodes one wire frame. Never fails.
pub fn decode_frame(bytes: [u8; FRAME_SIZE]) -> MidiEvent {
    MidiEvent::new(bytes[0], bytes[1], bytes[2], bytes[3])
}

/// Decodes one frame from the beginning of `bytes`.
///
/// Returns the event and the number of bytes consumed (always
/// [`FRAME_SIZE`]), so the caller can advance their read cursor.
///
/// # Errors
///
/// Returns [`ProtocolError::InsufficientData`] when fewer than four bytes are
/// available. That is the normal "wait for more input" signal while reading
/// from a stream.
///
/// # Examples
///
/// ```rust
/// use midi_bridge_core::{decode_frame_slice, MidiEvent};
///
/// let (ev, n) = decode_frame_slice(&[0xC0, 0x07, 0xFF, 0xFF, 0x90]).unwrap();
/// assert_eq!(ev, MidiEvent::new(0xC0, 0x07, 0xFF, 0xFF));
/// assert_eq!(n, 4);
/// ```
pub fn decode_frame_slice(bytes: &[u8]) -> Result<(MidiEvent, usize), ProtocolError> {
    if bytes.len() < FRAME_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: FRAME_SIZE,
            available: bytes.len(),
        });
    }
    let frame = [bytes[0], bytes[1], bytes[2], bytes[3]];
    Ok((decode_frame(frame), FRAME_SIZE))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
