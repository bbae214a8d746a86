//! Reassembly of 4-byte frames from an arbitrarily chunked byte stream.
//!
//! TCP is a *stream* protocol: a single `read()` may return half a frame, or
//! several frames and a fraction of the next. [`FrameAssembler`] accumulates
//! bytes across reads and hands out complete frames from the front, keeping
//! the 0–3 byte tail in place for the next read.

use crate::protocol::codec::{decode_frame_slice, ProtocolError};
use crate::protocol::event::MidiEvent;

/// Accumulates stream bytes and yields whole frames in arrival order.
///
/// # Examples
///
/// ```rust
/// use midi_bridge_core::{FrameAssembler, MidiEvent};
///
/// let mut asm = FrameAssembler::new();
/// asm.extend(&[0x90, 0x3C]);
/// assert_eq!(asm.next_event(), None);
///
/// asm.extend(&[0x7F, 0xFF, 0xB0]);
/// assert_eq!(asm.next_event(), Some(MidiEvent::new(0x90, 0x3C, 0x7F, 0xFF)));
/// assert_eq!(asm.next_event(), None);
/// assert_eq!(asm.pending(), 1);
/// ```
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buf: Vec<u8>,
    /// Read cursor into `buf`; bytes before it have already been handed out.
    offset: usize,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends bytes just read from the stream.
    ///
    /// Already-consumed bytes are compacted away first so the buffer only
    /// ever holds the unconsumed tail plus the new chunk.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.compact();
        self.buf.extend_from_slice(bytes);
    }

    /// Pops the next complete frame, or `None` if fewer than four bytes are
    /// pending.
    pub fn next_event(&mut self) -> Option<MidiEvent> {
        match decode_frame_slice(&self.buf[self.offset..]) {
            Ok((event, consumed)) => {
                self.offset += consumed;
                Some(event)
            }
            Err(ProtocolError::InsufficientData { .. }) => {
                self.compact();
                None
            }
        }
    }

    /// Drains every complete frame currently buffered.
    pub fn drain_events(&mut self) -> impl Iterator<Item = MidiEvent> + '_ {
        std::iter::from_fn(move || self.next_event())
    }

    /// Number of buffered bytes not yet handed out (always `< 4` after
    /// [`drain_events`](Self::drain_events) has run to completion).
    pub fn pending(&self) -> usize {
        self.buf.len() - self.offset
    }

    fn compact(&mut self) {
        if self.offset == 0 {
            return;
        }
        if self.offset == self.buf.len() {
            self.buf.clear();
        } else {
            self.buf.drain(..self.offset);
        }
        self.offset = 0;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::encode_frame;

    fn sample_stream() -> (Vec<MidiEvent>, Vec<u8>) {
        let events = vec![
            MidiEvent::new(0x90, 0x3C, 0x7F, 0xFF),
            MidiEvent::new(0x80, 0x3C, 0x00, 0xFF),
            MidiEvent::new(0xC2, 0x10, 0xFF, 0xFF),
            MidiEvent::new(0xF8, 0xFF, 0xFF, 0xFF),
            MidiEvent::new(0xE0, 0x00, 0x40, 0xFF),
        ];
        let bytes = events.iter().flat_map(|e| encode_frame(*e)).collect();
        (events, bytes)
    }

    fn feed_in_chunks(bytes: &[u8], chunk: usize) -> Vec<MidiEvent> {
        let mut asm = FrameAssembler::new();
        let mut out = Vec::new();
        for piece in bytes.chunks(chunk) {
            asm.extend(piece);
            out.extend(asm.drain_events());
        }
        out
    }

    #[test]
    fn test_single_block_yields_all_events() {
        let (events, bytes) = sample_stream();
        assert_eq!(feed_in_chunks(&bytes, bytes.len()), events);
    }

    #[test]
    fn test_one_byte_at_a_time_matches_single_block() {
        let (events, bytes) = sample_stream();
        assert_eq!(feed_in_chunks(&bytes, 1), events);
    }

    #[test]
    fn test_every_chunk_size_yields_same_sequence() {
        let (events, bytes) = sample_stream();
        for chunk in 1..=bytes.len() {
            assert_eq!(feed_in_chunks(&bytes, chunk), events, "chunk size {chunk}");
        }
    }

    #[test]
    fn test_four_and_a_half_frames_keeps_tail() {
        // Arrange: 18 bytes = 4 full frames + 2 bytes of the fifth
        let (events, bytes) = sample_stream();
        let mut asm = FrameAssembler::new();

        // Act
        asm.extend(&bytes[..18]);
        let first: Vec<_> = asm.drain_events().collect();

        // Assert
        assert_eq!(first, events[..4]);
        assert_eq!(asm.pending(), 2);

        // Completing the frame yields the fifth event without misalignment
        asm.extend(&bytes[18..]);
        assert_eq!(asm.next_event(), Some(events[4]));
        assert_eq!(asm.pending(), 0);
    }

    #[test]
    fn test_buffer_is_reset_when_fully_consumed() {
        let mut asm = FrameAssembler::new();
        asm.extend(&[0xF8, 0xFF, 0xFF, 0xFF]);
        assert!(asm.next_event().is_some());
        assert!(asm.next_event().is_none());
        assert_eq!(asm.pending(), 0);
        assert!(asm.buf.is_empty());
    }
}
