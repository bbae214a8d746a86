//! Protocol module containing the event model, the frame codec, and stream
//! reassembly.
//!
//! Wire format (one frame per event, no header, no length prefix):
//! ```text
//! [status:1][data1:1][data2:1][data3:1]
//! ```

pub mod assembler;
pub mod codec;
pub mod event;

pub use assembler::FrameAssembler;
pub use codec::{decode_frame, decode_frame_slice, encode_frame, ProtocolError};
pub use event::{MessageKind, MidiEvent, StatusClass};

/// Size of one wire frame in bytes.
pub const FRAME_SIZE: usize = 4;

/// Byte value marking "no data byte here".
pub const SENTINEL: u8 = 0xFF;

/// TCP port the bridge listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 52364;
