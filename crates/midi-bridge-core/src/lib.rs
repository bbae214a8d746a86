//! # midi-bridge-core
//!
//! Shared library for the MIDI bridge containing the event model, the MIDI
//! status classification table, the 4-byte wire frame codec, and the endpoint
//! identifier types used by the device registry.
//!
//! It has zero dependencies on OS APIs, MIDI drivers, or network sockets.
//!
//! # Architecture overview
//!
//! The bridge sits between a MIDI interface and exactly one TCP client:
//!
//! ```text
//! MIDI in  ──► packed hardware word ──► MidiEvent ──► 4-byte frame ──► TCP client
//! MIDI out ◄── packed hardware word ◄── MidiEvent ◄── 4-byte frame ◄── TCP client
//! ```
//!
//! - **`protocol`** – The [`MidiEvent`] value type, the status byte
//!   classification ([`StatusClass`]), the frame codec, and the
//!   [`FrameAssembler`] that turns an arbitrary TCP byte stream back into whole
//!   frames.
//!
//! - **`domain`** – Endpoint descriptors and the 1-based "global id" numbering
//!   that spans all inputs followed by all outputs.

pub mod domain;
pub mod protocol;

pub use domain::endpoint::{Direction, EndpointInfo, EndpointRef};
pub use protocol::assembler::FrameAssembler;
pub use protocol::codec::{decode_frame, decode_frame_slice, encode_frame, ProtocolError};
pub use protocol::event::{MessageKind, MidiEvent, StatusClass};
pub use protocol::{DEFAULT_PORT, FRAME_SIZE, SENTINEL};
