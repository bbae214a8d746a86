//! Infrastructure layer for midi-bridge.
//!
//! Everything that touches the outside world: MIDI hardware, TCP sockets,
//! the config file and the terminal.

pub mod console;
pub mod midi_backend;
pub mod network;
pub mod storage;
