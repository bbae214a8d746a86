//! Hardware backend on top of `midir` (ALSA, CoreMIDI, WinMM).
//!
//! `midir` consumes the `MidiInput`/`MidiOutput` client when connecting, so
//! a fresh client is created for every enumeration and every open. Port
//! indices are resolved against the port list at the time of the call.
//!
//! `midir` does not report unplugged devices; [`DeviceSignal::Disconnected`]
//! is never produced by this backend.

use midi_bridge_core::{Direction, MidiEvent};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use tracing::debug;

use super::{
    pack_short_message, BackendError, DeviceSignal, InputHandle, MidiBackend, OutputHandle,
    SignalCallback,
};

const CLIENT_NAME: &str = "midi-bridge";

/// [`MidiBackend`] backed by the system MIDI API.
#[derive(Debug)]
pub struct MidirBackend;

impl MidirBackend {
    /// Checks that the system MIDI API is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Init`] if no MIDI client can be created
    /// (e.g. no ALSA sequencer).
    pub fn new() -> Result<Self, BackendError> {
        new_input()?;
        new_output()?;
        Ok(Self)
    }
}

fn new_input() -> Result<MidiInput, BackendError> {
    MidiInput::new(CLIENT_NAME).map_err(|e| BackendError::Init(e.to_string()))
}

fn new_output() -> Result<MidiOutput, BackendError> {
    MidiOutput::new(CLIENT_NAME).map_err(|e| BackendError::Init(e.to_string()))
}

impl MidiBackend for MidirBackend {
    fn input_names(&self) -> Vec<String> {
        let Ok(input) = new_input() else {
            return Vec::new();
        };
        input
            .ports()
            .iter()
            .map(|p| input.port_name(p).unwrap_or_else(|_| "<unknown>".to_string()))
            .collect()
    }

    fn output_names(&self) -> Vec<String> {
        let Ok(output) = new_output() else {
            return Vec::new();
        };
        output
            .ports()
            .iter()
            .map(|p| output.port_name(p).unwrap_or_else(|_| "<unknown>".to_string()))
            .collect()
    }

    fn open_input(
        &self,
        index: usize,
        callback: SignalCallback,
    ) -> Result<Box<dyn InputHandle>, BackendError> {
        let mut input = new_input()?;
        // Clock and active sensing are forwarded like any other message.
        input.ignore(Ignore::None);

        let ports = input.ports();
        let port = ports.get(index).ok_or(BackendError::NoSuchEndpoint {
            direction: Direction::Input,
            index,
        })?;

        let conn = input
            .connect(
                port,
                "midi-bridge-in",
                move |_stamp, message, _| {
                    if !message.is_empty() {
                        callback(DeviceSignal::Data(pack_short_message(message)));
                    }
                },
                (),
            )
            .map_err(|e| BackendError::OpenFailed {
                direction: Direction::Input,
                index,
                reason: e.to_string(),
            })?;

        debug!("midir input {index} connected");
        Ok(Box::new(MidirInput { conn }))
    }

    fn open_output(&self, index: usize) -> Result<Box<dyn OutputHandle>, BackendError> {
        let output = new_output()?;
        let ports = output.ports();
        let port = ports.get(index).ok_or(BackendError::NoSuchEndpoint {
            direction: Direction::Output,
            index,
        })?;

        let conn = output
            .connect(port, "midi-bridge-out")
            .map_err(|e| BackendError::OpenFailed {
                direction: Direction::Output,
                index,
                reason: e.to_string(),
            })?;

        debug!("midir output {index} connected");
        Ok(Box::new(MidirOutput { index, conn }))
    }
}

struct MidirInput {
    conn: MidiInputConnection<()>,
}

impl InputHandle for MidirInput {
    fn close(self: Box<Self>) {
        let _ = self.conn.close();
    }
}

struct MidirOutput {
    index: usize,
    conn: MidiOutputConnection,
}

impl OutputHandle for MidirOutput {
    fn send_raw(&mut self, word: u32) -> Result<(), BackendError> {
        let bytes = MidiEvent::from_hardware_word(word).short_message();
        self.conn
            .send(&bytes)
            .map_err(|e| BackendError::SendFailed {
                index: self.index,
                reason: e.to_string(),
            })
    }

    fn close(self: Box<Self>) {
        let _ = self.conn.close();
    }
}
