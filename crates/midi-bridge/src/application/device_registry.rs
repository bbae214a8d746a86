//! Device registry: which hardware endpoints are attached to the bridge.
//!
//! The registry owns every open input and output handle, keyed by the
//! endpoint's index within its direction. Incoming hardware words are
//! decoded in the backend's callback thread and handed straight to an
//! [`EventSink`]; outgoing events are written to every open output.
//!
//! # Locking
//!
//! Inputs and outputs live behind separate `std::sync::Mutex`es. The input
//! callback never touches either lock, so a backend that delivers messages
//! while `open_input` is still running cannot deadlock against the registry.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use midi_bridge_core::{Direction, EndpointInfo, EndpointRef, MidiEvent};
use tracing::{debug, info, warn};

use crate::application::trace::TraceLog;
use crate::infrastructure::midi_backend::{
    BackendError, DeviceSignal, InputHandle, MidiBackend, OutputHandle, SignalCallback,
};

/// Receiver of decoded hardware input events.
///
/// Called from the backend's callback thread; implementations must not
/// block.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    fn deliver(&self, event: MidiEvent);
}

/// Owns the open hardware handles.
pub struct DeviceRegistry {
    backend: Arc<dyn MidiBackend>,
    sink: Arc<dyn EventSink>,
    trace: Arc<TraceLog>,
    inputs: Mutex<BTreeMap<usize, Box<dyn InputHandle>>>,
    outputs: Mutex<BTreeMap<usize, Box<dyn OutputHandle>>>,
}

impl DeviceRegistry {
    pub fn new(
        backend: Arc<dyn MidiBackend>,
        sink: Arc<dyn EventSink>,
        trace: Arc<TraceLog>,
    ) -> Self {
        Self {
            backend,
            sink,
            trace,
            inputs: Mutex::new(BTreeMap::new()),
            outputs: Mutex::new(BTreeMap::new()),
        }
    }

    fn inputs(&self) -> MutexGuard<'_, BTreeMap<usize, Box<dyn InputHandle>>> {
        self.inputs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn outputs(&self) -> MutexGuard<'_, BTreeMap<usize, Box<dyn OutputHandle>>> {
        self.outputs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lists every endpoint, inputs first, with its global id and open state.
    pub fn enumerate_all(&self) -> Vec<EndpointInfo> {
        let input_names = self.backend.input_names();
        let output_names = self.backend.output_names();
        let input_count = input_names.len();

        let inputs = self.inputs();
        let outputs = self.outputs();

        let ins = input_names.into_iter().enumerate().map(|(index, name)| {
            (EndpointRef::input(index), name, inputs.contains_key(&index))
        });
        let outs = output_names.into_iter().enumerate().map(|(index, name)| {
            (EndpointRef::output(index), name, outputs.contains_key(&index))
        });

        let list: Vec<EndpointInfo> = ins
            .chain(outs)
            .map(|(endpoint, name, open)| EndpointInfo {
                global_id: endpoint.global_id(input_count),
                endpoint,
                name,
                open,
            })
            .collect();
        list
    }

    /// Opens every endpoint that is not already open.
    ///
    /// Failures are logged and leave the endpoint closed. Returns the number
    /// of endpoints opened by this call.
    pub fn open_all(&self) -> usize {
        let input_count = self.backend.input_names().len();
        let output_count = self.backend.output_names().len();

        let opened = (0..input_count)
            .map(EndpointRef::input)
            .chain((0..output_count).map(EndpointRef::output))
            .filter(|ep| matches!(self.open(*ep), Ok(true)))
            .count();

        info!("{opened} MIDI endpoint(s) opened");
        opened
    }

    /// Closes every open endpoint. Safe to call repeatedly.
    pub fn close_all(&self) {
        let inputs = std::mem::take(&mut *self.inputs());
        let outputs = std::mem::take(&mut *self.outputs());
        let closed = inputs.len() + outputs.len();

        for handle in inputs.into_values() {
            handle.close();
        }
        for handle in outputs.into_values() {
            handle.close();
        }

        if closed > 0 {
            info!("{closed} MIDI endpoint(s) closed");
        }
    }

    /// Opens or closes the endpoint with the given 1-based global id.
    ///
    /// Returns the endpoint's new open state, or `None` (and does nothing)
    /// when the id is `0` or past the last output.
    pub fn toggle(&self, global_id: usize) -> Option<bool> {
        let input_count = self.backend.input_names().len();
        let output_count = self.backend.output_names().len();
        let endpoint = EndpointRef::from_global_id(global_id, input_count, output_count)?;

        if self.close(endpoint) {
            return Some(false);
        }
        Some(matches!(self.open(endpoint), Ok(true)))
    }

    /// Plays `event` on every open output.
    ///
    /// A failing output is logged and skipped. Returns how many outputs
    /// accepted the event.
    pub fn emit(&self, event: MidiEvent) -> usize {
        self.trace.record_output(&event);
        debug!("OUT: {event}");

        let word = event.to_hardware_word();
        let mut delivered = 0;
        for (index, handle) in self.outputs().iter_mut() {
            match handle.send_raw(word) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("output {index}: {e}"),
            }
        }
        delivered
    }

    /// Returns `Ok(true)` if the endpoint was opened, `Ok(false)` if it was
    /// already open.
    fn open(&self, endpoint: EndpointRef) -> Result<bool, BackendError> {
        let result = match endpoint.direction {
            Direction::Input => {
                let mut inputs = self.inputs();
                if inputs.contains_key(&endpoint.index) {
                    return Ok(false);
                }
                self.backend
                    .open_input(endpoint.index, self.input_callback(endpoint.index))
                    .map(|handle| {
                        inputs.insert(endpoint.index, handle);
                    })
            }
            Direction::Output => {
                let mut outputs = self.outputs();
                if outputs.contains_key(&endpoint.index) {
                    return Ok(false);
                }
                self.backend.open_output(endpoint.index).map(|handle| {
                    outputs.insert(endpoint.index, handle);
                })
            }
        };

        match result {
            Ok(()) => {
                debug!("{} {} opened", endpoint.direction, endpoint.index);
                Ok(true)
            }
            Err(e) => {
                warn!("{e}");
                Err(e)
            }
        }
    }

    /// Returns `true` if the endpoint was open.
    fn close(&self, endpoint: EndpointRef) -> bool {
        let closed = match endpoint.direction {
            Direction::Input => self.inputs().remove(&endpoint.index).map(|h| h.close()),
            Direction::Output => self.outputs().remove(&endpoint.index).map(|h| h.close()),
        };
        if closed.is_some() {
            debug!("{} {} closed", endpoint.direction, endpoint.index);
        }
        closed.is_some()
    }

    fn input_callback(&self, index: usize) -> SignalCallback {
        let sink = Arc::clone(&self.sink);
        let trace = Arc::clone(&self.trace);
        Arc::new(move |signal| match signal {
            DeviceSignal::Data(word) => {
                let event = MidiEvent::from_hardware_word(word);
                trace.record_input(&event);
                debug!("IN: {event}");
                sink.deliver(event);
            }
            DeviceSignal::Disconnected => {
                info!("MIDI input {index} was disconnected");
                trace.record_misc(&format!("Device ({index:x}) was disconnected."));
            }
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
