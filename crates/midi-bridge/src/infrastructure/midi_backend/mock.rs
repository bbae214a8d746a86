//! In-memory MIDI backend.
//!
//! Used by the test suite and by builds without the `hardware` feature.
//! Tests inject input words as if a device produced them and inspect the
//! words written to outputs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use midi_bridge_core::Direction;

use super::{BackendError, DeviceSignal, InputHandle, MidiBackend, OutputHandle, SignalCallback};

#[derive(Default)]
struct MockState {
    inputs: Vec<String>,
    outputs: Vec<String>,
    callbacks: BTreeMap<usize, SignalCallback>,
    open_outputs: BTreeSet<usize>,
    failing_inputs: BTreeSet<usize>,
    failing_outputs: BTreeSet<usize>,
    failing_sends: BTreeSet<usize>,
    sent: Vec<(usize, u32)>,
}

/// A [`MidiBackend`] with named in-memory endpoints.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Creates a backend exposing the given endpoint names.
    pub fn new(inputs: &[&str], outputs: &[&str]) -> Self {
        let state = MockState {
            inputs: inputs.iter().map(|s| (*s).to_string()).collect(),
            outputs: outputs.iter().map(|s| (*s).to_string()).collect(),
            ..MockState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every later `open_input(index)` fail.
    pub fn fail_open_input(&self, index: usize) {
        self.lock().failing_inputs.insert(index);
    }

    /// Makes every later `open_output(index)` fail.
    pub fn fail_open_output(&self, index: usize) {
        self.lock().failing_outputs.insert(index);
    }

    /// Makes `send_raw` on output `index` fail.
    pub fn fail_send(&self, index: usize) {
        self.lock().failing_sends.insert(index);
    }

    /// Delivers `word` on input `index` as if the device produced it.
    ///
    /// Returns `false` when that input is not open.
    pub fn inject_input(&self, index: usize, word: u32) -> bool {
        self.signal(index, DeviceSignal::Data(word))
    }

    /// Reports input `index` as disconnected.
    pub fn disconnect_input(&self, index: usize) -> bool {
        self.signal(index, DeviceSignal::Disconnected)
    }

    fn signal(&self, index: usize, signal: DeviceSignal) -> bool {
        // Call outside the lock; the callback may be slow.
        let callback = self.lock().callbacks.get(&index).cloned();
        match callback {
            Some(cb) => {
                cb(signal);
                true
            }
            None => false,
        }
    }

    /// Every `(output index, word)` written so far, in order.
    pub fn sent_words(&self) -> Vec<(usize, u32)> {
        self.lock().sent.clone()
    }

    pub fn is_input_open(&self, index: usize) -> bool {
        self.lock().callbacks.contains_key(&index)
    }

    pub fn is_output_open(&self, index: usize) -> bool {
        self.lock().open_outputs.contains(&index)
    }
}

impl MidiBackend for MockBackend {
    fn input_names(&self) -> Vec<String> {
        self.lock().inputs.clone()
    }

    fn output_names(&self) -> Vec<String> {
        self.lock().outputs.clone()
    }

    fn open_input(
        &self,
        index: usize,
        callback: SignalCallback,
    ) -> Result<Box<dyn InputHandle>, BackendError> {
        let mut state = self.lock();
        if index >= state.inputs.len() {
            return Err(BackendError::NoSuchEndpoint {
                direction: Direction::Input,
                index,
            });
        }
        if state.failing_inputs.contains(&index) {
            return Err(BackendError::OpenFailed {
                direction: Direction::Input,
                index,
                reason: "device busy".to_string(),
            });
        }
        state.callbacks.insert(index, callback);
        Ok(Box::new(MockInputHandle {
            index,
            state: Arc::clone(&self.state),
        }))
    }

    fn open_output(&self, index: usize) -> Result<Box<dyn OutputHandle>, BackendError> {
        let mut state = self.lock();
        if index >= state.outputs.len() {
            return Err(BackendError::NoSuchEndpoint {
                direction: Direction::Output,
                index,
            });
        }
        if state.failing_outputs.contains(&index) {
            return Err(BackendError::OpenFailed {
                direction: Direction::Output,
                index,
                reason: "device busy".to_string(),
            });
        }
        state.open_outputs.insert(index);
        Ok(Box::new(MockOutputHandle {
            index,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockInputHandle {
    index: usize,
    state: Arc<Mutex<MockState>>,
}

impl InputHandle for MockInputHandle {
    fn close(self: Box<Self>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.callbacks.remove(&self.index);
    }
}

struct MockOutputHandle {
    index: usize,
    state: Arc<Mutex<MockState>>,
}

impl OutputHandle for MockOutputHandle {
    fn send_raw(&mut self, word: u32) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.failing_sends.contains(&self.index) {
            return Err(BackendError::SendFailed {
                index: self.index,
                reason: "device unplugged".to_string(),
            });
        }
        state.sent.push((self.index, word));
        Ok(())
    }

    fn close(self: Box<Self>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.open_outputs.remove(&self.index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_callback() -> (SignalCallback, Arc<Mutex<Vec<DeviceSignal>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb: SignalCallback = Arc::new(move |s| sink.lock().unwrap().push(s));
        (cb, seen)
    }

    #[test]
    fn test_inject_reaches_open_input_only() {
        // Arrange
        let backend = MockBackend::new(&["Keys", "Pads"], &[]);
        let (cb, seen) = recording_callback();
        let _handle = backend.open_input(1, cb).unwrap();

        // Act
        let delivered_closed = backend.inject_input(0, 0x007F_3C90);
        let delivered_open = backend.inject_input(1, 0x007F_3C90);

        // Assert
        assert!(!delivered_closed);
        assert!(delivered_open);
        assert_eq!(*seen.lock().unwrap(), vec![DeviceSignal::Data(0x007F_3C90)]);
    }

    #[test]
    fn test_closed_input_stops_receiving() {
        let backend = MockBackend::new(&["Keys"], &[]);
        let (cb, seen) = recording_callback();
        let handle = backend.open_input(0, cb).unwrap();

        handle.close();

        assert!(!backend.inject_input(0, 0xF8));
        assert!(seen.lock().unwrap().is_empty());
        assert!(!backend.is_input_open(0));
    }

    #[test]
    fn test_output_records_sent_words() {
        let backend = MockBackend::new(&[], &["Synth"]);
        let mut out = backend.open_output(0).unwrap();

        out.send_raw(0x0000_05C3).unwrap();
        out.send_raw(0x0064_07B0).unwrap();

        assert_eq!(backend.sent_words(), vec![(0, 0x0000_05C3), (0, 0x0064_07B0)]);
    }

    #[test]
    fn test_configured_failures() {
        let backend = MockBackend::new(&["Keys"], &["Synth", "Drums"]);
        backend.fail_open_input(0);
        backend.fail_open_output(1);
        backend.fail_send(0);

        assert!(matches!(
            backend.open_input(0, recording_callback().0),
            Err(BackendError::OpenFailed { .. })
        ));
        assert!(backend.open_output(1).is_err());
        let mut out = backend.open_output(0).unwrap();
        assert!(matches!(out.send_raw(0x90), Err(BackendError::SendFailed { index: 0, .. })));
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let backend = MockBackend::new(&["Keys"], &[]);
        assert!(matches!(
            backend.open_output(0),
            Err(BackendError::NoSuchEndpoint { direction: Direction::Output, index: 0 })
        ));
    }
}
