//! midi-bridge library crate.
//!
//! Bridges a local multi-device MIDI interface to one remote TCP client.
//! Hardware input events are encoded as 4-byte frames and streamed to the
//! client; frames the client sends are decoded and played on every open
//! hardware output.
//!
//! # Architecture
//!
//! ```text
//! MIDI hardware ⇄ [midi_backend] ⇄ DeviceRegistry ⇄ ClientLink / receiver ⇄ TCP client
//!
//!   ├── domain/           BridgeConfig (plain runtime settings)
//!   ├── application/      DeviceRegistry, TraceLog, EventSink seam
//!   └── infrastructure/
//!         ├── midi_backend/  MidiBackend trait, mock and midir backends
//!         ├── network/       accept loop, receiver loop, sender path
//!         ├── storage/       TOML config file
//!         └── console        interactive command console
//! ```

/// Domain layer: runtime configuration.
pub mod domain;

/// Application layer: device registry and MIDI trace.
pub mod application;

/// Infrastructure layer: hardware backends, TCP, config file, console.
pub mod infrastructure;
