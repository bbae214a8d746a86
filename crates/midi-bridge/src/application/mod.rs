//! Application layer: device registry and MIDI trace observer.

pub mod device_registry;
pub mod trace;

pub use device_registry::{DeviceRegistry, EventSink};
pub use trace::TraceLog;
