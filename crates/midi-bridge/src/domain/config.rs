//! Bridge runtime configuration.
//!
//! [`BridgeConfig`] is what the bridge actually runs with, after the config
//! file and command-line overrides have been merged in `main.rs`.

use std::net::{Ipv4Addr, SocketAddr};

use midi_bridge_core::DEFAULT_PORT;

/// Default capacity of the per-connection hardware → client queue.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 256;

/// All runtime settings for one bridge process.
///
/// ```rust
/// use midi_bridge::domain::BridgeConfig;
///
/// let cfg = BridgeConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 52364);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Address the listening socket binds to.
    pub bind_addr: SocketAddr,
    /// Bounded queue size between the hardware callback and the sender task.
    /// Events arriving while the queue is full are dropped.
    pub event_queue_capacity: usize,
    /// Open every input and output at startup.
    pub open_all_on_start: bool,
    /// Start with the MIDI trace table enabled.
    pub trace_midi: bool,
}

impl Default for BridgeConfig {
    /// | Field                | Default         |
    /// |----------------------|-----------------|
    /// | bind_addr            | `0.0.0.0:52364` |
    /// | event_queue_capacity | 256             |
    /// | open_all_on_start    | true            |
    /// | trace_midi           | false           |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            open_all_on_start: true,
            trace_midi: false,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
