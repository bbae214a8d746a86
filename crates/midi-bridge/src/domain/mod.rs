//! Domain layer for midi-bridge.
//!
//! Plain types with no I/O. The infrastructure layer fills them in from the
//! command line and the config file.

pub mod config;

pub use config::BridgeConfig;
