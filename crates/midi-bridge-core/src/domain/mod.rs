//! Domain types shared by the bridge and its console.

pub mod endpoint;

pub use endpoint::{Direction, EndpointInfo, EndpointRef};
