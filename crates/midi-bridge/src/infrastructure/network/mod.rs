//! TCP side of the bridge.
//!
//! - `connection_manager`: listener, accept loop, connection teardown.
//! - `receiver`: client bytes → frames → hardware outputs.
//! - `sender`: hardware inputs → bounded queue → client socket.
//!
//! Wire format: a plain stream of 4-byte frames (`status, data1, data2,
//! data3`) in both directions, with no handshake, length prefix or ack.

pub mod connection_manager;
pub mod receiver;
pub mod sender;

pub use connection_manager::{ActiveConnection, ConnectionManager, ConnectionState, NetworkError};
pub use sender::ClientLink;
