//! Client → hardware path.
//!
//! Reads the client's byte stream, reassembles 4-byte frames regardless of
//! how TCP chunked them, and plays each one on the open outputs.

use midi_bridge_core::FrameAssembler;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;
use uuid::Uuid;

use crate::application::DeviceRegistry;

/// Size of a single read from the socket.
pub const READ_BUFFER_SIZE: usize = 2048;

/// Runs until the client closes the stream or a read fails.
///
/// Returns the number of frames dispatched on end-of-stream. A trailing
/// partial frame is discarded with the connection.
pub async fn run_receiver<R>(
    mut reader: R,
    registry: &DeviceRegistry,
    conn_id: Uuid,
) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut assembler = FrameAssembler::new();
    let mut read_buf = vec![0u8; READ_BUFFER_SIZE];
    let mut frames = 0u64;

    loop {
        let n = reader.read(&mut read_buf).await?;
        if n == 0 {
            if assembler.pending() > 0 {
                trace!(
                    "connection {conn_id}: discarding {} byte(s) of partial frame",
                    assembler.pending()
                );
            }
            return Ok(frames);
        }

        assembler.extend(&read_buf[..n]);
        for event in assembler.drain_events() {
            registry.emit(event);
            frames += 1;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
