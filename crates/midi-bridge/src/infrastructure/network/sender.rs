//! Hardware → client path.
//!
//! The backend's callback thread cannot await, so it hands events to the
//! connection through [`ClientLink`]: a slot holding the sending side of a
//! bounded channel that belongs to the live connection. The connection's
//! sender task owns the socket's write half and is the only writer.
//!
//! ```text
//! MIDI thread ──deliver()──► ClientLink ──try_send──► [queue] ──► run_sender ──► socket
//! ```
//!
//! With no connection attached, or with the queue full, events are dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use midi_bridge_core::{encode_frame, MidiEvent};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, trace};

use crate::application::EventSink;

/// Slot connecting the hardware callback to the current connection.
#[derive(Debug, Default)]
pub struct ClientLink {
    slot: Mutex<Option<mpsc::Sender<MidiEvent>>>,
    dropped: AtomicU64,
}

impl ClientLink {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<mpsc::Sender<MidiEvent>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Installs a fresh queue of `capacity` events and returns its receiving
    /// end. Any previously attached queue is closed.
    pub fn attach(&self, capacity: usize) -> mpsc::Receiver<MidiEvent> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        *self.slot() = Some(tx);
        rx
    }

    /// Removes the queue. Once this returns, no later [`deliver`] call can
    /// reach the old connection. Returns `false` if nothing was attached.
    ///
    /// [`deliver`]: EventSink::deliver
    pub fn detach(&self) -> bool {
        self.slot().take().is_some()
    }

    pub fn is_attached(&self) -> bool {
        self.slot().is_some()
    }

    /// Events dropped because the queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl EventSink for ClientLink {
    fn deliver(&self, event: MidiEvent) {
        let slot = self.slot();
        let Some(tx) = slot.as_ref() else {
            trace!("no client connected; dropping {event}");
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(ev)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("client queue full; dropping {ev}");
            }
            Err(TrySendError::Closed(ev)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                trace!("client queue closed; dropping {ev}");
            }
        }
    }
}

/// Writes every queued event to `writer` as a 4-byte frame.
///
/// Returns `Ok` once the queue is closed (the link was detached) and the
/// first write error otherwise. A peer that stops accepting bytes shows up
/// as `WriteZero`.
pub async fn run_sender<W>(mut writer: W, mut rx: mpsc::Receiver<MidiEvent>) -> std::io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut frames = 0u64;
    while let Some(event) = rx.recv().await {
        writer.write_all(&encode_frame(event)).await?;
        frames += 1;
    }
    Ok(frames)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use midi_bridge_core::SENTINEL;

    fn note_on(key: u8) -> MidiEvent {
        MidiEvent::new(0x90, key, 0x7F, SENTINEL)
    }

    #[test]
    fn test_deliver_without_connection_is_dropped_silently() {
        let link = ClientLink::new();
        link.deliver(note_on(60));
        assert!(!link.is_attached());
        assert_eq!(link.dropped(), 0);
    }

    #[test]
    fn test_deliver_reaches_attached_queue() {
        // Arrange
        let link = ClientLink::new();
        let mut rx = link.attach(4);

        // Act
        link.deliver(note_on(60));

        // Assert
        assert_eq!(rx.try_recv().unwrap(), note_on(60));
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let link = ClientLink::new();
        let mut rx = link.attach(2);

        for key in 0..5 {
            link.deliver(note_on(key));
        }

        assert_eq!(link.dropped(), 3);
        assert_eq!(rx.try_recv().unwrap(), note_on(0));
        assert_eq!(rx.try_recv().unwrap(), note_on(1));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_detach_stops_delivery_and_closes_queue() {
        let link = ClientLink::new();
        let mut rx = link.attach(4);

        assert!(link.detach());
        assert!(!link.detach());
        link.deliver(note_on(60));

        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_reattach_replaces_previous_queue() {
        let link = ClientLink::new();
        let mut old = link.attach(4);
        let mut new = link.attach(4);

        link.deliver(note_on(61));

        assert!(old.try_recv().is_err());
        assert_eq!(new.try_recv().unwrap(), note_on(61));
    }

    #[tokio::test]
    async fn test_sender_writes_frames_in_order() {
        // Arrange
        let writer = tokio_test::io::Builder::new()
            .write(&[0x90, 0x3C, 0x7F, 0xFF])
            .write(&[0xC3, 0x05, 0xFF, 0xFF])
            .build();
        let (tx, rx) = mpsc::channel(4);
        tx.send(MidiEvent::new(0x90, 0x3C, 0x7F, SENTINEL)).await.unwrap();
        tx.send(MidiEvent::new(0xC3, 0x05, SENTINEL, SENTINEL)).await.unwrap();
        drop(tx);

        // Act
        let frames = run_sender(writer, rx).await.unwrap();

        // Assert
        assert_eq!(frames, 2);
    }

    #[tokio::test]
    async fn test_sender_stops_on_write_error() {
        let writer = tokio_test::io::Builder::new()
            .write_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))
            .build();
        let (tx, rx) = mpsc::channel(4);
        tx.send(MidiEvent::new(0xF8, SENTINEL, SENTINEL, SENTINEL)).await.unwrap();

        let err = run_sender(writer, rx).await.unwrap_err();

        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }
}
