//! MIDI trace table.
//!
//! When enabled, every event that crosses the bridge is logged as one table
//! row on the `midi_bridge::trace` target:
//!
//! ```text
//! -----+----------+----+-----------
//!  I/O | Event    | Ch | Data
//! -----+----------+----+-----------
//!   IN | Note On  | 01 | 60, 127
//!  OUT | Program  | 04 | 5
//!   IN | System   | -- | 0xf8
//! ```
//!
//! The header is repeated every 20 rows. Miscellaneous records (a device
//! went away, trace toggled) close the table with a separator and force a
//! fresh header on the next row.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use midi_bridge_core::MidiEvent;
use tracing::info;

const RULE: &str = "-----+----------+----+-----------";
const HEADER: &str = " I/O | Event    | Ch | Data";
const HEADER_INTERVAL: usize = 20;

/// Which way an event crossed the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceDirection {
    /// Hardware → client.
    In,
    /// Client → hardware.
    Out,
}

impl TraceDirection {
    fn label(self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
        }
    }
}

/// Trace observer shared by the registry and the console.
#[derive(Debug, Default)]
pub struct TraceLog {
    enabled: AtomicBool,
    /// Rows since the last header; `None` means a header is due.
    rows: Mutex<Option<usize>>,
}

impl TraceLog {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            rows: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Flips the enable flag and returns the new state.
    ///
    /// The switch itself is recorded: "off" while still enabled, "on" once
    /// enabled.
    pub fn toggle(&self) -> bool {
        self.record_misc("MIDI trace off.");
        let enabled = !self.enabled.fetch_xor(true, Ordering::Relaxed);
        self.record_misc("MIDI trace on.");
        enabled
    }

    pub fn record_input(&self, event: &MidiEvent) {
        self.emit(self.event_lines(event, TraceDirection::In));
    }

    pub fn record_output(&self, event: &MidiEvent) {
        self.emit(self.event_lines(event, TraceDirection::Out));
    }

    pub fn record_misc(&self, message: &str) {
        self.emit(self.misc_lines(message));
    }

    fn emit(&self, lines: Vec<String>) {
        for line in lines {
            info!(target: "midi_bridge::trace", "{line}");
        }
    }

    fn event_lines(&self, event: &MidiEvent, direction: TraceDirection) -> Vec<String> {
        if !self.is_enabled() {
            return Vec::new();
        }
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        let mut lines = Vec::with_capacity(4);
        match *rows {
            Some(n) if n < HEADER_INTERVAL => *rows = Some(n + 1),
            _ => {
                lines.extend([RULE.to_string(), HEADER.to_string(), RULE.to_string()]);
                *rows = Some(0);
            }
        }
        lines.push(format_row(event, direction));
        lines
    }

    fn misc_lines(&self, message: &str) -> Vec<String> {
        if !self.is_enabled() {
            return Vec::new();
        }
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        let mut lines = Vec::with_capacity(2);
        if rows.is_some() {
            lines.push(RULE.to_string());
        }
        lines.push(message.to_string());
        *rows = None;
        lines
    }
}

/// Formats one table row.
fn format_row(event: &MidiEvent, direction: TraceDirection) -> String {
    let io = direction.label();
    let label = event.kind().short_label();
    match event.channel() {
        None => format!(" {io:>3} | {label} | -- | 0x{:x}", event.status),
        Some(ch) => {
            if event.data2 > 0x7F {
                format!(" {io:>3} | {label} | {ch:02} | {}", event.data1)
            } else {
                format!(" {io:>3} | {label} | {ch:02} | {}, {}", event.data1, event.data2)
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use midi_bridge_core::SENTINEL;

    fn note_on() -> MidiEvent {
        MidiEvent::new(0x90, 60, 127, SENTINEL)
    }

    #[test]
    fn test_disabled_trace_produces_nothing() {
        let trace = TraceLog::new(false);
        assert!(trace.event_lines(&note_on(), TraceDirection::In).is_empty());
        assert!(trace.misc_lines("gone").is_empty());
    }

    #[test]
    fn test_first_row_is_preceded_by_header() {
        // Arrange
        let trace = TraceLog::new(true);

        // Act
        let lines = trace.event_lines(&note_on(), TraceDirection::In);

        // Assert
        assert_eq!(
            lines,
            vec![
                RULE.to_string(),
                HEADER.to_string(),
                RULE.to_string(),
                "  IN | Note On  | 01 | 60, 127".to_string(),
            ]
        );
    }

    #[test]
    fn test_header_repeats_after_interval() {
        let trace = TraceLog::new(true);
        // Header + row 0, then 20 plain rows
        assert_eq!(trace.event_lines(&note_on(), TraceDirection::In).len(), 4);
        for _ in 0..HEADER_INTERVAL {
            assert_eq!(trace.event_lines(&note_on(), TraceDirection::In).len(), 1);
        }
        assert_eq!(trace.event_lines(&note_on(), TraceDirection::In).len(), 4);
    }

    #[test]
    fn test_misc_record_closes_table_and_forces_header() {
        let trace = TraceLog::new(true);
        trace.event_lines(&note_on(), TraceDirection::In);

        let misc = trace.misc_lines("Device (0) was disconnected.");
        assert_eq!(misc, vec![RULE.to_string(), "Device (0) was disconnected.".to_string()]);

        // No separator when the table is already closed
        assert_eq!(trace.misc_lines("again"), vec!["again".to_string()]);
        assert_eq!(trace.event_lines(&note_on(), TraceDirection::Out).len(), 4);
    }

    #[test]
    fn test_row_formats() {
        assert_eq!(
            format_row(&MidiEvent::new(0xC3, 5, SENTINEL, SENTINEL), TraceDirection::Out),
            " OUT | Program  | 04 | 5"
        );
        assert_eq!(
            format_row(&MidiEvent::new(0xF8, SENTINEL, SENTINEL, SENTINEL), TraceDirection::In),
            "  IN | System   | -- | 0xf8"
        );
        assert_eq!(
            format_row(&MidiEvent::new(0xB1, 7, 100, SENTINEL), TraceDirection::In),
            "  IN | CC       | 02 | 7, 100"
        );
    }

    #[test]
    fn test_toggle_returns_new_state() {
        let trace = TraceLog::new(false);
        assert!(trace.toggle());
        assert!(trace.is_enabled());
        assert!(!trace.toggle());
    }

    #[test]
    fn test_toggle_closes_open_table() {
        // Arrange: a table with one row is open
        let trace = TraceLog::new(true);
        trace.event_lines(&note_on(), TraceDirection::In);

        // Act
        trace.toggle();
        trace.toggle();

        // Assert: the switch was recorded, so the next row starts a new table
        assert!(trace.rows.lock().unwrap().is_none());
        assert_eq!(trace.event_lines(&note_on(), TraceDirection::In).len(), 4);
    }
}
