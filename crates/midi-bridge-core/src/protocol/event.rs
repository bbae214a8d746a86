//! The MIDI event value type and the status byte classification table.
//!
//! # Hardware word packing
//!
//! MIDI drivers hand short messages to the application as a packed 32-bit
//! word:
//!
//! ```text
//! bits  0..8   status
//! bits  8..16  data1
//! bits 16..24  data2
//! ```
//!
//! How many of those data bytes are meaningful depends on the status byte.
//! [`StatusClass::of`] is the single place that knowledge lives; everything
//! else in the bridge works on the fixed 4-byte [`MidiEvent`] where unused
//! positions hold [`SENTINEL`].

use std::fmt;

use crate::protocol::SENTINEL;

/// How many data bytes follow a given status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    /// System real-time and other data-less system messages (clock, start, stop…).
    NoData,
    /// Program change, channel pressure, MTC quarter frame, song select.
    OneData,
    /// Note on/off, poly aftertouch, control change, pitch wheel, song position.
    TwoData,
}

impl StatusClass {
    /// Classifies a status byte.
    ///
    /// Every value is classified. Bytes below `0x80` are not status bytes at
    /// all; they fall into [`StatusClass::TwoData`] so that a stray byte is
    /// still passed through rather than rejected.
    ///
    /// ```rust
    /// use midi_bridge_core::StatusClass;
    ///
    /// assert_eq!(StatusClass::of(0x90), StatusClass::TwoData);
    /// assert_eq!(StatusClass::of(0xC3), StatusClass::OneData);
    /// assert_eq!(StatusClass::of(0xF8), StatusClass::NoData);
    /// ```
    pub fn of(status: u8) -> Self {
        match status {
            0xC0..=0xDF | 0xF1 | 0xF3 => Self::OneData,
            0xF2 => Self::TwoData,
            0xF0..=0xFF => Self::NoData,
            _ => Self::TwoData,
        }
    }

    /// Number of meaningful data bytes for this class.
    pub fn data_len(self) -> usize {
        match self {
            Self::NoData => 0,
            Self::OneData => 1,
            Self::TwoData => 2,
        }
    }
}

/// Coarse message category derived from the status byte's high nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    NoteOff,
    NoteOn,
    PolyAftertouch,
    ControlChange,
    ProgramChange,
    ChannelPressure,
    PitchWheel,
    System,
    /// Not a status byte (high bit clear).
    Unknown,
}

impl MessageKind {
    /// Returns the category of `status`.
    pub fn of(status: u8) -> Self {
        match status >> 4 {
            0x8 => Self::NoteOff,
            0x9 => Self::NoteOn,
            0xA => Self::PolyAftertouch,
            0xB => Self::ControlChange,
            0xC => Self::ProgramChange,
            0xD => Self::ChannelPressure,
            0xE => Self::PitchWheel,
            0xF => Self::System,
            _ => Self::Unknown,
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::NoteOff => "Note Off",
            Self::NoteOn => "Note On",
            Self::PolyAftertouch => "Aftertouch",
            Self::ControlChange => "Control Change",
            Self::ProgramChange => "Program Change",
            Self::ChannelPressure => "Pressure",
            Self::PitchWheel => "Pitch Wheel",
            Self::System => "System",
            Self::Unknown => "Unknown",
        }
    }

    /// Fixed-width label used by the trace table.
    pub fn short_label(self) -> &'static str {
        match self {
            Self::NoteOff => "Note Off",
            Self::NoteOn => "Note On ",
            Self::PolyAftertouch => "A.Touch ",
            Self::ControlChange => "CC      ",
            Self::ProgramChange => "Program ",
            Self::ChannelPressure => "Pressure",
            Self::PitchWheel => "P.Wheel ",
            Self::System => "System  ",
            Self::Unknown => "Unknown ",
        }
    }
}

/// One MIDI short message in its canonical 4-byte form.
///
/// Unused positions hold [`SENTINEL`] (`0xFF`), which can never be a MIDI
/// data byte. The value is immutable and cheap to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MidiEvent {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
    pub data3: u8,
}

impl MidiEvent {
    /// Builds an event from its four raw bytes without any validation.
    pub const fn new(status: u8, data1: u8, data2: u8, data3: u8) -> Self {
        Self {
            status,
            data1,
            data2,
            data3,
        }
    }

    /// Unpacks a hardware word (`status | data1 << 8 | data2 << 16`).
    ///
    /// Only the data bytes implied by the status byte are extracted; the rest
    /// of the event is filled with [`SENTINEL`], so any garbage the driver
    /// leaves in the upper bits is ignored.
    ///
    /// ```rust
    /// use midi_bridge_core::MidiEvent;
    ///
    /// let ev = MidiEvent::from_hardware_word(0x007F_3C90);
    /// assert_eq!(ev, MidiEvent::new(0x90, 0x3C, 0x7F, 0xFF));
    ///
    /// // Program change carries a single data byte.
    /// let ev = MidiEvent::from_hardware_word(0x0012_05C3);
    /// assert_eq!(ev, MidiEvent::new(0xC3, 0x05, 0xFF, 0xFF));
    /// ```
    pub fn from_hardware_word(raw: u32) -> Self {
        let status = (raw & 0xFF) as u8;
        let byte1 = ((raw >> 8) & 0xFF) as u8;
        let byte2 = ((raw >> 16) & 0xFF) as u8;

        match StatusClass::of(status) {
            StatusClass::NoData => Self::new(status, SENTINEL, SENTINEL, SENTINEL),
            StatusClass::OneData => Self::new(status, byte1, SENTINEL, SENTINEL),
            StatusClass::TwoData => Self::new(status, byte1, byte2, SENTINEL),
        }
    }

    /// Packs the event into a hardware word for output.
    ///
    /// A data byte is packed only when it is below `0x80`; sentinels (and any
    /// other non-data value) are left out so they never reach the driver.
    pub fn to_hardware_word(&self) -> u32 {
        let mut word = u32::from(self.status);
        if self.data1 < 0x80 {
            word |= u32::from(self.data1) << 8;
        }
        if self.data2 < 0x80 {
            word |= u32::from(self.data2) << 16;
        }
        word
    }

    /// Classification of this event's status byte.
    pub fn class(&self) -> StatusClass {
        StatusClass::of(self.status)
    }

    /// Category of this event's status byte.
    pub fn kind(&self) -> MessageKind {
        MessageKind::of(self.status)
    }

    /// 1-based MIDI channel for channel voice messages, `None` for system
    /// messages and non-status bytes.
    pub fn channel(&self) -> Option<u8> {
        match self.kind() {
            MessageKind::System | MessageKind::Unknown => None,
            _ => Some((self.status & 0x0F) + 1),
        }
    }

    /// The meaningful bytes of the event (status plus real data bytes), in
    /// the order a MIDI driver expects them on the cable.
    pub fn short_message(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(3);
        bytes.push(self.status);
        bytes.extend(
            [self.data1, self.data2]
                .into_iter()
                .take(self.class().data_len())
                .filter(|b| *b < 0x80),
        );
        bytes
    }
}

impl fmt::Display for MidiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.channel() {
            None => write!(f, "{} ({:x})", self.kind().label(), self.status),
            Some(channel) if self.data2 > 0x7F => write!(
                f,
                "{} (ch.{}, {})",
                self.kind().label(),
                channel,
                self.data1
            ),
            Some(channel) => write!(
                f,
                "{} (ch.{}, {}, {})",
                self.kind().label(),
                channel,
                self.data1,
                self.data2
            ),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
