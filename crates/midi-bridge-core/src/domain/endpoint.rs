//! Endpoint identity: direction, per-direction index, and global ids.
//!
//! # Global ids
//!
//! Users address endpoints with a single 1-based number that runs through
//! every input first and then every output:
//!
//! ```text
//! inputs:  [0] [1] [2]      outputs: [0] [1]
//! global:   1   2   3                 4   5
//! ```

use std::fmt;

/// Whether an endpoint receives from or sends to the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Input => "Input",
            Self::Output => "Output",
        })
    }
}

/// Direction plus 0-based index within that direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointRef {
    pub direction: Direction,
    pub index: usize,
}

impl EndpointRef {
    pub fn input(index: usize) -> Self {
        Self {
            direction: Direction::Input,
            index,
        }
    }

    pub fn output(index: usize) -> Self {
        Self {
            direction: Direction::Output,
            index,
        }
    }

    /// Resolves a 1-based global id against the current endpoint counts.
    ///
    /// Returns `None` when `global_id` is `0` or past the last output.
    ///
    /// ```rust
    /// use midi_bridge_core::EndpointRef;
    ///
    /// assert_eq!(EndpointRef::from_global_id(1, 2, 3), Some(EndpointRef::input(0)));
    /// assert_eq!(EndpointRef::from_global_id(3, 2, 3), Some(EndpointRef::output(0)));
    /// assert_eq!(EndpointRef::from_global_id(6, 2, 3), None);
    /// ```
    pub fn from_global_id(
        global_id: usize,
        input_count: usize,
        output_count: usize,
    ) -> Option<Self> {
        if global_id == 0 || global_id > input_count + output_count {
            return None;
        }
        if global_id <= input_count {
            Some(Self::input(global_id - 1))
        } else {
            Some(Self::output(global_id - 1 - input_count))
        }
    }

    /// Inverse of [`from_global_id`](Self::from_global_id).
    pub fn global_id(&self, input_count: usize) -> usize {
        match self.direction {
            Direction::Input => self.index + 1,
            Direction::Output => input_count + self.index + 1,
        }
    }
}

/// A snapshot of one endpoint as reported by the device registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointInfo {
    pub global_id: usize,
    pub endpoint: EndpointRef,
    pub name: String,
    pub open: bool,
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_never_a_valid_global_id() {
        assert_eq!(EndpointRef::from_global_id(0, 4, 4), None);
    }

    #[test]
    fn test_one_past_last_output_is_rejected() {
        assert_eq!(EndpointRef::from_global_id(9, 4, 4), None);
        assert_eq!(EndpointRef::from_global_id(8, 4, 4), Some(EndpointRef::output(3)));
    }

    #[test]
    fn test_outputs_follow_inputs() {
        assert_eq!(EndpointRef::from_global_id(2, 2, 1), Some(EndpointRef::input(1)));
        assert_eq!(EndpointRef::from_global_id(3, 2, 1), Some(EndpointRef::output(0)));
    }

    #[test]
    fn test_no_inputs_means_outputs_start_at_one() {
        assert_eq!(EndpointRef::from_global_id(1, 0, 2), Some(EndpointRef::output(0)));
    }

    #[test]
    fn test_global_id_round_trip() {
        let (inputs, outputs) = (3, 2);
        for id in 1..=inputs + outputs {
            let ep = EndpointRef::from_global_id(id, inputs, outputs).unwrap();
            assert_eq!(ep.global_id(inputs), id);
        }
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Input.to_string(), "Input");
        assert_eq!(Direction::Output.to_string(), "Output");
        assert_eq!(format!("[{:<6}]", Direction::Input), "[Input ]");
    }
}
