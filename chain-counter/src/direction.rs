//! Direction of a gypsy pulse.

/// Raw state of the windlass remote buttons, sampled when a pulse is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Controls {
    pub up: bool,
    pub down: bool,
}

impl Controls {
    pub const fn new(up: bool, down: bool) -> Self {
        Self { up, down }
    }
}

/// Contribution of one pulse to the chain count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(i8)]
pub enum Direction {
    /// Chain retrieved under power.
    In = -1,
    /// Pulse not counted.
    Hold = 0,
    /// Chain paid out, powered or free-falling.
    Out = 1,
}

impl Direction {
    pub const fn unit(self) -> i32 {
        self as i8 as i32
    }
}

/// Classifies a debounced gypsy level.
///
/// Only the falling edge of a pulse counts. A pulse under UP alone retrieves
/// chain unless the count is already zero. DOWN alone and no button at all both
/// pay chain out. Both buttons at once is not a valid remote state and is
/// ignored.
pub fn classify(level: bool, controls: Controls, count: i32) -> Direction {
    if level {
        return Direction::Hold;
    }

    match (controls.up, controls.down) {
        (true, false) if count > 0 => Direction::In,
        (true, false) => {
            debug!("retrieving at zero count, pulse ignored");
            Direction::Hold
        }
        (false, true) => Direction::Out,
        (false, false) => Direction::Out,
        (true, true) => {
            warn!("UP and DOWN both asserted, pulse ignored");
            Direction::Hold
        }
    }
}
