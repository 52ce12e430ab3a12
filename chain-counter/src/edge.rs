//! Polled edge detection on a digital line.

/// A digital input that can be sampled synchronously.
pub trait Line {
    fn is_high(&mut self) -> bool;
}

/// Reports the level of a line each time it differs from the previous read.
///
/// The line is read at most once per `read_delay_ms`. The first read only
/// establishes the baseline. A pulse that starts and ends between two reads
/// is not seen.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeDetector {
    read_delay_ms: u64,
    next_read_ms: u64,
    last: Option<bool>,
}

impl EdgeDetector {
    pub const fn new(read_delay_ms: u64) -> Self {
        Self {
            read_delay_ms,
            next_read_ms: 0,
            last: None,
        }
    }

    pub fn read_delay_ms(&self) -> u64 {
        self.read_delay_ms
    }

    /// Changes the poll interval. Takes effect after the read already scheduled.
    pub fn set_read_delay_ms(&mut self, read_delay_ms: u64) {
        self.read_delay_ms = read_delay_ms;
    }

    /// Reads `line` if its poll interval has elapsed at `now_ms` and returns
    /// the new level on a transition.
    pub fn poll<L: Line + ?Sized>(&mut self, line: &mut L, now_ms: u64) -> Option<bool> {
        if now_ms < self.next_read_ms {
            return None;
        }
        self.next_read_ms = now_ms.saturating_add(self.read_delay_ms);
        self.observe(line.is_high())
    }

    /// Reads `line` now and takes the level as the baseline, returning it.
    /// The next poll is scheduled one interval later.
    pub fn baseline<L: Line + ?Sized>(&mut self, line: &mut L, now_ms: u64) -> bool {
        let level = line.is_high();
        self.last = Some(level);
        self.next_read_ms = now_ms.saturating_add(self.read_delay_ms);
        level
    }

    /// Compares a freshly sampled level against the last one seen.
    pub fn observe(&mut self, level: bool) -> Option<bool> {
        match self.last.replace(level) {
            Some(previous) if previous != level => Some(level),
            _ => None,
        }
    }
}
