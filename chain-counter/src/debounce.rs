//! Trailing-edge debounce filter.
//!
//! An edge arms the filter. Every further edge before the window has passed
//! re-arms it with the newer level. Once a full window goes by without input,
//! [`Debounce::poll`] hands out the last level seen and the filter goes idle.
//! Two emitted levels are therefore always at least one window apart.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebounceState {
    Idle,
    Pending { level: bool, since_ms: u64 },
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Debounce {
    window_ms: u64,
    state: DebounceState,
}

impl Debounce {
    pub const fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            state: DebounceState::Idle,
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Changes the window. A pending level is judged against the new window.
    pub fn set_window_ms(&mut self, window_ms: u64) {
        self.window_ms = window_ms;
    }

    pub fn state(&self) -> DebounceState {
        self.state
    }

    /// Feeds an edge observed at `now_ms`.
    pub fn push(&mut self, level: bool, now_ms: u64) {
        if let DebounceState::Pending { .. } = self.state {
            trace!("bounce at {} ms", now_ms);
        }
        self.state = DebounceState::Pending {
            level,
            since_ms: now_ms,
        };
    }

    /// Emits the pending level once it has been stable for the whole window.
    pub fn poll(&mut self, now_ms: u64) -> Option<bool> {
        match self.state {
            DebounceState::Pending { level, since_ms }
                if now_ms.saturating_sub(since_ms) >= self.window_ms =>
            {
                self.state = DebounceState::Idle;
                Some(level)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_until_window_elapses() {
        let mut debounce = Debounce::new(15);
        debounce.push(false, 100);
        assert_eq!(debounce.poll(100), None);
        assert_eq!(debounce.poll(114), None);
        assert_eq!(debounce.poll(115), Some(false));
        assert_eq!(debounce.state(), DebounceState::Idle);
        assert_eq!(debounce.poll(200), None);
    }

    #[test]
    fn edges_inside_window_collapse() {
        let mut debounce = Debounce::new(15);
        debounce.push(false, 0);
        debounce.push(true, 5);
        debounce.push(false, 10);
        assert_eq!(debounce.poll(20), None);

        let emitted: Vec<bool> = (20..=40).filter_map(|t| debounce.poll(t)).collect();
        assert_eq!(emitted, vec![false]);
    }

    #[test]
    fn edges_outside_window_both_pass() {
        let mut debounce = Debounce::new(15);
        let mut emitted = Vec::new();

        debounce.push(true, 0);
        emitted.extend((0..30).filter_map(|t| debounce.poll(t)));
        debounce.push(false, 30);
        emitted.extend((30..60).filter_map(|t| debounce.poll(t)));

        assert_eq!(emitted, vec![true, false]);
    }

    #[test]
    fn zero_window_passes_immediately() {
        let mut debounce = Debounce::new(0);
        debounce.push(true, 7);
        assert_eq!(debounce.poll(7), Some(true));
    }

    #[test]
    fn retuned_window_applies_to_pending() {
        let mut debounce = Debounce::new(15);
        debounce.push(true, 0);
        debounce.set_window_ms(50);
        assert_eq!(debounce.poll(20), None);
        assert_eq!(debounce.poll(50), Some(true));
    }
}
