//! Latest-value mailbox for outbound telemetry.

/// One slot per published path. A new value overwrites the unsent one in its
/// slot, so a backlog never holds stale readings and the newest is never
/// dropped.
///
/// Sent values are remembered and can be queued again with
/// [`Outbox::resend_all`] when a fresh connection starts.
#[derive(Debug)]
pub struct Outbox<T, const N: usize> {
    latest: [Option<T>; N],
    pending: [bool; N],
}

impl<T: Copy, const N: usize> Default for Outbox<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy, const N: usize> Outbox<T, N> {
    pub const fn new() -> Self {
        Self {
            latest: [None; N],
            pending: [false; N],
        }
    }

    /// Stores `value` as the latest for `slot`. Returns `false` if the slot
    /// does not exist.
    pub fn put(&mut self, slot: usize, value: T) -> bool {
        match self.latest.get_mut(slot) {
            Some(latest) => {
                *latest = Some(value);
                self.pending[slot] = true;
                true
            }
            None => {
                warn!("outbox slot {} out of range", slot);
                false
            }
        }
    }

    /// Takes the next unsent value, lowest slot first.
    pub fn take(&mut self) -> Option<T> {
        let slot = self.pending.iter().position(|&p| p)?;
        self.pending[slot] = false;
        self.latest[slot]
    }

    /// Queues every value seen so far for sending again.
    pub fn resend_all(&mut self) {
        for (pending, latest) in self.pending.iter_mut().zip(&self.latest) {
            *pending = latest.is_some();
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.pending.contains(&true)
    }
}
