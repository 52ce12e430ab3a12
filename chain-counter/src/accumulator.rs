//! Running pulse count.

use crate::direction::Direction;
use crate::node::Consumer;

/// Sums pulse directions and passes every new total downstream.
///
/// The addition is not clamped here; [`crate::direction::classify`] never
/// hands out a decrement at zero.
pub struct Accumulator<C> {
    count: i32,
    downstream: C,
}

impl<C: Consumer<i32>> Accumulator<C> {
    pub const fn new(downstream: C) -> Self {
        Self {
            count: 0,
            downstream,
        }
    }

    pub fn accumulate(&mut self, direction: Direction) {
        self.count += direction.unit();
        self.downstream.on_value(self.count);
    }

    pub fn get(&self) -> i32 {
        self.count
    }

    /// Zeroes the count and publishes the zero.
    pub fn reset(&mut self) {
        self.count = 0;
        self.downstream.on_value(self.count);
    }

    /// Passes the current total downstream again without changing it.
    pub fn publish(&mut self) {
        self.downstream.on_value(self.count);
    }

    pub fn downstream(&self) -> &C {
        &self.downstream
    }

    pub fn downstream_mut(&mut self) -> &mut C {
        &mut self.downstream
    }
}

impl<C: Consumer<i32>> Consumer<Direction> for Accumulator<C> {
    fn on_value(&mut self, value: Direction) {
        self.accumulate(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Discard;

    #[derive(Default)]
    struct Totals(Vec<i32>);

    impl Consumer<i32> for Totals {
        fn on_value(&mut self, value: i32) {
            self.0.push(value);
        }
    }

    #[test]
    fn sums_units_and_emits_each_total() {
        let mut acc = Accumulator::new(Totals::default());
        acc.accumulate(Direction::Out);
        acc.accumulate(Direction::Out);
        acc.accumulate(Direction::Hold);
        acc.accumulate(Direction::In);
        assert_eq!(acc.get(), 1);
        assert_eq!(acc.downstream().0, vec![1, 2, 2, 1]);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut acc = Accumulator::new(Discard);
        for _ in 0..4 {
            acc.accumulate(Direction::Out);
        }
        acc.reset();
        assert_eq!(acc.get(), 0);
        acc.reset();
        assert_eq!(acc.get(), 0);
    }

    #[test]
    fn publish_repeats_current_total() {
        let mut acc = Accumulator::new(Totals::default());
        acc.publish();
        acc.accumulate(Direction::Out);
        acc.publish();
        assert_eq!(acc.get(), 1);
        assert_eq!(acc.downstream().0, vec![0, 1, 1]);
    }

    #[test]
    fn reset_publishes_zero() {
        let mut acc = Accumulator::new(Totals::default());
        acc.accumulate(Direction::Out);
        acc.reset();
        assert_eq!(acc.downstream().0, vec![1, 0]);
    }
}
