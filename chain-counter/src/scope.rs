//! Anchoring scope: rode deployed over water depth.

use crate::node::Consumer;

/// Depths below this are treated as no usable reading.
pub const MIN_DEPTH_M: f32 = 0.001;

/// Computes the scope for each rode length it receives.
///
/// Depth arrives on its own schedule through [`ScopeCalculator::set_depth`]
/// and only the latest value is kept. A new depth does not produce a new
/// scope; the next rode length does.
pub struct ScopeCalculator<C> {
    depth: f32,
    downstream: C,
}

impl<C: Consumer<f32>> ScopeCalculator<C> {
    pub const fn new(downstream: C) -> Self {
        Self {
            depth: 0.0,
            downstream,
        }
    }

    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth;
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn downstream(&self) -> &C {
        &self.downstream
    }

    pub fn downstream_mut(&mut self) -> &mut C {
        &mut self.downstream
    }
}

/// Ratio of `length` to `depth`, or 0.0 without a usable depth.
pub fn scope(length: f32, depth: f32) -> f32 {
    if depth.is_nan() || depth < MIN_DEPTH_M {
        return 0.0;
    }
    length / depth
}

impl<C: Consumer<f32>> Consumer<f32> for ScopeCalculator<C> {
    fn on_value(&mut self, value: f32) {
        self.downstream.on_value(scope(value, self.depth));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[derive(Default)]
    struct Ratios(Vec<f32>);

    impl Consumer<f32> for Ratios {
        fn on_value(&mut self, value: f32) {
            self.0.push(value);
        }
    }

    #[test]
    fn ratio_of_length_to_depth() {
        assert_relative_eq!(scope(16.0, 8.0), 2.0);
        assert_relative_eq!(scope(35.0, 5.0), 7.0);
    }

    #[test]
    fn shallow_depth_gives_zero() {
        for length in [0.0, 1.0, 16.0, 1000.0] {
            assert_eq!(scope(length, 0.0005), 0.0);
            assert_eq!(scope(length, 0.0), 0.0);
            assert_eq!(scope(length, -3.0), 0.0);
            assert_eq!(scope(length, f32::NAN), 0.0);
        }
    }

    #[test]
    fn depth_change_does_not_emit() {
        let mut calc = ScopeCalculator::new(Ratios::default());
        calc.on_value(10.0);
        calc.set_depth(5.0);
        assert_eq!(calc.downstream().0, vec![0.0]);

        calc.on_value(10.0);
        assert_eq!(calc.downstream().0, vec![0.0, 2.0]);
    }
}
