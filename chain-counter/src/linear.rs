//! Pulse count to meters.

use crate::node::Consumer;

/// `length = count * scale + offset`, recomputed for every count received.
pub struct Linear<C> {
    scale: f32,
    offset: f32,
    downstream: C,
}

impl<C: Consumer<f32>> Linear<C> {
    pub const fn new(scale: f32, offset: f32, downstream: C) -> Self {
        Self {
            scale,
            offset,
            downstream,
        }
    }

    pub fn apply(&self, count: i32) -> f32 {
        count as f32 * self.scale + self.offset
    }

    pub fn set_calibration(&mut self, scale: f32, offset: f32) {
        self.scale = scale;
        self.offset = offset;
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn downstream(&self) -> &C {
        &self.downstream
    }

    pub fn downstream_mut(&mut self) -> &mut C {
        &mut self.downstream
    }
}

impl<C: Consumer<f32>> Consumer<i32> for Linear<C> {
    fn on_value(&mut self, value: i32) {
        let length = self.apply(value);
        self.downstream.on_value(length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Discard;
    use approx::assert_relative_eq;

    #[test]
    fn scales_and_offsets() {
        let linear = Linear::new(0.32, 0.0, Discard);
        assert_relative_eq!(linear.apply(0), 0.0);
        assert_relative_eq!(linear.apply(1), 0.32);
        assert_relative_eq!(linear.apply(50), 16.0, max_relative = 1e-6);

        let linear = Linear::new(0.5, 1.5, Discard);
        assert_relative_eq!(linear.apply(4), 3.5);
    }

    #[test]
    fn forwards_length() {
        struct Last(f32);
        impl Consumer<f32> for Last {
            fn on_value(&mut self, value: f32) {
                self.0 = value;
            }
        }

        let mut linear = Linear::new(0.32, 0.0, Last(f32::NAN));
        linear.on_value(3);
        assert_relative_eq!(linear.downstream().0, 0.96, max_relative = 1e-6);

        linear.set_calibration(1.0, -0.5);
        linear.on_value(3);
        assert_relative_eq!(linear.downstream().0, 2.5);
    }
}
