//! Typed dataflow nodes.
//!
//! Every stage that receives values implements [`Consumer`]. A stage that
//! produces values owns its downstream consumer, so a pipeline is a tree of
//! owned nodes built once at start-up. A pair `(A, B)` is itself a consumer and
//! forwards each value to both halves, which is how one producer feeds several
//! sinks.

/// Receives the values emitted by an upstream node.
pub trait Consumer<T> {
    fn on_value(&mut self, value: T);
}

impl<T, C: Consumer<T> + ?Sized> Consumer<T> for &mut C {
    fn on_value(&mut self, value: T) {
        (**self).on_value(value)
    }
}

impl<T: Copy, A: Consumer<T>, B: Consumer<T>> Consumer<T> for (A, B) {
    fn on_value(&mut self, value: T) {
        self.0.on_value(value);
        self.1.on_value(value);
    }
}

/// Drops every value. Terminates a branch nobody listens to.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl<T> Consumer<T> for Discard {
    fn on_value(&mut self, _value: T) {}
}

pub const TRUE_TEXT: &str = "ON";
pub const FALSE_TEXT: &str = "OFF";

/// Maps a boolean onto the text reported for a button state.
pub struct TruthText<C> {
    downstream: C,
}

impl<C: Consumer<&'static str>> TruthText<C> {
    pub const fn new(downstream: C) -> Self {
        Self { downstream }
    }

    pub fn text(value: bool) -> &'static str {
        if value {
            TRUE_TEXT
        } else {
            FALSE_TEXT
        }
    }
}

impl<C: Consumer<&'static str>> Consumer<bool> for TruthText<C> {
    fn on_value(&mut self, value: bool) {
        self.downstream.on_value(Self::text(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Record<T>(Vec<T>);

    impl<T> Consumer<T> for Record<T> {
        fn on_value(&mut self, value: T) {
            self.0.push(value);
        }
    }

    #[test]
    fn pair_forwards_to_both() {
        let mut fanout = (Record::default(), Record::default());
        fanout.on_value(3);
        fanout.on_value(7);
        assert_eq!(fanout.0 .0, vec![3, 7]);
        assert_eq!(fanout.1 .0, vec![3, 7]);
    }

    #[test]
    fn truth_text_maps_levels() {
        let mut text = TruthText::new(Record::default());
        text.on_value(true);
        text.on_value(false);
        assert_eq!(text.downstream.0, vec!["ON", "OFF"]);
    }

    #[test]
    fn borrowed_consumer_forwards() {
        fn feed<C: Consumer<f32>>(mut consumer: C) {
            consumer.on_value(1.5);
        }

        let mut record = Record::default();
        feed(&mut record);
        assert_eq!(record.0, vec![1.5]);
    }
}
