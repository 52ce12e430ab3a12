//! The assembled chain counter.

use crate::accumulator::Accumulator;
use crate::config::{LineTiming, Tunables};
use crate::debounce::Debounce;
use crate::direction::{classify, Controls, Direction};
use crate::edge::{EdgeDetector, Line};
use crate::linear::Linear;
use crate::node::Consumer;
use crate::scope::ScopeCalculator;

/// Edge detector and debounce filter for one digital line.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineWatcher {
    edge: EdgeDetector,
    debounce: Debounce,
}

impl LineWatcher {
    pub const fn new(timing: LineTiming) -> Self {
        Self {
            edge: EdgeDetector::new(timing.read_delay_ms),
            debounce: Debounce::new(timing.debounce_ms),
        }
    }

    pub fn retune(&mut self, timing: LineTiming) {
        self.edge.set_read_delay_ms(timing.read_delay_ms);
        self.debounce.set_window_ms(timing.debounce_ms);
    }

    pub fn timing(&self) -> LineTiming {
        LineTiming::new(self.edge.read_delay_ms(), self.debounce.window_ms())
    }

    /// Reads `line` once to set the starting level, which is returned. A
    /// level present at start never counts as an edge.
    pub fn baseline<L: Line + ?Sized>(&mut self, line: &mut L, now_ms: u64) -> bool {
        self.edge.baseline(line, now_ms)
    }

    /// Samples `line` if due and returns a level that has settled.
    pub fn tick<L: Line + ?Sized>(&mut self, line: &mut L, now_ms: u64) -> Option<bool> {
        if let Some(level) = self.edge.poll(line, now_ms) {
            self.debounce.push(level, now_ms);
        }
        self.debounce.poll(now_ms)
    }
}

type RodeGraph<L, S> = Accumulator<Linear<(L, ScopeCalculator<S>)>>;

/// Gypsy pulses in, rode length and scope out.
///
/// `L` receives every rode length in meters, `S` the scope computed from the
/// same length.
pub struct ChainCounter<L, S> {
    gypsy: LineWatcher,
    rode: RodeGraph<L, S>,
}

impl<L: Consumer<f32>, S: Consumer<f32>> ChainCounter<L, S> {
    pub fn new(tunables: &Tunables, rode_sink: L, scope_sink: S) -> Self {
        let scope = ScopeCalculator::new(scope_sink);
        let linear = Linear::new(
            tunables.circumference_m,
            tunables.offset_m,
            (rode_sink, scope),
        );
        Self {
            gypsy: LineWatcher::new(tunables.gypsy),
            rode: Accumulator::new(linear),
        }
    }

    /// Applies changed poll intervals, debounce window and calibration. The
    /// count is kept.
    pub fn retune(&mut self, tunables: &Tunables) {
        self.gypsy.retune(tunables.gypsy);
        self.rode
            .downstream_mut()
            .set_calibration(tunables.circumference_m, tunables.offset_m);
    }

    /// Takes the starting gypsy level. The switch may rest closed without
    /// that counting as a pulse.
    pub fn baseline<G: Line + ?Sized>(&mut self, gypsy: &mut G, now_ms: u64) -> bool {
        self.gypsy.baseline(gypsy, now_ms)
    }

    /// Runs one scheduler tick. UP and DOWN are only sampled when a settled
    /// gypsy level has to be classified.
    pub fn tick<G, U, D>(
        &mut self,
        gypsy: &mut G,
        up: &mut U,
        down: &mut D,
        now_ms: u64,
    ) -> Option<Direction>
    where
        G: Line + ?Sized,
        U: Line + ?Sized,
        D: Line + ?Sized,
    {
        let level = self.gypsy.tick(gypsy, now_ms)?;
        let controls = Controls::new(up.is_high(), down.is_high());
        Some(self.on_pulse(level, controls))
    }

    /// Classifies a settled gypsy level and counts it.
    pub fn on_pulse(&mut self, level: bool, controls: Controls) -> Direction {
        let count = self.rode.get();
        if !level {
            info!(
                "Falling edge detected. UP: {} DOWN: {} count={}",
                controls.up,
                controls.down,
                count
            );
        }
        let direction = classify(level, controls, count);
        self.rode.accumulate(direction);
        direction
    }

    /// Sends the current rode length and scope downstream, e.g. at start-up
    /// before any pulse has arrived.
    pub fn publish(&mut self) {
        self.rode.publish();
    }

    /// Handles a settled level of the reset button. Only the press resets.
    pub fn on_reset_button(&mut self, pressed: bool) -> bool {
        if pressed {
            self.reset();
        }
        pressed
    }

    pub fn reset(&mut self) {
        info!("resetting chain count from {}", self.rode.get());
        self.rode.reset();
    }

    pub fn count(&self) -> i32 {
        self.rode.get()
    }

    /// Rode deployed for the current count, in meters.
    pub fn deployed(&self) -> f32 {
        self.rode.downstream().apply(self.rode.get())
    }

    /// Records the latest depth. The scope follows on the next rode length.
    pub fn set_depth(&mut self, depth: f32) {
        self.scope_mut().set_depth(depth);
    }

    pub fn depth(&self) -> f32 {
        self.rode.downstream().downstream().1.depth()
    }

    pub fn rode_sink(&self) -> &L {
        &self.rode.downstream().downstream().0
    }

    pub fn scope_sink(&self) -> &S {
        self.rode.downstream().downstream().1.downstream()
    }

    fn scope_mut(&mut self) -> &mut ScopeCalculator<S> {
        &mut self.rode.downstream_mut().downstream_mut().1
    }
}
