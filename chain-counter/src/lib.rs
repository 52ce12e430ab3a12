//! Anchor chain counter.
//!
//! Turns pulses from a windlass gypsy switch into the length of anchor rode
//! deployed, and derives the anchoring scope from a depth feed:
//!
//! ```text
//! gypsy line -> EdgeDetector -> Debounce -> classify -> Accumulator -> Linear -+-> rode sink
//!                                 UP/DOWN lines --^                            +-> ScopeCalculator -> scope sink
//! ```
//!
//! Everything here is `no_std` and driven by explicit millisecond timestamps so
//! the firmware owns the clock and the tests can script it.
#![cfg_attr(not(test), no_std)]

mod fmt;

pub mod accumulator;
pub mod config;
pub mod counter;
pub mod debounce;
pub mod direction;
pub mod edge;
pub mod linear;
pub mod node;
pub mod outbox;
pub mod scope;
pub mod signalk;

pub use accumulator::Accumulator;
pub use config::{ConfigError, Tunables};
pub use counter::{ChainCounter, LineWatcher};
pub use debounce::Debounce;
pub use direction::{classify, Controls, Direction};
pub use edge::{EdgeDetector, Line};
pub use linear::Linear;
pub use node::{Consumer, TruthText};
pub use outbox::Outbox;
pub use scope::ScopeCalculator;
