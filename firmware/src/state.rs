use chain_counter::{ConfigError, Tunables};
use defmt::Format;

#[derive(Format)]
pub struct Context {
    pub rode: Rode,
    pub depth: Option<f32>,
    pub tunables: Tunables,
    pub tunables_revision: u32,
    pub network_state: NetworkState,
}

impl Context {
    pub const fn new() -> Self {
        Self {
            rode: Rode {
                count: 0,
                deployed_m: 0.0,
                scope: 0.0,
            },
            depth: None,
            tunables: Tunables::DEFAULT,
            tunables_revision: 0,
            network_state: NetworkState::Disconnected,
        }
    }

    pub fn set_tunable(&mut self, path: &str, value: f32) -> Result<(), ConfigError> {
        self.tunables.set(path, value)?;
        self.tunables_revision = self.tunables_revision.wrapping_add(1);
        Ok(())
    }
}

#[derive(Format, PartialEq, Eq, Clone, Copy)]
pub enum NetworkState {
    Disconnected,
    Joined,
    Connected,
}

#[derive(Format, Clone, Copy)]
pub struct Rode {
    pub count: i32,
    pub deployed_m: f32,
    pub scope: f32,
}

/// A value on its way to the Signal K server.
#[derive(Format, Clone, Copy)]
pub enum Telemetry {
    RodeDeployed(f32),
    Scope(f32),
    ChainLength(f32),
    UpButton(&'static str),
    DownButton(&'static str),
}

/// Number of distinct [`Telemetry`] paths.
pub const TELEMETRY_SLOTS: usize = 5;

impl Telemetry {
    /// Outbox slot of the path this value is published on.
    pub fn slot(&self) -> usize {
        match self {
            Telemetry::RodeDeployed(_) => 0,
            Telemetry::Scope(_) => 1,
            Telemetry::ChainLength(_) => 2,
            Telemetry::UpButton(_) => 3,
            Telemetry::DownButton(_) => 4,
        }
    }
}
