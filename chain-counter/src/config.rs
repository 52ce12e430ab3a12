//! Runtime tunables, addressable by configuration path.

use thiserror::Error;

pub const GYPSY_READ_DELAY: &str = "/chain_counter/read_delay";
pub const GYPSY_DEBOUNCE: &str = "/gypsy/debounceWindow_ms";
pub const GYPSY_CIRCUMFERENCE: &str = "/gypsy/circumference";
pub const GYPSY_OFFSET: &str = "/gypsy/offset";
pub const UP_READ_DELAY: &str = "/up_button_watcher/read_delay";
pub const UP_DEBOUNCE: &str = "/up_debounce/delay";
pub const DOWN_READ_DELAY: &str = "/down_button_watcher/read_delay";
pub const DOWN_DEBOUNCE: &str = "/down_debounce/delay";
pub const RESET_READ_DELAY: &str = "/reset_button_watcher/read_delay";
pub const RESET_DEBOUNCE: &str = "/reset_debounce/delay";
pub const CHAIN_LENGTH: &str = "/chain/length";

const PATHS: [&str; 11] = [
    GYPSY_READ_DELAY,
    GYPSY_DEBOUNCE,
    GYPSY_CIRCUMFERENCE,
    GYPSY_OFFSET,
    UP_READ_DELAY,
    UP_DEBOUNCE,
    DOWN_READ_DELAY,
    DOWN_DEBOUNCE,
    RESET_READ_DELAY,
    RESET_DEBOUNCE,
    CHAIN_LENGTH,
];

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    #[error("unknown configuration path")]
    UnknownPath,
    #[error("invalid value for {path}")]
    InvalidValue { path: &'static str },
}

/// Poll interval and debounce window of one digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineTiming {
    pub read_delay_ms: u64,
    pub debounce_ms: u64,
}

impl LineTiming {
    pub const fn new(read_delay_ms: u64, debounce_ms: u64) -> Self {
        Self {
            read_delay_ms,
            debounce_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tunables {
    pub gypsy: LineTiming,
    pub up: LineTiming,
    pub down: LineTiming,
    pub reset: LineTiming,
    /// Chain paid out per gypsy pulse, in meters.
    pub circumference_m: f32,
    pub offset_m: f32,
    /// Total chain aboard, reported as is.
    pub chain_length_m: f32,
}

impl Default for Tunables {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Tunables {
    pub const DEFAULT: Tunables = Tunables {
        gypsy: LineTiming::new(1000, 15),
        up: LineTiming::new(10, 15),
        down: LineTiming::new(10, 15),
        reset: LineTiming::new(10, 15),
        circumference_m: 0.32,
        offset_m: 0.0,
        chain_length_m: 100.0,
    };

    /// Every configuration path, in a stable order.
    pub fn paths() -> impl Iterator<Item = &'static str> {
        PATHS.iter().copied()
    }

    pub fn get(&self, path: &str) -> Result<f32, ConfigError> {
        let value = match path {
            GYPSY_READ_DELAY => self.gypsy.read_delay_ms as f32,
            GYPSY_DEBOUNCE => self.gypsy.debounce_ms as f32,
            GYPSY_CIRCUMFERENCE => self.circumference_m,
            GYPSY_OFFSET => self.offset_m,
            UP_READ_DELAY => self.up.read_delay_ms as f32,
            UP_DEBOUNCE => self.up.debounce_ms as f32,
            DOWN_READ_DELAY => self.down.read_delay_ms as f32,
            DOWN_DEBOUNCE => self.down.debounce_ms as f32,
            RESET_READ_DELAY => self.reset.read_delay_ms as f32,
            RESET_DEBOUNCE => self.reset.debounce_ms as f32,
            CHAIN_LENGTH => self.chain_length_m,
            _ => return Err(ConfigError::UnknownPath),
        };
        Ok(value)
    }

    /// Sets the tunable at `path`. On error nothing changes.
    pub fn set(&mut self, path: &str, value: f32) -> Result<(), ConfigError> {
        let key = Self::paths()
            .find(|p| *p == path)
            .ok_or(ConfigError::UnknownPath)?;
        if !value.is_finite() {
            return Err(ConfigError::InvalidValue { path: key });
        }

        match key {
            GYPSY_READ_DELAY => self.gypsy.read_delay_ms = millis(key, value)?,
            GYPSY_DEBOUNCE => self.gypsy.debounce_ms = millis(key, value)?,
            GYPSY_CIRCUMFERENCE => self.circumference_m = value,
            GYPSY_OFFSET => self.offset_m = value,
            UP_READ_DELAY => self.up.read_delay_ms = millis(key, value)?,
            UP_DEBOUNCE => self.up.debounce_ms = millis(key, value)?,
            DOWN_READ_DELAY => self.down.read_delay_ms = millis(key, value)?,
            DOWN_DEBOUNCE => self.down.debounce_ms = millis(key, value)?,
            RESET_READ_DELAY => self.reset.read_delay_ms = millis(key, value)?,
            RESET_DEBOUNCE => self.reset.debounce_ms = millis(key, value)?,
            CHAIN_LENGTH if value < 0.0 => return Err(ConfigError::InvalidValue { path: key }),
            CHAIN_LENGTH => self.chain_length_m = value,
            _ => return Err(ConfigError::UnknownPath),
        }

        info!("config {} = {}", key, value);
        Ok(())
    }
}

fn millis(path: &'static str, value: f32) -> Result<u64, ConfigError> {
    if value < 0.0 {
        return Err(ConfigError::InvalidValue { path });
    }
    Ok((value + 0.5) as u64)
}
