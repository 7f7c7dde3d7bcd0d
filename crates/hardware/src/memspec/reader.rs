//! Typed access to the raw parameter maps of a memspec.

use crate::common::{ConfigError, Time};
use crate::config::{Entries, MemSpecConfig};

/// Reads geometry counts and clock-cycle timings out of a [`MemSpecConfig`],
/// converting timings to picoseconds on the way.
pub(crate) struct SpecReader<'a> {
    config: &'a MemSpecConfig,
    t_ck: Time,
}

impl<'a> SpecReader<'a> {
    pub fn new(config: &'a MemSpecConfig) -> Result<Self, ConfigError> {
        let mut reader = Self { config, t_ck: 0 };
        let mhz = reader.raw(&config.memtimingspec, "clkMhz")?;
        if !mhz.is_finite() || mhz <= 0.0 {
            return Err(reader.invalid("clkMhz", "clock frequency must be positive"));
        }
        reader.t_ck = (1.0e6 / mhz).round() as Time;
        if reader.t_ck == 0 {
            return Err(reader.invalid("clkMhz", "clock period rounds to zero picoseconds"));
        }
        Ok(reader)
    }

    /// Clock period in picoseconds.
    pub fn t_ck(&self) -> Time {
        self.t_ck
    }

    pub fn memory_id(&self) -> &str {
        &self.config.memory_id
    }

    /// Positive integer from `memarchitecturespec`.
    pub fn count(&self, key: &str) -> Result<usize, ConfigError> {
        let value = self.raw(&self.config.memarchitecturespec, key)?;
        self.positive_integer(key, value)
    }

    pub fn count_or(&self, key: &str, default: usize) -> Result<usize, ConfigError> {
        match self.config.memarchitecturespec.get(key) {
            Some(value) => self.positive_integer(key, value),
            None => Ok(default),
        }
    }

    /// Timing from `memtimingspec` given in clock cycles, returned in picoseconds.
    pub fn cycles(&self, key: &str) -> Result<Time, ConfigError> {
        let value = self.raw(&self.config.memtimingspec, key)?;
        self.to_time(key, value)
    }

    pub fn cycles_opt(&self, key: &str) -> Result<Option<Time>, ConfigError> {
        self.config
            .memtimingspec
            .get(key)
            .map(|value| self.to_time(key, value))
            .transpose()
    }

    pub fn cycles_or(&self, key: &str, default_cycles: u64) -> Result<Time, ConfigError> {
        Ok(self.cycles_opt(key)?.unwrap_or(default_cycles * self.t_ck))
    }

    pub fn invalid(&self, key: &str, reason: &str) -> ConfigError {
        ConfigError::InvalidParameter {
            spec: self.config.memory_id.clone(),
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    fn raw(&self, entries: &Entries, key: &str) -> Result<f64, ConfigError> {
        entries.get(key).ok_or_else(|| ConfigError::MissingParameter {
            spec: self.config.memory_id.clone(),
            key: key.to_string(),
        })
    }

    fn positive_integer(&self, key: &str, value: f64) -> Result<usize, ConfigError> {
        if !value.is_finite() || value < 1.0 || value.fract() != 0.0 {
            return Err(self.invalid(key, "expected a positive integer"));
        }
        Ok(value as usize)
    }

    fn to_time(&self, key: &str, value: f64) -> Result<Time, ConfigError> {
        if !value.is_finite() || value < 0.0 {
            return Err(self.invalid(key, "expected a non-negative cycle count"));
        }
        Ok((value * self.t_ck as f64).round() as Time)
    }
}
