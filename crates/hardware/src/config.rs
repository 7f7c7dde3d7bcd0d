//! Configuration for the memory controller and its simulation driver.
//!
//! This module defines all configuration structures and enums used to
//! parameterize a run. It provides:
//! 1. **Defaults:** Baseline controller policies and bounds.
//! 2. **Structures:** The device description (`memspec`), controller config
//!    (`mcconfig`), simulation config (`simconfig`) and traffic setup
//!    (`tracesetup`).
//! 3. **Enums:** Page, scheduler, arbitration, refresh and power-down policies.
//!
//! Configuration is supplied as JSON (CLI or the Python API); `Config::default()`
//! gives a DDR4-2400 device with default policies.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::ConfigError;
use crate::memspec::{MemoryType, presets};

/// Default controller constants.
///
/// These values apply whenever the corresponding `mcconfig` key is absent.
mod defaults {
    /// Per-bank request queue depth.
    pub const REQUEST_BUFFER_SIZE: usize = 8;

    /// Refresh commands that may be postponed before one is forced.
    ///
    /// JEDEC DDR4 allows up to eight.
    pub const REFRESH_MAX_POSTPONED: u32 = 8;

    /// Refresh commands that may be issued ahead of their deadline.
    pub const REFRESH_MAX_PULLEDIN: u32 = 8;

    /// Idle clock cycles before a rank enters power-down.
    pub const POWER_DOWN_TIMEOUT: u64 = 10;

    /// Minimum time a rank stays powered down once entered, in nanoseconds.
    ///
    /// Zero means only the device limit (tPD / tCKESR) applies.
    pub const POWER_DOWN_MIN_RESIDENCY_NS: f64 = 0.0;

    /// Name used for reports when none is configured.
    pub const SIMULATION_NAME: &str = "dramctl";
}

/// Row-buffer management policy of the bank machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PagePolicy {
    /// Rows stay open until a conflicting request needs the bank.
    #[default]
    Open,
    /// Auto-precharge when no further hit is queued but a miss is.
    OpenAdaptive,
    /// Every column access auto-precharges.
    Closed,
    /// Auto-precharge unless a further hit is queued.
    ClosedAdaptive,
}

/// Request selection inside one bank queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SchedulerPolicy {
    /// Oldest request first.
    #[serde(alias = "FIFO")]
    Fifo,
    /// Oldest row hit first, otherwise oldest request.
    #[default]
    #[serde(alias = "FR-FCFS", alias = "FRFCFS")]
    FrFcfs,
}

/// Choice between bank-machine candidates that are legal at the same step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ArbitrationPolicy {
    /// Candidate serving the oldest request wins.
    #[default]
    #[serde(alias = "Fifo", alias = "FIFO")]
    Oldest,
    /// Banks take turns, starting after the last bank served.
    RoundRobin,
}

/// Refresh granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum RefreshPolicy {
    /// Refresh is never issued.
    NoRefresh,
    /// REFAB to the whole rank.
    #[default]
    #[serde(alias = "Rankwise")]
    AllBank,
    /// REFPB, one bank at a time.
    #[serde(alias = "Bankwise")]
    PerBank,
    /// REFSB, the same bank in every bank group.
    #[serde(alias = "Groupwise")]
    SameBank,
    /// REFP2B, two banks at a time.
    #[serde(alias = "Per2Bank")]
    PerTwoBank,
}

/// Power-down strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PowerDownPolicy {
    /// Ranks never power down.
    #[default]
    NoPowerDown,
    /// Each rank powers down on its own after an idle timeout.
    Staggered,
}

/// Raw `{ "key": number }` parameter map of a memspec section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entries(BTreeMap<String, f64>);

impl Entries {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    /// Sets or replaces a parameter.
    pub fn set(&mut self, key: &str, value: f64) {
        self.0.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<f64> {
        self.0.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<const N: usize> From<[(&str, f64); N]> for Entries {
    fn from(pairs: [(&str, f64); N]) -> Self {
        Self(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

/// Device description as it appears in the configuration file.
///
/// Turned into a validated [`MemSpec`](crate::memspec::MemSpec) by
/// [`MemSpec::from_config`](crate::memspec::MemSpec::from_config).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemSpecConfig {
    pub memory_id: String,
    pub memory_type: MemoryType,
    /// Geometry parameters (ranks, banks, rows, burst length, ...).
    pub memarchitecturespec: Entries,
    /// Clock and timing parameters, in clock cycles except `clkMhz`.
    pub memtimingspec: Entries,
}

/// Controller policies and bounds (`mcconfig`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct McConfig {
    #[serde(default)]
    pub page_policy: PagePolicy,

    #[serde(default)]
    pub scheduler: SchedulerPolicy,

    #[serde(default)]
    pub arbiter: ArbitrationPolicy,

    /// Requests each bank machine may hold; excess requests wait in admission.
    #[serde(default = "McConfig::default_request_buffer_size")]
    pub request_buffer_size: usize,

    #[serde(default)]
    pub refresh_policy: RefreshPolicy,

    #[serde(default = "McConfig::default_max_postponed")]
    pub refresh_max_postponed: u32,

    #[serde(default = "McConfig::default_max_pulled_in", alias = "RefreshMaxPulledIn")]
    pub refresh_max_pulledin: u32,

    #[serde(default)]
    pub power_down_policy: PowerDownPolicy,

    /// Idle clock cycles before power-down entry.
    #[serde(default = "McConfig::default_power_down_timeout")]
    pub power_down_timeout: u64,

    /// Minimum power-down residency in nanoseconds.
    #[serde(default = "McConfig::default_power_down_min_residency")]
    pub power_down_min_residency: f64,
}

impl McConfig {
    fn default_request_buffer_size() -> usize {
        defaults::REQUEST_BUFFER_SIZE
    }

    fn default_max_postponed() -> u32 {
        defaults::REFRESH_MAX_POSTPONED
    }

    fn default_max_pulled_in() -> u32 {
        defaults::REFRESH_MAX_PULLEDIN
    }

    fn default_power_down_timeout() -> u64 {
        defaults::POWER_DOWN_TIMEOUT
    }

    fn default_power_down_min_residency() -> f64 {
        defaults::POWER_DOWN_MIN_RESIDENCY_NS
    }

    /// Checks bounds that do not depend on the device.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_buffer_size == 0 {
            return Err(ConfigError::InvalidController(
                "RequestBufferSize must be at least 1".into(),
            ));
        }
        if !self.power_down_min_residency.is_finite() || self.power_down_min_residency < 0.0 {
            return Err(ConfigError::InvalidController(format!(
                "PowerDownMinResidency must be a non-negative number of ns, got {}",
                self.power_down_min_residency
            )));
        }
        Ok(())
    }
}

impl Default for McConfig {
    fn default() -> Self {
        Self {
            page_policy: PagePolicy::default(),
            scheduler: SchedulerPolicy::default(),
            arbiter: ArbitrationPolicy::default(),
            request_buffer_size: defaults::REQUEST_BUFFER_SIZE,
            refresh_policy: RefreshPolicy::default(),
            refresh_max_postponed: defaults::REFRESH_MAX_POSTPONED,
            refresh_max_pulledin: defaults::REFRESH_MAX_PULLEDIN,
            power_down_policy: PowerDownPolicy::default(),
            power_down_timeout: defaults::POWER_DOWN_TIMEOUT,
            power_down_min_residency: defaults::POWER_DOWN_MIN_RESIDENCY_NS,
        }
    }
}

/// Simulation options (`simconfig`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SimConfig {
    #[serde(default = "SimConfig::default_name")]
    pub simulation_name: String,

    /// Keep a trace of every issued command.
    #[serde(default)]
    pub record_commands: bool,

    /// Keep every completion in the simulator after routing it back to its
    /// initiator.
    #[serde(default = "SimConfig::default_record_completions")]
    pub record_completions: bool,
}

impl SimConfig {
    fn default_name() -> String {
        defaults::SIMULATION_NAME.to_string()
    }

    fn default_record_completions() -> bool {
        true
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            simulation_name: Self::default_name(),
            record_commands: false,
            record_completions: Self::default_record_completions(),
        }
    }
}

/// Replays an STL trace file. `name` is the path, relative to the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracePlayerConfig {
    pub name: String,
    pub clk_mhz: f64,
}

/// Alternates reads between two rows of one bank, one per initiator clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowHammerConfig {
    pub name: String,
    pub num_requests: u64,
    pub clk_mhz: f64,
    pub row_increment: u64,
}

/// One entry of `tracesetup`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InitiatorConfig {
    RowHammer(RowHammerConfig),
    TracePlayer(TracePlayerConfig),
}

/// Root configuration object.
///
/// # Example
///
/// ```
/// use dramctl::config::{Config, RefreshPolicy};
///
/// let mut config = Config::default();
/// config.mcconfig.refresh_policy = RefreshPolicy::PerBank;
/// assert_eq!(config.memspec.memory_id, "JEDEC_8Gb_DDR4-2400_x8");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub memspec: MemSpecConfig,

    #[serde(default)]
    pub mcconfig: McConfig,

    #[serde(default)]
    pub simconfig: SimConfig,

    #[serde(default)]
    pub tracesetup: Vec<InitiatorConfig>,
}

impl Config {
    /// Parses a JSON document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(text)?;
        config.mcconfig.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Default policies around the given device.
    pub fn with_memspec(memspec: MemSpecConfig) -> Self {
        Self {
            memspec,
            mcconfig: McConfig::default(),
            simconfig: SimConfig::default(),
            tracesetup: Vec::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::with_memspec(presets::ddr4_2400())
    }
}
