//! Cycle-accurate DRAM memory controller.
//!
//! Given a stream of decoded read/write requests, the controller decides
//! clock by clock which DRAM command is legal on which bank or rank and
//! reports an accurate completion time for every request.
//!
//! # Architecture
//!
//! * **Timing checker**: earliest legal issue time of any command from a
//!   bounded command history and the device constraint table.
//! * **Bank machines**: per-bank request queues and row-buffer state.
//! * **Refresh managers**: all-bank, per-bank, same-bank and per-two-bank
//!   refresh with postponement and pull-in.
//! * **Power-down managers**: active/precharge power-down and self-refresh.
//! * **Controller**: arbitration, issue and completion bookkeeping.
//!
//! # Modules
//!
//! * `common`: Commands, requests, time and error types.
//! * `config`: JSON configuration.
//! * `memspec`: Device descriptions, derived timing constraints, presets.
//! * `controller`: The scheduling core.
//! * `sim`: Event loop, traffic initiators and address mapping.
//! * `stats`: Statistics collection and reporting.

/// Shared types: commands, requests, completions, time and errors.
pub mod common;

/// Configuration structures, policy enums and their defaults.
///
/// Parses the `memspec`, `mcconfig`, `simconfig` and `tracesetup` sections
/// of a JSON configuration.
pub mod config;

/// Validated device descriptions and the timing constraint table derived
/// from them.
pub mod memspec;

/// Per-channel scheduling core.
///
/// Bank machines, refresh and power-down managers, the timing checker and
/// the arbiter, owned and driven by the controller.
pub mod controller;

/// Discrete-event driver and request initiators.
pub mod sim;

/// Controller statistics collection and reporting.
pub mod stats;

pub use crate::common::{BankAddress, Command, Completion, ConfigError, Direction, Request, SimError, Time};
pub use crate::config::Config;
pub use crate::controller::Controller;
pub use crate::memspec::MemSpec;
pub use crate::sim::Simulator;
