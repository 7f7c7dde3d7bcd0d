//! Power-down manager.
//!
//! Per-rank state machine that puts an idle rank into power-down and wakes it
//! when work arrives. Three triggers drive it:
//!
//! - `trigger_entry`: the rank ran out of requests;
//! - `trigger_exit`: a request arrived for the rank;
//! - `trigger_interruption`: a refresh is due.
//!
//! An idle rank enters active power-down (PDEA) when a row is open, precharge
//! power-down (PDEP) otherwise. If a precharge power-down is interrupted only
//! to refresh a still idle rank, the next entry goes to self-refresh instead.
//! After self-refresh exit the manager issues one REFAB itself before handing
//! the rank back.

use serde::Serialize;

use super::bank_machine::BankMachine;
use crate::common::time::{align_up, ns_f64};
use crate::common::{BankAddress, Command, Time};
use crate::config::{McConfig, PowerDownPolicy};
use crate::memspec::MemSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PowerMode {
    /// Not powered down.
    Active,
    ActivePowerDown,
    PrechargePowerDown,
    SelfRefresh,
    /// Out of self-refresh, owes one REFAB.
    ExtraRefresh,
}

/// Cumulative residency of one rank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PowerResidency {
    pub power_down_entries: u64,
    pub self_refresh_entries: u64,
    pub power_down_time: Time,
    pub self_refresh_time: Time,
}

pub struct PowerDownManager {
    policy: PowerDownPolicy,
    target: BankAddress,
    mode: PowerMode,
    entered_at: Time,
    idle_since: Option<Time>,
    entry_triggered: bool,
    exit_triggered: bool,
    enter_self_refresh: bool,
    timeout: Time,
    power_down_residency: Time,
    self_refresh_residency: Time,
    next: Option<Command>,
    residency: PowerResidency,
}

impl PowerDownManager {
    pub fn new(target: BankAddress, memspec: &MemSpec, config: &McConfig) -> Self {
        let floor = ns_f64(config.power_down_min_residency);
        Self {
            policy: config.power_down_policy,
            target,
            mode: PowerMode::Active,
            entered_at: 0,
            idle_since: None,
            entry_triggered: false,
            exit_triggered: false,
            enter_self_refresh: false,
            timeout: config.power_down_timeout * memspec.t_ck,
            power_down_residency: align_up(memspec.timing.pd.max(floor), memspec.t_ck),
            self_refresh_residency: align_up(memspec.timing.ckesr.max(floor), memspec.t_ck),
            next: None,
            residency: PowerResidency::default(),
        }
    }

    pub fn mode(&self) -> PowerMode {
        self.mode
    }

    pub fn is_powered_down(&self) -> bool {
        self.mode != PowerMode::Active
    }

    pub fn residency(&self) -> PowerResidency {
        self.residency
    }

    /// The rank has no outstanding requests as of `now`.
    pub fn trigger_entry(&mut self, now: Time) {
        self.idle_since = Some(now);
        if self.mode == PowerMode::Active {
            self.entry_triggered = true;
        }
    }

    /// A request arrived for the rank.
    pub fn trigger_exit(&mut self) {
        self.idle_since = None;
        self.entry_triggered = false;
        self.enter_self_refresh = false;
        if self.mode != PowerMode::Active {
            self.exit_triggered = true;
        }
    }

    /// A refresh is due. Cancels a pending entry and wakes a powered-down
    /// rank.
    pub fn trigger_interruption(&mut self) {
        self.entry_triggered = false;
        if self.mode != PowerMode::Active {
            self.exit_triggered = true;
        }
    }

    pub fn evaluate(&mut self, now: Time, banks: &[BankMachine]) {
        self.next = None;
        if self.policy == PowerDownPolicy::NoPowerDown {
            return;
        }
        if self.exit_triggered {
            self.next = match self.mode {
                PowerMode::ActivePowerDown => Some(Command::Pdxa),
                PowerMode::PrechargePowerDown => Some(Command::Pdxp),
                PowerMode::SelfRefresh => Some(Command::Srefex),
                PowerMode::ExtraRefresh => Some(Command::Refab),
                PowerMode::Active => None,
            };
            return;
        }
        if !self.entry_triggered {
            return;
        }
        let Some(idle_since) = self.idle_since else {
            return;
        };
        if now < idle_since + self.timeout {
            return;
        }
        self.next = Some(if banks.iter().any(BankMachine::is_activated) {
            Command::Pdea
        } else if self.enter_self_refresh {
            Command::Srefen
        } else {
            Command::Pdep
        });
    }

    pub fn next_command(&self) -> Option<(Command, BankAddress)> {
        self.next.map(|command| (command, self.target))
    }

    /// Earliest time the manager lets `command` go out, on top of the device
    /// constraints: the idle timeout for entries, the minimum residency for
    /// exits.
    pub fn floor(&self, command: Command) -> Time {
        match command {
            Command::Pdxa | Command::Pdxp => self.entered_at + self.power_down_residency,
            Command::Srefex => self.entered_at + self.self_refresh_residency,
            c if c.is_power_down_entry() => self.idle_since.map_or(0, |t| t + self.timeout),
            _ => 0,
        }
    }

    /// Next time evaluation can produce a different command.
    pub fn time_for_next_trigger(&self) -> Option<Time> {
        if self.policy == PowerDownPolicy::NoPowerDown {
            return None;
        }
        if self.entry_triggered && !self.exit_triggered {
            return self.idle_since.map(|t| t + self.timeout);
        }
        None
    }

    pub fn update(&mut self, command: Command, now: Time, controller_idle: bool) {
        match command {
            Command::Pdea | Command::Pdep | Command::Srefen => {
                self.mode = match command {
                    Command::Pdea => PowerMode::ActivePowerDown,
                    Command::Pdep => PowerMode::PrechargePowerDown,
                    _ => PowerMode::SelfRefresh,
                };
                if command == Command::Srefen {
                    self.residency.self_refresh_entries += 1;
                    self.enter_self_refresh = false;
                } else {
                    self.residency.power_down_entries += 1;
                }
                self.entered_at = now;
                self.entry_triggered = false;
                log::debug!("rank {} {command} at {now} ps", self.target.rank);
            }
            Command::Pdxa | Command::Pdxp => {
                self.residency.power_down_time += now - self.entered_at;
                self.mode = PowerMode::Active;
                self.exit_triggered = false;
                if command == Command::Pdxp && controller_idle {
                    // Woken only for refresh: go deeper next time.
                    self.enter_self_refresh = true;
                }
            }
            Command::Srefex => {
                self.residency.self_refresh_time += now - self.entered_at;
                self.mode = PowerMode::ExtraRefresh;
            }
            Command::Refab if self.mode == PowerMode::ExtraRefresh => {
                self.mode = PowerMode::Active;
                self.exit_triggered = false;
            }
            c if c.is_refresh() && controller_idle => {
                self.entry_triggered = true;
            }
            _ => {}
        }
    }
}
