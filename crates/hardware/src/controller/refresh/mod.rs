//! Refresh managers.
//!
//! One manager per rank keeps that rank's refresh obligation. All variants
//! share the deadline bookkeeping in [`RefreshClock`]: a deadline every
//! refresh interval, a flexibility counter that rises when a refresh is
//! postponed and falls when one is pulled in, and the rule that a refresh is
//! forced once the counter reaches the postponement limit or once
//! `max_postponed` intervals have passed since the last refresh, whichever
//! comes first. The second rule keeps pulled-in credit from stretching the
//! gap between two refreshes past `interval * (max_postponed + 1)`.
//!
//! Variants differ in what one refresh covers:
//!
//! - [`AllBankRefresh`]: REFAB to the whole rank;
//! - [`GroupedRefresh`]: REFPB, REFSB or REFP2B to one group of banks,
//!   round-robin over the rank.
//!
//! The controller owns the managers and dispatches through [`RefreshManager`].

mod all_bank;
mod grouped;

pub use all_bank::AllBankRefresh;
pub use grouped::GroupedRefresh;

use serde::Serialize;

use super::bank_machine::BankMachine;
use crate::common::{BankAddress, Command, ConfigError, Time};
use crate::config::{McConfig, RefreshPolicy};
use crate::memspec::MemSpec;

/// Whether the manager is on its deadline schedule or working ahead of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RefreshMode {
    Regular,
    PulledIn,
}

/// Cumulative refresh accounting of one rank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshCounters {
    /// Refresh commands issued.
    pub issued: u64,
    pub postponed: u64,
    pub pulled_in: u64,
    pub forced: u64,
}

/// What the controller must do for a manager after evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshDemand {
    /// A refresh is due: wake the rank if it is powered down.
    pub interrupt: bool,
    /// The refresh can no longer wait: block the banks covered by this
    /// refresh command until it is issued.
    pub forced: Option<(Command, BankAddress)>,
}

impl RefreshDemand {
    fn interrupt() -> Self {
        Self {
            interrupt: true,
            forced: None,
        }
    }
}

/// Deadline and credit state shared by every refresh variant.
#[derive(Debug, Clone)]
pub struct RefreshClock {
    interval: Time,
    next_deadline: Time,
    last_refresh: Time,
    mode: RefreshMode,
    flexibility: i64,
    max_postponed: i64,
    max_pulled_in: i64,
    sleeping: bool,
    forcing: bool,
    counters: RefreshCounters,
}

impl RefreshClock {
    fn new(interval: Time, first_deadline: Time, max_postponed: i64, max_pulled_in: i64) -> Self {
        Self {
            interval,
            next_deadline: first_deadline,
            last_refresh: 0,
            mode: RefreshMode::Regular,
            flexibility: 0,
            max_postponed,
            max_pulled_in,
            sleeping: false,
            forcing: false,
            counters: RefreshCounters::default(),
        }
    }

    pub fn interval(&self) -> Time {
        self.interval
    }

    pub fn next_deadline(&self) -> Time {
        self.next_deadline
    }

    /// Issue time of the most recent refresh, zero before the first.
    pub fn last_refresh(&self) -> Time {
        self.last_refresh
    }

    pub fn mode(&self) -> RefreshMode {
        self.mode
    }

    /// Postponed (positive) or pulled-in (negative) refreshes outstanding.
    pub fn flexibility(&self) -> i64 {
        self.flexibility
    }

    pub fn max_postponed(&self) -> i64 {
        self.max_postponed
    }

    pub fn max_pulled_in(&self) -> i64 {
        self.max_pulled_in
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    pub fn counters(&self) -> RefreshCounters {
        self.counters
    }

    fn is_due(&self, now: Time) -> bool {
        now >= self.next_deadline
    }

    /// Latest time the next refresh may be decided without breaking the
    /// liveness bound.
    fn force_at(&self) -> Time {
        let span = self.interval.saturating_mul(self.max_postponed.max(0) as Time);
        self.last_refresh.saturating_add(span)
    }

    fn is_forced(&self, now: Time) -> bool {
        self.mode == RefreshMode::Regular
            && (self.flexibility >= self.max_postponed || now >= self.force_at())
    }

    fn can_pull_in(&self) -> bool {
        self.flexibility > -self.max_pulled_in
    }

    fn postpone(&mut self) {
        self.flexibility += 1;
        self.counters.postponed += 1;
        self.next_deadline = self
            .next_deadline
            .saturating_add(self.interval)
            .min(self.force_at());
    }

    fn end_pull_in(&mut self) {
        self.mode = RefreshMode::Regular;
        self.next_deadline = self.next_deadline.saturating_add(self.interval);
    }

    /// Marks the pending refresh as forced. Returns `true` the first time.
    fn force(&mut self) -> bool {
        !std::mem::replace(&mut self.forcing, true)
    }

    fn refreshed(&mut self, now: Time) {
        self.counters.issued += 1;
        self.last_refresh = now;
        if std::mem::take(&mut self.forcing) {
            self.counters.forced += 1;
        }
        if self.sleeping {
            // First refresh after self-refresh restarts the schedule.
            self.sleeping = false;
            self.mode = RefreshMode::Regular;
            self.flexibility = 0;
            self.next_deadline = now.saturating_add(self.interval);
            return;
        }
        match self.mode {
            RefreshMode::PulledIn => {
                self.flexibility -= 1;
                self.counters.pulled_in += 1;
            }
            RefreshMode::Regular => self.mode = RefreshMode::PulledIn,
        }
        if !self.can_pull_in() {
            self.end_pull_in();
        }
    }

    fn power_command(&mut self, command: Command) {
        match command {
            Command::Pdea | Command::Pdep => self.sleeping = true,
            Command::Pdxa | Command::Pdxp => self.sleeping = false,
            Command::Srefen => {
                self.sleeping = true;
                self.next_deadline = Time::MAX;
            }
            // Srefex: stays asleep until the refresh that follows the exit.
            _ => {}
        }
    }
}

/// First deadline of `rank`: ranks are spread over one interval in
/// bit-reversed order, rank 0 at time zero.
fn staggered_deadline(rank: usize, ranks: usize, interval: Time) -> Time {
    let slot = if ranks.is_power_of_two() && ranks > 1 {
        rank.reverse_bits() >> (usize::BITS - ranks.trailing_zeros())
    } else {
        rank
    };
    interval * slot as Time / ranks.max(1) as Time
}

/// Interface shared by the refresh variants.
pub trait RefreshScheme {
    /// Re-evaluates the rank at `now` against the read-only state of its
    /// banks.
    fn evaluate(&mut self, now: Time, banks: &[BankMachine]) -> RefreshDemand;

    /// Command this manager wants issued, if any.
    fn next_command(&self) -> Option<(Command, BankAddress)>;

    /// Observes a command issued to this rank.
    fn update(&mut self, command: Command, target: BankAddress, now: Time);

    /// Next time evaluation can change the outcome.
    fn time_for_next_trigger(&self) -> Time {
        self.clock().next_deadline()
    }

    fn clock(&self) -> &RefreshClock;
}

/// Refresh manager of one rank.
pub enum RefreshManager {
    Disabled,
    AllBank(AllBankRefresh),
    PerBank(GroupedRefresh),
    SameBank(GroupedRefresh),
    PerTwoBank(GroupedRefresh),
}

impl RefreshManager {
    /// Builds the manager for `rank`, rejecting granularities the device
    /// cannot do.
    pub fn new(rank: usize, memspec: &MemSpec, config: &McConfig) -> Result<Self, ConfigError> {
        let policy = config.refresh_policy;
        if policy == RefreshPolicy::NoRefresh {
            return Ok(RefreshManager::Disabled);
        }
        let unsupported = || ConfigError::UnsupportedRefreshPolicy {
            policy: format!("{policy:?}"),
            memory: memspec.memory_type.to_string(),
        };
        let timing = memspec.refresh_timing(policy).ok_or_else(unsupported)?;
        let geometry = memspec.geometry;
        if policy == RefreshPolicy::PerTwoBank && geometry.banks_per_rank % 2 != 0 {
            return Err(unsupported());
        }

        let groups = match policy {
            RefreshPolicy::PerBank => geometry.banks_per_rank,
            RefreshPolicy::SameBank => geometry.banks_per_group(),
            RefreshPolicy::PerTwoBank => geometry.banks_per_rank / 2,
            _ => 1,
        } as i64;
        if groups > 1 {
            if let Some(spacing) = memspec.timing.refresh.partial_to_partial {
                if timing.interval <= spacing {
                    return Err(ConfigError::UnsatisfiableTiming(format!(
                        "{policy:?} refresh interval ({} ps) does not exceed the minimum spacing between refreshes ({spacing} ps)",
                        timing.interval
                    )));
                }
            }
        }

        let clock = RefreshClock::new(
            timing.interval,
            staggered_deadline(rank, geometry.ranks, timing.interval),
            config.refresh_max_postponed as i64 * groups,
            config.refresh_max_pulledin as i64 * groups,
        );
        let target = geometry.rank_address(rank);
        Ok(match policy {
            RefreshPolicy::AllBank => RefreshManager::AllBank(AllBankRefresh::new(target, clock)),
            RefreshPolicy::PerBank => {
                RefreshManager::PerBank(GroupedRefresh::new(Command::Refpb, rank, geometry, clock))
            }
            RefreshPolicy::SameBank => {
                RefreshManager::SameBank(GroupedRefresh::new(Command::Refsb, rank, geometry, clock))
            }
            RefreshPolicy::PerTwoBank => RefreshManager::PerTwoBank(GroupedRefresh::new(
                Command::Refp2b,
                rank,
                geometry,
                clock,
            )),
            RefreshPolicy::NoRefresh => RefreshManager::Disabled,
        })
    }

    fn scheme(&self) -> Option<&dyn RefreshScheme> {
        match self {
            RefreshManager::Disabled => None,
            RefreshManager::AllBank(m) => Some(m),
            RefreshManager::PerBank(m) | RefreshManager::SameBank(m) | RefreshManager::PerTwoBank(m) => {
                Some(m)
            }
        }
    }

    fn scheme_mut(&mut self) -> Option<&mut dyn RefreshScheme> {
        match self {
            RefreshManager::Disabled => None,
            RefreshManager::AllBank(m) => Some(m),
            RefreshManager::PerBank(m) | RefreshManager::SameBank(m) | RefreshManager::PerTwoBank(m) => {
                Some(m)
            }
        }
    }

    pub fn evaluate(&mut self, now: Time, banks: &[BankMachine]) -> RefreshDemand {
        self.scheme_mut()
            .map_or_else(RefreshDemand::default, |m| m.evaluate(now, banks))
    }

    pub fn next_command(&self) -> Option<(Command, BankAddress)> {
        self.scheme().and_then(|m| m.next_command())
    }

    pub fn update(&mut self, command: Command, target: BankAddress, now: Time) {
        if let Some(m) = self.scheme_mut() {
            m.update(command, target, now);
        }
    }

    /// `None` when refresh is disabled or the rank is in self-refresh.
    pub fn time_for_next_trigger(&self) -> Option<Time> {
        self.scheme()
            .map(|m| m.time_for_next_trigger())
            .filter(|&t| t != Time::MAX)
    }

    pub fn clock(&self) -> Option<&RefreshClock> {
        self.scheme().map(|m| m.clock())
    }

    pub fn counters(&self) -> RefreshCounters {
        self.clock().map(RefreshClock::counters).unwrap_or_default()
    }

    pub fn flexibility(&self) -> i64 {
        self.clock().map_or(0, RefreshClock::flexibility)
    }
}
