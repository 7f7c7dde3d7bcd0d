//! Partial-rank refresh: REFPB, REFSB or REFP2B issued round-robin over the
//! refresh groups of a rank, preferring groups whose banks have no queued
//! requests.

use super::{RefreshClock, RefreshDemand, RefreshMode, RefreshScheme};
use crate::common::{BankAddress, Command, Time};
use crate::controller::bank_machine::BankMachine;
use crate::memspec::Geometry;

pub struct GroupedRefresh {
    command: Command,
    geometry: Geometry,
    first_bank: usize,
    /// Representative target of each refresh group.
    groups: Vec<BankAddress>,
    /// Groups not yet refreshed in the current round, in round-robin order.
    remaining: Vec<usize>,
    clock: RefreshClock,
    next: Option<(Command, BankAddress)>,
}

impl GroupedRefresh {
    pub(super) fn new(command: Command, rank: usize, geometry: Geometry, clock: RefreshClock) -> Self {
        let count = match command {
            Command::Refsb => geometry.banks_per_group(),
            Command::Refp2b => geometry.banks_per_rank / 2,
            _ => geometry.banks_per_rank,
        };
        let groups: Vec<BankAddress> = (0..count)
            .map(|bank| geometry.bank_address(rank, bank))
            .collect();
        Self {
            command,
            geometry,
            first_bank: geometry.rank_banks(rank).start,
            remaining: (0..groups.len()).collect(),
            groups,
            clock,
            next: None,
        }
    }

    fn group_of(&self, target: BankAddress) -> usize {
        let in_rank = target.bank - self.first_bank;
        in_rank % self.groups.len().max(1)
    }

    fn group_is_idle(&self, group: usize, banks: &[BankMachine]) -> bool {
        self.geometry
            .footprint(self.command, self.groups[group])
            .all(|bank| banks[bank - self.first_bank].is_idle())
    }

    /// Groups refreshed so far this round are excluded until every group has
    /// had its turn.
    fn mark_refreshed(&mut self, group: usize) {
        self.remaining.retain(|&g| g != group);
        if self.remaining.is_empty() {
            self.remaining.extend(0..self.groups.len());
        }
    }
}

impl RefreshScheme for GroupedRefresh {
    fn evaluate(&mut self, now: Time, banks: &[BankMachine]) -> RefreshDemand {
        self.next = None;
        if !self.clock.is_due(now) {
            return RefreshDemand::default();
        }
        if self.clock.is_sleeping() {
            return RefreshDemand::interrupt();
        }

        // A forced refresh stays on the head of the round so the banks it
        // blocks are the ones it refreshes.
        let forced = self.clock.is_forced(now);
        let pick = if forced {
            self.remaining.first().copied()
        } else {
            self.remaining
                .iter()
                .copied()
                .find(|&g| self.group_is_idle(g, banks))
        };
        let group = match (self.clock.mode(), pick) {
            (_, Some(group)) => group,
            (RefreshMode::Regular, None) => {
                self.clock.postpone();
                return RefreshDemand::default();
            }
            (RefreshMode::PulledIn, None) => {
                self.clock.end_pull_in();
                return RefreshDemand::default();
            }
        };

        let target = self.groups[group];
        let open = self
            .geometry
            .footprint(self.command, target)
            .find(|&bank| banks[bank - self.first_bank].is_activated());
        self.next = Some(match open {
            Some(_) if self.command == Command::Refsb => (Command::Presb, target),
            Some(bank) => (Command::Prepb, banks[bank - self.first_bank].address()),
            None => (self.command, target),
        });

        let mut demand = RefreshDemand::interrupt();
        if forced {
            if self.clock.force() {
                log::warn!(
                    "rank {} {} to {target} forced at {now} ps",
                    target.rank,
                    self.command
                );
            }
            demand.forced = Some((self.command, target));
        }
        demand
    }

    fn next_command(&self) -> Option<(Command, BankAddress)> {
        self.next
    }

    fn update(&mut self, command: Command, target: BankAddress, now: Time) {
        if target.rank != self.groups[0].rank {
            return;
        }
        if command == self.command {
            let group = self.group_of(target);
            self.mark_refreshed(group);
            self.clock.refreshed(now);
        } else if command == Command::Refab {
            // Only issued after self-refresh; every bank is fresh.
            self.remaining = (0..self.groups.len()).collect();
            self.clock.refreshed(now);
        } else if command.is_power_down_entry() || command.is_power_down_exit() {
            self.clock.power_command(command);
        }
        self.next = None;
    }

    fn clock(&self) -> &RefreshClock {
        &self.clock
    }
}
