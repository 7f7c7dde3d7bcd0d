use super::{RefreshClock, RefreshDemand, RefreshMode, RefreshScheme};
use crate::common::{BankAddress, Command, Time};
use crate::controller::bank_machine::BankMachine;

/// REFAB to a whole rank every tREFI, preceded by PREAB when a row is open.
pub struct AllBankRefresh {
    target: BankAddress,
    clock: RefreshClock,
    next: Option<Command>,
}

impl AllBankRefresh {
    pub(super) fn new(target: BankAddress, clock: RefreshClock) -> Self {
        Self {
            target,
            clock,
            next: None,
        }
    }
}

impl RefreshScheme for AllBankRefresh {
    fn evaluate(&mut self, now: Time, banks: &[BankMachine]) -> RefreshDemand {
        self.next = None;
        if !self.clock.is_due(now) {
            return RefreshDemand::default();
        }
        if self.clock.is_sleeping() {
            return RefreshDemand::interrupt();
        }

        let busy = banks.iter().any(|b| !b.is_idle());
        let forced = self.clock.is_forced(now);
        match self.clock.mode() {
            RefreshMode::Regular if busy && !forced => {
                self.clock.postpone();
                log::trace!(
                    "rank {} refresh postponed at {now} ps ({} outstanding)",
                    self.target.rank,
                    self.clock.flexibility()
                );
                return RefreshDemand::default();
            }
            RefreshMode::PulledIn if busy => {
                self.clock.end_pull_in();
                return RefreshDemand::default();
            }
            _ => {}
        }

        self.next = Some(if banks.iter().any(BankMachine::is_activated) {
            Command::Preab
        } else {
            Command::Refab
        });

        let mut demand = RefreshDemand::interrupt();
        if forced {
            if self.clock.force() {
                log::warn!(
                    "rank {} refresh forced at {now} ps after {} postponements",
                    self.target.rank,
                    self.clock.flexibility()
                );
            }
            demand.forced = Some((Command::Refab, self.target));
        }
        demand
    }

    fn next_command(&self) -> Option<(Command, BankAddress)> {
        self.next.map(|command| (command, self.target))
    }

    fn update(&mut self, command: Command, target: BankAddress, now: Time) {
        if target.rank != self.target.rank {
            return;
        }
        match command {
            Command::Refab => self.clock.refreshed(now),
            c if c.is_power_down_entry() || c.is_power_down_exit() => self.clock.power_command(c),
            _ => {}
        }
        self.next = None;
    }

    fn clock(&self) -> &RefreshClock {
        &self.clock
    }
}
