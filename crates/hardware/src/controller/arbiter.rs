//! Command arbitration.
//!
//! Picks one command per step among the candidates legal at the current
//! time. Manager commands (refresh, power-down) preempt bank traffic; bank
//! proposals are ordered by the configured policy.

use crate::common::{BankAddress, Command, Time};
use crate::config::ArbitrationPolicy;

/// Who asked for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Source {
    PowerDown,
    Refresh,
    Bank,
}

/// A command competing for the command bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub command: Command,
    pub target: BankAddress,
    pub source: Source,
    /// Admission order of the request served, for bank proposals.
    pub seq: Option<u64>,
    /// Earliest issue time: device constraints plus any manager floor.
    pub legal_at: Time,
}

impl Candidate {
    fn preempts(&self) -> bool {
        self.source != Source::Bank
    }
}

pub struct Arbiter {
    policy: ArbitrationPolicy,
    banks: usize,
    /// Round-robin pointer: the bank served first on the next tie.
    next_bank: usize,
}

impl Arbiter {
    pub fn new(policy: ArbitrationPolicy, banks: usize) -> Self {
        Self {
            policy,
            banks: banks.max(1),
            next_bank: 0,
        }
    }

    /// Index of the winning candidate among those legal at `now`.
    pub fn pick(&self, now: Time, candidates: &[Candidate]) -> Option<usize> {
        candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.legal_at <= now)
            .min_by_key(|(_, c)| {
                let order = match self.policy {
                    ArbitrationPolicy::Oldest => c.seq.unwrap_or(0),
                    ArbitrationPolicy::RoundRobin => {
                        ((c.target.bank + self.banks - self.next_bank) % self.banks) as u64
                    }
                };
                (!c.preempts(), c.source, order, c.target.bank)
            })
            .map(|(i, _)| i)
    }

    /// Moves the round-robin pointer past the bank just served.
    pub fn served(&mut self, candidate: &Candidate) {
        if candidate.source == Source::Bank {
            self.next_bank = (candidate.target.bank + 1) % self.banks;
        }
    }
}
