//! Timing checker.
//!
//! Answers "when is command C legal for target T" from a bounded history of
//! issued commands and the device's [`ConstraintTable`](crate::memspec::ConstraintTable).
//! Queries are side-effect free; only [`TimingChecker::insert`] and
//! [`TimingChecker::retire`] change the history.
//!
//! # Performance
//!
//! - `earliest()`: O(R × F) where R is the number of rules for the command
//!   (a few dozen) and F the size of its footprint (1 for bank commands).
//! - `insert()`: O(F).
//! - `retire()`: O(C × B) with C commands and B banks; runs once per issue.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::common::time::align_up;
use crate::common::{BankAddress, Command, Time, TimeInterval};
use crate::memspec::{MemSpec, Scope};

/// Latest time of every command kind per bank, bank group, rank and channel.
#[derive(Debug, Clone)]
pub struct CommandHistory {
    banks: usize,
    groups: usize,
    ranks: usize,
    per_bank: Vec<Option<Time>>,
    per_group: Vec<Option<Time>>,
    per_rank: Vec<Option<Time>>,
    per_channel: [Option<Time>; Command::COUNT],
    /// Recent ACT times per rank, oldest first.
    activations: Vec<VecDeque<Time>>,
    last_command: Option<(Command, Time)>,
    latest: Time,
}

impl CommandHistory {
    fn new(banks: usize, groups: usize, ranks: usize) -> Self {
        Self {
            banks,
            groups,
            ranks,
            per_bank: vec![None; Command::COUNT * banks],
            per_group: vec![None; Command::COUNT * groups],
            per_rank: vec![None; Command::COUNT * ranks],
            per_channel: [None; Command::COUNT],
            activations: vec![VecDeque::new(); ranks],
            last_command: None,
            latest: 0,
        }
    }

    pub fn bank(&self, command: Command, bank: usize) -> Option<Time> {
        self.per_bank[command.index() * self.banks + bank]
    }

    pub fn group(&self, command: Command, group: usize) -> Option<Time> {
        self.per_group[command.index() * self.groups + group]
    }

    pub fn rank(&self, command: Command, rank: usize) -> Option<Time> {
        self.per_rank[command.index() * self.ranks + rank]
    }

    pub fn channel(&self, command: Command) -> Option<Time> {
        self.per_channel[command.index()]
    }

    /// Number of timestamps still held, for eviction checks.
    pub fn live_entries(&self) -> usize {
        self.per_bank
            .iter()
            .chain(&self.per_group)
            .chain(&self.per_rank)
            .chain(&self.per_channel)
            .filter(|slot| slot.is_some())
            .count()
    }
}

/// Per-channel timing checker.
#[derive(Debug, Clone)]
pub struct TimingChecker {
    memspec: Arc<MemSpec>,
    history: CommandHistory,
}

impl TimingChecker {
    pub fn new(memspec: Arc<MemSpec>) -> Self {
        let g = memspec.geometry;
        let history = CommandHistory::new(g.total_banks(), g.total_bank_groups(), g.ranks);
        Self { memspec, history }
    }

    /// Window in which `command` may be issued to `target`: `[earliest, ∞)`.
    pub fn can_issue(&self, command: Command, target: BankAddress) -> TimeInterval {
        TimeInterval::from(self.earliest(command, target))
    }

    pub fn is_legal(&self, command: Command, target: BankAddress, at: Time) -> bool {
        self.can_issue(command, target).contains(at)
    }

    /// Earliest clock edge at which `command` satisfies every constraint.
    pub fn earliest(&self, command: Command, target: BankAddress) -> Time {
        let spec = &*self.memspec;
        let g = &spec.geometry;
        let h = &self.history;
        let mut earliest: Time = 0;

        for rule in spec.constraints().for_command(command) {
            let prev = rule.previous;
            let last = match rule.scope {
                Scope::Bank => g
                    .footprint(command, target)
                    .filter_map(|bank| h.bank(prev, bank))
                    .max(),
                Scope::BankGroup => g
                    .footprint(command, target)
                    .filter_map(|bank| h.group(prev, g.group_of(bank)))
                    .max(),
                Scope::Rank => h.rank(prev, target.rank),
                Scope::OtherRanks => (0..g.ranks)
                    .filter(|&rank| rank != target.rank)
                    .filter_map(|rank| h.rank(prev, rank))
                    .max(),
                Scope::Channel => h.channel(prev),
            };
            if let Some(time) = last {
                earliest = earliest.max(time + rule.delay);
            }
        }

        if command == Command::Act {
            if let Some(window) = spec.constraints().activation_window() {
                let acts = &h.activations[target.rank];
                if acts.len() >= window.activations {
                    earliest = earliest.max(acts[acts.len() - window.activations] + window.span);
                }
            }
        }

        if let Some((prev, time)) = h.last_command {
            earliest = earliest.max(time + spec.command_length(prev));
        }

        align_up(earliest, spec.t_ck)
    }

    /// Records `command` issued to `target` at `time`.
    ///
    /// Times must be non-decreasing across calls.
    pub fn insert(&mut self, command: Command, target: BankAddress, time: Time) {
        debug_assert!(
            time >= self.history.latest,
            "{command} at {time} ps inserted after {} ps",
            self.history.latest
        );
        let g = self.memspec.geometry;
        let h = &mut self.history;
        let c = command.index();
        for bank in g.footprint(command, target) {
            h.per_bank[c * h.banks + bank] = Some(time);
            h.per_group[c * h.groups + g.group_of(bank)] = Some(time);
        }
        h.per_rank[c * h.ranks + target.rank] = Some(time);
        h.per_channel[c] = Some(time);

        if command == Command::Act {
            if let Some(window) = self.memspec.constraints().activation_window() {
                let acts = &mut h.activations[target.rank];
                acts.push_back(time);
                while acts.len() > window.activations {
                    acts.pop_front();
                }
            }
        }
        h.last_command = Some((command, time));
        h.latest = time;
    }

    /// Drops every entry that can no longer constrain a command at or after
    /// `now`.
    pub fn retire(&mut self, now: Time) {
        let horizon = self.memspec.constraints().horizon();
        let Some(cutoff) = now.checked_sub(horizon) else {
            return;
        };
        let stale = |slot: &mut Option<Time>| {
            if slot.is_some_and(|t| t < cutoff) {
                *slot = None;
            }
        };
        let h = &mut self.history;
        h.per_bank.iter_mut().for_each(stale);
        h.per_group.iter_mut().for_each(stale);
        h.per_rank.iter_mut().for_each(stale);
        h.per_channel.iter_mut().for_each(stale);
        for acts in &mut h.activations {
            while acts.front().is_some_and(|&t| t < cutoff) {
                acts.pop_front();
            }
        }
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn memspec(&self) -> &Arc<MemSpec> {
        &self.memspec
    }
}
