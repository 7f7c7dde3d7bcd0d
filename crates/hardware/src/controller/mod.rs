//! Per-channel memory controller.
//!
//! The [`Controller`] owns every scheduling component of one channel: a
//! [`BankMachine`] per bank, a [`RefreshManager`] and a [`PowerDownManager`]
//! per rank, the [`TimingChecker`] and the [`Arbiter`]. It is driven from
//! outside: the caller submits requests and calls [`Controller::step`] at the
//! times the controller asks for.
//!
//! One step at time `now` runs, in order:
//!
//! 1. arrival of submitted requests whose time has come (the first one
//!    wakes a powered-down rank), then admission into bank queues with free
//!    slots;
//! 2. refresh evaluation, forwarding refresh interruptions to the power-down
//!    manager and blocking banks for a forced refresh, then power-down
//!    evaluation and bank evaluation;
//! 3. candidate collection per rank: the power-down command, else the refresh
//!    command, else every bank proposal;
//! 4. arbitration among candidates legal at `now`;
//! 5. re-validation of the winner against the timing checker;
//! 6. issue: history insert, component updates, completion bookkeeping;
//! 7. next trigger time.

pub mod arbiter;
pub mod bank_machine;
pub mod checker;
pub mod power_down;
pub mod refresh;

use std::cmp::Ordering;
use std::collections::binary_heap::PeekMut;
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use self::arbiter::{Arbiter, Candidate, Source};
use self::bank_machine::{BankMachine, Served};
use self::checker::TimingChecker;
use self::power_down::PowerDownManager;
use self::refresh::RefreshManager;
use crate::common::{BankAddress, Command, Completion, ConfigError, Request, SimError, Time};
use crate::config::{Config, McConfig};
use crate::memspec::MemSpec;
use crate::stats::ControllerStats;

/// One entry of the command trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IssuedCommand {
    pub time: Time,
    pub command: Command,
    pub target: BankAddress,
}

impl fmt::Display for IssuedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>14} ps  {:<6} {}", self.time, self.command, self.target)
    }
}

/// Outcome of one [`Controller::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub issued: Option<IssuedCommand>,
    /// Next time the controller wants to be stepped. `None` when nothing
    /// can happen until a new request arrives.
    pub next_trigger: Option<Time>,
}

/// Heap entry ordering completions earliest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending(Completion);

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.0.finish, other.0.id).cmp(&(self.0.finish, self.0.id))
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct Controller {
    memspec: Arc<MemSpec>,
    config: McConfig,
    checker: TimingChecker,
    /// Flat over the channel: rank-major, then bank within rank.
    banks: Vec<BankMachine>,
    refresh: Vec<RefreshManager>,
    power: Vec<PowerDownManager>,
    arbiter: Arbiter,
    /// Submitted requests whose arrival time has not been reached, with
    /// their admission sequence number.
    arriving: VecDeque<(Request, u64)>,
    /// Arrived requests waiting for room in their bank queue.
    admission: VecDeque<(Request, u64)>,
    /// Arrived requests not yet served, per rank.
    outstanding: Vec<usize>,
    next_seq: u64,
    now: Time,
    completions: BinaryHeap<Pending>,
    trace: Option<Vec<IssuedCommand>>,
    stats: ControllerStats,
}

impl Controller {
    /// Builds the controller described by `config`.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from the device description or the controller
    /// policies, e.g. a refresh granularity the device does not support.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let memspec = Arc::new(MemSpec::from_config(&config.memspec)?);
        let record = config.simconfig.record_commands || cfg!(feature = "always-trace");
        Self::with_memspec(memspec, &config.mcconfig, record)
    }

    /// Builds a controller around an already validated device.
    pub fn with_memspec(
        memspec: Arc<MemSpec>,
        config: &McConfig,
        record_commands: bool,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let g = memspec.geometry;
        let banks = (0..g.ranks)
            .flat_map(|rank| (0..g.banks_per_rank).map(move |bank| g.bank_address(rank, bank)))
            .map(|address| {
                BankMachine::new(
                    address,
                    config.page_policy,
                    config.scheduler,
                    config.request_buffer_size,
                    memspec.bytes_per_burst(),
                )
            })
            .collect();
        let refresh = (0..g.ranks)
            .map(|rank| RefreshManager::new(rank, &memspec, config))
            .collect::<Result<Vec<_>, _>>()?;
        let power = (0..g.ranks)
            .map(|rank| {
                let mut manager = PowerDownManager::new(g.rank_address(rank), &memspec, config);
                manager.trigger_entry(0);
                manager
            })
            .collect();

        log::info!(
            "controller: {:?} pages, {:?} scheduler, {:?} arbiter, {:?} refresh, {:?} power-down",
            config.page_policy,
            config.scheduler,
            config.arbiter,
            config.refresh_policy,
            config.power_down_policy
        );

        Ok(Self {
            checker: TimingChecker::new(Arc::clone(&memspec)),
            arbiter: Arbiter::new(config.arbiter, g.total_banks()),
            config: config.clone(),
            banks,
            refresh,
            power,
            arriving: VecDeque::new(),
            admission: VecDeque::new(),
            outstanding: vec![0; g.ranks],
            next_seq: 0,
            now: 0,
            completions: BinaryHeap::new(),
            trace: record_commands.then(Vec::new),
            stats: ControllerStats::default(),
            memspec,
        })
    }

    pub fn memspec(&self) -> &Arc<MemSpec> {
        &self.memspec
    }

    pub fn config(&self) -> &McConfig {
        &self.config
    }

    pub fn checker(&self) -> &TimingChecker {
        &self.checker
    }

    /// Bank machines, rank-major.
    pub fn banks(&self) -> &[BankMachine] {
        &self.banks
    }

    pub fn refresh_manager(&self, rank: usize) -> &RefreshManager {
        &self.refresh[rank]
    }

    pub fn power_manager(&self, rank: usize) -> &PowerDownManager {
        &self.power[rank]
    }

    /// Time of the latest step.
    pub fn now(&self) -> Time {
        self.now
    }

    /// Requests submitted and not yet served, arrived or not.
    pub fn pending_requests(&self) -> usize {
        self.outstanding.iter().sum::<usize>() + self.arriving.len()
    }

    /// Nothing submitted is left to serve or report.
    pub fn is_drained(&self) -> bool {
        self.pending_requests() == 0 && self.completions.is_empty()
    }

    /// Commands issued so far, or an empty slice when recording is off.
    pub fn commands(&self) -> &[IssuedCommand] {
        self.trace.as_deref().unwrap_or_default()
    }

    /// Statistics snapshot including the per-rank manager counters.
    pub fn stats(&self) -> ControllerStats {
        let mut stats = self.stats.clone();
        for manager in &self.refresh {
            stats.add_refresh(manager.counters());
        }
        for manager in &self.power {
            stats.add_power(manager.residency());
        }
        stats
    }

    /// Hands a request to the controller. It is admitted into its bank queue
    /// at the first step at or after its arrival with room in the queue.
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidRequest`] if the coordinates are outside the device,
    /// [`SimError::LateRequest`] if it arrives before the latest step.
    pub fn submit(&mut self, request: Request) -> Result<(), SimError> {
        let g = self.memspec.geometry;
        if request.rank >= g.ranks || request.bank >= g.banks_per_rank || request.row as usize >= g.rows {
            return Err(SimError::InvalidRequest {
                id: request.id,
                rank: request.rank,
                bank: request.bank,
                row: request.row,
            });
        }
        if request.arrival < self.now {
            return Err(SimError::LateRequest {
                id: request.id,
                arrival: request.arrival,
                now: self.now,
            });
        }
        self.arriving.push_back((request, self.next_seq));
        self.next_seq += 1;
        Ok(())
    }

    /// Runs one scheduling step at `now`, issuing at most one command.
    ///
    /// # Errors
    ///
    /// [`SimError::TimingViolation`] if the chosen command fails
    /// re-validation. This is an internal error and ends the run.
    pub fn step(&mut self, now: Time) -> Result<Step, SimError> {
        debug_assert!(now >= self.now, "step at {now} ps after {} ps", self.now);
        self.now = now;
        self.admit(now);
        self.evaluate(now);

        let candidates = self.candidates();
        let issued = match self.arbiter.pick(now, &candidates) {
            Some(winner) => Some(self.issue(now, candidates[winner])?),
            None => None,
        };
        let next_trigger = match issued {
            Some(_) => Some(now + self.memspec.t_ck),
            None => self.next_trigger(now, &candidates),
        };
        log::trace!(
            "step {now} ps: {} candidate(s), next {next_trigger:?}",
            candidates.len()
        );
        Ok(Step {
            issued,
            next_trigger,
        })
    }

    /// Pops every completion finished by `now`, earliest first.
    pub fn drain_completions(&mut self, now: Time) -> Vec<Completion> {
        let mut done = Vec::new();
        while let Some(top) = self.completions.peek_mut() {
            if top.0.finish > now {
                break;
            }
            done.push(PeekMut::pop(top).0);
        }
        done
    }

    pub fn next_completion_time(&self) -> Option<Time> {
        self.completions.peek().map(|p| p.0.finish)
    }

    /// Counts requests that have arrived by `now` against their rank, waking
    /// the rank on its first one.
    fn arrive(&mut self, now: Time) {
        if self.arriving.iter().all(|(request, _)| request.arrival > now) {
            return;
        }
        let mut future = VecDeque::new();
        while let Some((request, seq)) = self.arriving.pop_front() {
            if request.arrival > now {
                future.push_back((request, seq));
                continue;
            }
            let rank = request.rank;
            if self.outstanding[rank] == 0 {
                self.power[rank].trigger_exit();
            }
            self.outstanding[rank] += 1;
            self.admission.push_back((request, seq));
        }
        self.arriving = future;
    }

    /// Moves arrived requests into their bank queues. A request that cannot
    /// enter holds back every later request to the same bank.
    fn admit(&mut self, now: Time) {
        self.arrive(now);
        if self.admission.is_empty() {
            return;
        }
        let g = self.memspec.geometry;
        let mut held = vec![false; self.banks.len()];
        let mut waiting = VecDeque::new();
        while let Some((request, seq)) = self.admission.pop_front() {
            let bank = g.bank_address(request.rank, request.bank).bank;
            if held[bank] || !self.banks[bank].has_capacity() {
                held[bank] = true;
                waiting.push_back((request, seq));
            } else {
                self.banks[bank].enqueue(request, seq);
            }
        }
        self.admission = waiting;
    }

    fn evaluate(&mut self, now: Time) {
        let g = self.memspec.geometry;
        for rank in 0..g.ranks {
            let banks = g.rank_banks(rank);
            let demand = self.refresh[rank].evaluate(now, &self.banks[banks.clone()]);
            if demand.interrupt {
                self.power[rank].trigger_interruption();
            }
            if let Some((command, target)) = demand.forced {
                for bank in g.footprint(command, target) {
                    self.banks[bank].block();
                }
            }
            self.power[rank].evaluate(now, &self.banks[banks.clone()]);
            for bank in &mut self.banks[banks] {
                bank.evaluate(now);
            }
        }
    }

    fn candidates(&self) -> Vec<Candidate> {
        let g = self.memspec.geometry;
        let mut candidates = Vec::new();
        for rank in 0..g.ranks {
            let power = &self.power[rank];
            let manager = power
                .next_command()
                .map(|(command, target)| (command, target, Source::PowerDown, power.floor(command)))
                .or_else(|| {
                    self.refresh[rank]
                        .next_command()
                        .map(|(command, target)| (command, target, Source::Refresh, 0))
                });
            if let Some((command, target, source, floor)) = manager {
                candidates.push(Candidate {
                    command,
                    target,
                    source,
                    seq: None,
                    legal_at: self.checker.earliest(command, target).max(floor),
                });
                continue;
            }
            candidates.extend(
                self.banks[g.rank_banks(rank)]
                    .iter()
                    .filter_map(BankMachine::proposal)
                    .map(|p| Candidate {
                        command: p.command,
                        target: p.target,
                        source: Source::Bank,
                        seq: Some(p.seq),
                        legal_at: self.checker.earliest(p.command, p.target),
                    }),
            );
        }
        candidates
    }

    fn issue(&mut self, now: Time, winner: Candidate) -> Result<IssuedCommand, SimError> {
        let Candidate {
            command,
            target,
            source,
            ..
        } = winner;
        if !self.checker.is_legal(command, target, now) {
            return Err(SimError::TimingViolation {
                command,
                target,
                time: now,
                earliest: self.checker.earliest(command, target),
            });
        }
        self.checker.insert(command, target, now);
        self.checker.retire(now);
        self.arbiter.served(&winner);
        self.stats.record_command(command);

        let rank = target.rank;
        self.refresh[rank].update(command, target, now);
        let idle = self.outstanding[rank] == 0;
        self.power[rank].update(command, now, idle);

        if source == Source::Bank {
            if let Some(served) = self.banks[target.bank].issue(now, &self.memspec) {
                self.complete(now, command, served);
            }
        } else {
            for bank in self.memspec.geometry.footprint(command, target) {
                self.banks[bank].observe(command, now, &self.memspec);
            }
        }

        let issued = IssuedCommand {
            time: now,
            command,
            target,
        };
        log::debug!("{issued}");
        if let Some(trace) = &mut self.trace {
            trace.push(issued);
        }
        Ok(issued)
    }

    fn complete(&mut self, now: Time, command: Command, served: Served) {
        let Served { request, row_hit } = served;
        let finish = now + self.memspec.data_strobe(command).map_or(0, |strobe| strobe.end);
        let completion = Completion {
            id: request.id,
            direction: request.direction,
            arrival: request.arrival,
            finish,
        };
        let per_burst = self.memspec.bytes_per_burst();
        let bytes = u64::from(request.bursts(per_burst)) * u64::from(per_burst);
        self.stats.record_completion(&completion, bytes, row_hit);
        self.completions.push(Pending(completion));

        let rank = request.rank;
        self.outstanding[rank] = self.outstanding[rank].saturating_sub(1);
        if self.outstanding[rank] == 0 {
            self.power[rank].trigger_entry(now);
        }
    }

    fn next_trigger(&self, now: Time, candidates: &[Candidate]) -> Option<Time> {
        let legal = candidates.iter().map(|c| c.legal_at);
        let refresh = self.refresh.iter().filter_map(RefreshManager::time_for_next_trigger);
        let power = self.power.iter().filter_map(PowerDownManager::time_for_next_trigger);
        let wakes = self.banks.iter().filter_map(BankMachine::wake_time);
        let arrivals = self.arriving.iter().map(|(request, _)| request.arrival);
        legal
            .chain(refresh)
            .chain(power)
            .chain(wakes)
            .chain(arrivals)
            .chain(self.next_completion_time())
            .filter(|&t| t > now)
            .min()
    }
}
