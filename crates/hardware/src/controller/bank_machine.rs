//! Per-bank state machine.
//!
//! A [`BankMachine`] owns the request queue and row-buffer state of one bank.
//! On every evaluation it picks a request according to the scheduler policy
//! and proposes the single command that moves that request forward:
//!
//! - row hit → RD / WR (RDA / WRA when the page policy closes the row);
//! - another row open → PREPB;
//! - no row open → ACT.
//!
//! Refresh and power-down are driven from outside: the controller blocks a
//! bank for a forced refresh and reports rank-level commands through
//! [`BankMachine::observe`]. A blocked, refreshing or powered-down bank
//! proposes nothing.

use std::collections::VecDeque;

use serde::Serialize;

use crate::common::{BankAddress, Command, Direction, Request, Time};
use crate::config::{PagePolicy, SchedulerPolicy};
use crate::memspec::MemSpec;

/// Externally visible phase of a bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BankPhase {
    Idle,
    Activating,
    Active,
    Precharging,
    Refreshing,
    PoweredDown,
}

/// Row-buffer record of a bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankState {
    pub phase: BankPhase,
    pub open_row: Option<u32>,
    /// End of the current timed phase (Activating, Precharging, Refreshing).
    pub phase_end: Time,
    pub last_activate: Option<Time>,
}

impl Default for BankState {
    fn default() -> Self {
        Self {
            phase: BankPhase::Idle,
            open_row: None,
            phase_end: 0,
            last_activate: None,
        }
    }
}

#[derive(Debug, Clone)]
struct Queued {
    request: Request,
    /// Controller-wide admission order.
    seq: u64,
    bursts_left: u32,
    /// The request needed its own ACT.
    activated: bool,
}

/// Command a bank machine wants to issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proposal {
    pub command: Command,
    pub target: BankAddress,
    /// Admission order of the request being served.
    pub seq: u64,
}

/// A request whose last burst was just issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub request: Request,
    pub row_hit: bool,
}

pub struct BankMachine {
    address: BankAddress,
    page_policy: PagePolicy,
    scheduler: SchedulerPolicy,
    capacity: usize,
    bytes_per_burst: u32,
    state: BankState,
    queue: VecDeque<Queued>,
    selected: Option<usize>,
    next: Option<Command>,
    blocked: bool,
    sleeping: bool,
    wake_at: Option<Time>,
}

impl BankMachine {
    pub fn new(
        address: BankAddress,
        page_policy: PagePolicy,
        scheduler: SchedulerPolicy,
        capacity: usize,
        bytes_per_burst: u32,
    ) -> Self {
        Self {
            address,
            page_policy,
            scheduler,
            capacity,
            bytes_per_burst,
            state: BankState::default(),
            queue: VecDeque::with_capacity(capacity),
            selected: None,
            next: None,
            blocked: false,
            sleeping: false,
            wake_at: None,
        }
    }

    pub fn address(&self) -> BankAddress {
        self.address
    }

    /// Phase as of the last evaluation or command.
    pub fn phase(&self) -> BankPhase {
        if self.sleeping {
            BankPhase::PoweredDown
        } else if self.blocked {
            BankPhase::Refreshing
        } else {
            self.state.phase
        }
    }

    pub fn state(&self) -> &BankState {
        &self.state
    }

    pub fn open_row(&self) -> Option<u32> {
        self.state.open_row
    }

    /// No request is waiting in this bank.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// A row is open or opening.
    pub fn is_activated(&self) -> bool {
        self.state.open_row.is_some()
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn has_capacity(&self) -> bool {
        self.queue.len() < self.capacity
    }

    /// Queues a request. The caller checks [`has_capacity`](Self::has_capacity).
    pub fn enqueue(&mut self, request: Request, seq: u64) {
        debug_assert!(self.has_capacity());
        let bursts_left = request.bursts(self.bytes_per_burst);
        self.queue.push_back(Queued {
            request,
            seq,
            bursts_left,
            activated: false,
        });
    }

    /// Withholds proposals until the next refresh of this bank.
    pub fn block(&mut self) {
        self.blocked = true;
        self.next = None;
    }

    /// Recomputes the proposal for `now`.
    pub fn evaluate(&mut self, now: Time) {
        self.next = None;
        self.selected = None;
        self.wake_at = None;
        self.advance(now);

        if self.sleeping || self.blocked || self.queue.is_empty() {
            return;
        }
        if self.state.phase == BankPhase::Refreshing {
            self.wake_at = Some(self.state.phase_end);
            return;
        }

        let idx = self.select();
        let row = self.queue[idx].request.row;
        self.selected = Some(idx);
        self.next = Some(match self.state.open_row {
            Some(open) if open == row => self.column_command(idx),
            Some(_) => Command::Prepb,
            None => Command::Act,
        });
    }

    /// Current proposal, if any.
    pub fn proposal(&self) -> Option<Proposal> {
        let command = self.next?;
        let idx = self.selected?;
        Some(Proposal {
            command,
            target: self.address,
            seq: self.queue[idx].seq,
        })
    }

    /// Time a pending refresh phase ends and the bank can propose again.
    pub fn wake_time(&self) -> Option<Time> {
        self.wake_at
    }

    /// Applies the bank's own proposal, issued at `now`. Returns the request
    /// when its last burst went out.
    pub fn issue(&mut self, now: Time, memspec: &MemSpec) -> Option<Served> {
        let command = self.next.take()?;
        let idx = self.selected.take()?;
        match command {
            Command::Act => {
                let entry = &mut self.queue[idx];
                entry.activated = true;
                let row = entry.request.row;
                self.open(row, now, memspec);
                None
            }
            Command::Prepb => {
                self.close(now, memspec.execution_time(Command::Prepb));
                None
            }
            cas if cas.is_cas() => {
                let entry = &mut self.queue[idx];
                entry.bursts_left = entry.bursts_left.saturating_sub(1);
                let finished = entry.bursts_left == 0;
                if cas.is_auto_precharge() {
                    self.close(now, memspec.execution_time(cas));
                }
                if !finished {
                    return None;
                }
                self.queue.remove(idx).map(|done| Served {
                    row_hit: !done.activated,
                    request: done.request,
                })
            }
            other => {
                self.observe(other, now, memspec);
                None
            }
        }
    }

    /// Applies a command issued on this bank's behalf by a refresh or
    /// power-down manager.
    pub fn observe(&mut self, command: Command, now: Time, memspec: &MemSpec) {
        self.next = None;
        self.selected = None;
        match command {
            Command::Prepb | Command::Preab | Command::Presb => {
                if self.state.open_row.is_some() {
                    self.close(now, memspec.execution_time(command));
                }
            }
            Command::Refab | Command::Refpb | Command::Refp2b | Command::Refsb => {
                self.blocked = false;
                self.state.phase = BankPhase::Refreshing;
                self.state.phase_end = now + memspec.execution_time(command);
            }
            Command::Pdea | Command::Pdep | Command::Srefen => {
                self.sleeping = true;
            }
            Command::Pdxa | Command::Pdxp | Command::Srefex => {
                self.sleeping = false;
            }
            Command::Act | Command::Rd | Command::Wr | Command::Rda | Command::Wra => {}
        }
    }

    fn advance(&mut self, now: Time) {
        let s = &mut self.state;
        if now < s.phase_end {
            return;
        }
        s.phase = match s.phase {
            BankPhase::Activating => BankPhase::Active,
            BankPhase::Precharging | BankPhase::Refreshing => BankPhase::Idle,
            other => other,
        };
    }

    fn open(&mut self, row: u32, now: Time, memspec: &MemSpec) {
        self.state.open_row = Some(row);
        self.state.phase = BankPhase::Activating;
        self.state.phase_end = now + memspec.execution_time(Command::Act);
        self.state.last_activate = Some(now);
    }

    fn close(&mut self, now: Time, duration: Time) {
        self.state.open_row = None;
        self.state.phase = BankPhase::Precharging;
        self.state.phase_end = now + duration;
    }

    /// Index of the request to serve next. The queue is non-empty.
    fn select(&self) -> usize {
        // A request with bursts already issued keeps the bank.
        if let Some(idx) = self.queue.iter().position(|q| {
            q.bursts_left < q.request.bursts(self.bytes_per_burst)
                && Some(q.request.row) == self.state.open_row
        }) {
            return idx;
        }
        match (self.scheduler, self.state.open_row) {
            (SchedulerPolicy::FrFcfs, Some(open)) => self
                .queue
                .iter()
                .position(|q| q.request.row == open)
                .unwrap_or(0),
            _ => 0,
        }
    }

    fn column_command(&self, idx: usize) -> Command {
        let entry = &self.queue[idx];
        let read = entry.request.direction == Direction::Read;
        let close = entry.bursts_left == 1 && self.closes_after(idx);
        match (read, close) {
            (true, false) => Command::Rd,
            (true, true) => Command::Rda,
            (false, false) => Command::Wr,
            (false, true) => Command::Wra,
        }
    }

    fn closes_after(&self, idx: usize) -> bool {
        let row = self.queue[idx].request.row;
        let others = || {
            self.queue
                .iter()
                .enumerate()
                .filter(move |&(i, _)| i != idx)
                .map(|(_, q)| q.request.row)
        };
        let more_hits = others().any(|r| r == row);
        match self.page_policy {
            PagePolicy::Open => false,
            PagePolicy::Closed => true,
            PagePolicy::ClosedAdaptive => !more_hits,
            PagePolicy::OpenAdaptive => !more_hits && others().any(|r| r != row),
        }
    }
}
