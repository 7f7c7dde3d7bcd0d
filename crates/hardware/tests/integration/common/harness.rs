//! Controller test harness.
//!
//! Drives a [`Controller`] the way the simulator does (submit at arrival,
//! step when asked, collect completions) but exposes the controller between
//! steps so tests can check invariants as the run progresses.

use std::collections::VecDeque;
use std::sync::Arc;

use dramctl::config::{MemSpecConfig, PowerDownPolicy, RefreshPolicy};
use dramctl::controller::checker::TimingChecker;
use dramctl::memspec::presets;
use dramctl::{Command, Completion, Config, Controller, Request, Time};

/// `memspec` clocked at 1 GHz so every timing is a whole number of
/// nanoseconds.
fn config_at_1ghz(memspec: MemSpecConfig, refresh: RefreshPolicy, power: PowerDownPolicy) -> Config {
    let mut config = Config::with_memspec(memspec);
    config.memspec.memtimingspec.set("clkMhz", 1000.0);
    config.mcconfig.refresh_policy = refresh;
    config.mcconfig.power_down_policy = power;
    config.simconfig.record_commands = true;
    config
}

/// DDR4-2400 geometry at 1 GHz.
pub fn ddr4_config(refresh: RefreshPolicy, power: PowerDownPolicy) -> Config {
    config_at_1ghz(presets::ddr4_2400(), refresh, power)
}

/// LPDDR4-3200 geometry at 1 GHz: eight banks, per-bank refresh available.
pub fn lpddr4_config(refresh: RefreshPolicy, power: PowerDownPolicy) -> Config {
    config_at_1ghz(presets::lpddr4_3200(), refresh, power)
}

pub struct TestHarness {
    pub controller: Controller,
    pub now: Time,
    pub completions: Vec<Completion>,
    pending: VecDeque<Request>,
    next_id: u64,
}

impl TestHarness {
    /// Builds the harness. Controller logs reach the test output when
    /// `RUST_LOG` is set, e.g. `RUST_LOG=dramctl=debug`.
    pub fn new(mut config: Config) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        config.simconfig.record_commands = true;
        Self {
            controller: Controller::new(&config).expect("valid configuration"),
            now: 0,
            completions: Vec::new(),
            pending: VecDeque::new(),
            next_id: 0,
        }
    }

    pub fn ddr4(refresh: RefreshPolicy, power: PowerDownPolicy) -> Self {
        Self::new(ddr4_config(refresh, power))
    }

    /// Queues a read; it is submitted when simulated time reaches `arrival`.
    pub fn read(&mut self, bank: usize, row: u32, column: u32, arrival: Time) -> u64 {
        self.push(Request::read(0, 0, bank, row, column, arrival))
    }

    pub fn write(&mut self, bank: usize, row: u32, column: u32, arrival: Time) -> u64 {
        self.push(Request::write(0, 0, bank, row, column, arrival))
    }

    /// Queues `request` under the next free id. Requests must be pushed in
    /// arrival order.
    pub fn push(&mut self, request: Request) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.push_back(Request { id, ..request });
        id
    }

    /// Runs one step at `now` and moves to the next event. Returns `false`
    /// when there is none at or before `limit`.
    fn advance(&mut self, limit: Time, observe: &mut dyn FnMut(&Controller)) -> bool {
        while self.pending.front().is_some_and(|r| r.arrival <= self.now) {
            if let Some(request) = self.pending.pop_front() {
                self.controller.submit(request).expect("request accepted");
            }
        }
        let step = self.controller.step(self.now).expect("legal schedule");
        self.completions
            .extend(self.controller.drain_completions(self.now));
        observe(&self.controller);

        let next = [
            step.next_trigger,
            self.controller.next_completion_time(),
            self.pending.front().map(|r| r.arrival),
        ]
        .into_iter()
        .flatten()
        .min();
        match next {
            Some(t) if t <= limit => {
                self.now = t.max(self.now);
                true
            }
            _ => false,
        }
    }

    /// Steps until every queued request has completed, or `limit`.
    pub fn run_until_drained(&mut self, limit: Time) {
        while !(self.pending.is_empty() && self.controller.is_drained()) {
            if !self.advance(limit, &mut |_| {}) {
                break;
            }
        }
    }

    /// Steps until simulated time would pass `limit`, calling `observe`
    /// after every step.
    pub fn run_until_with(&mut self, limit: Time, mut observe: impl FnMut(&Controller)) {
        while self.advance(limit, &mut observe) {}
    }

    pub fn run_until(&mut self, limit: Time) {
        self.run_until_with(limit, |_| {});
    }

    /// Issue times of every `command`.
    pub fn issued(&self, command: Command) -> Vec<Time> {
        self.controller
            .commands()
            .iter()
            .filter(|c| c.command == command)
            .map(|c| c.time)
            .collect()
    }

    pub fn latency_of(&self, id: u64) -> Option<Time> {
        self.completions
            .iter()
            .find(|c| c.id == id)
            .map(Completion::latency)
    }

    /// Replays the recorded trace through a fresh checker, which never
    /// evicts history, and panics on the first command issued early.
    pub fn assert_trace_is_legal(&self) {
        let mut checker = TimingChecker::new(Arc::clone(self.controller.memspec()));
        let mut last = 0;
        for issued in self.controller.commands() {
            assert!(
                issued.time >= last,
                "{issued} issued before the previous command at {last} ps"
            );
            let earliest = checker.earliest(issued.command, issued.target);
            assert!(
                checker.is_legal(issued.command, issued.target, issued.time),
                "{issued} is illegal, earliest {earliest} ps"
            );
            checker.insert(issued.command, issued.target, issued.time);
            last = issued.time;
        }
    }
}
