//! Discrete-event driver.
//!
//! Owns one [`Controller`] and any number of [`Initiator`]s. Time jumps to
//! the earliest of: a pending request arrival, the controller's requested
//! trigger, the next completion. Requests are submitted at their arrival,
//! the controller is stepped when it asked for it or received new work, and
//! completions are routed back to the initiator that produced them.
//!
//! A run ends when every initiator is finished and the controller has
//! nothing left to serve or report, when `until` is passed, or when no
//! further event exists. Requests not issued by then are dropped.

use std::collections::HashMap;
use std::path::Path;

use super::address::AddressMapper;
use super::generator::RowHammer;
use super::initiator::{Emit, Initiator};
use super::trace::TracePlayer;
use crate::common::{Completion, Request, SimError, Time};
use crate::config::{Config, InitiatorConfig};
use crate::controller::Controller;
use crate::stats::ControllerStats;

enum SlotState {
    /// Needs polling.
    Ready,
    /// Request waiting for its arrival time.
    Holding(Request),
    Blocked,
    Finished,
}

struct Slot {
    initiator: Box<dyn Initiator>,
    state: SlotState,
}

impl Slot {
    fn arrival(&self) -> Option<Time> {
        match &self.state {
            SlotState::Holding(request) => Some(request.arrival),
            _ => None,
        }
    }
}

pub struct Simulator {
    controller: Controller,
    slots: Vec<Slot>,
    /// Initiator of each request still in the controller, by request id.
    owners: HashMap<u64, usize>,
    next_id: u64,
    wakeup: Option<Time>,
    now: Time,
    record_completions: bool,
    completions: Vec<Completion>,
}

impl Simulator {
    pub fn new(controller: Controller) -> Self {
        Self {
            controller,
            slots: Vec::new(),
            owners: HashMap::new(),
            next_id: 0,
            wakeup: Some(0),
            now: 0,
            record_completions: true,
            completions: Vec::new(),
        }
    }

    /// Builds the controller and the `tracesetup` initiators. Trace paths
    /// are resolved against `base_dir`.
    pub fn from_config(config: &Config, base_dir: &Path) -> Result<Self, SimError> {
        let controller = Controller::new(config)?;
        let mapper = AddressMapper::new(controller.memspec())?;
        let mut sim = Self::new(controller);
        sim.set_record_completions(config.simconfig.record_completions);
        for setup in &config.tracesetup {
            let initiator: Box<dyn Initiator> = match setup {
                InitiatorConfig::TracePlayer(player) => Box::new(TracePlayer::open(
                    &base_dir.join(&player.name),
                    player.clk_mhz,
                    mapper,
                )?),
                InitiatorConfig::RowHammer(hammer) => Box::new(RowHammer::new(hammer, mapper)?),
            };
            sim.add_initiator(initiator);
        }
        Ok(sim)
    }

    pub fn add_initiator(&mut self, initiator: Box<dyn Initiator>) {
        log::info!(
            "initiator {}: {} request(s)",
            initiator.name(),
            initiator
                .total_requests()
                .map_or_else(|| "unknown".to_string(), |n| n.to_string())
        );
        self.slots.push(Slot {
            initiator,
            state: SlotState::Ready,
        });
    }

    /// With recording off, completions are routed to their initiators and
    /// then dropped.
    pub fn set_record_completions(&mut self, record: bool) {
        self.record_completions = record;
        if !record {
            self.completions = Vec::new();
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn now(&self) -> Time {
        self.now
    }

    /// Completions reported so far, in finish order, when recording is on.
    /// Ids are the simulator-assigned request ids.
    pub fn completions(&self) -> &[Completion] {
        &self.completions
    }

    pub fn stats(&self) -> ControllerStats {
        self.controller.stats()
    }

    /// Requests produced by the initiators, when every one of them knows.
    pub fn total_requests(&self) -> Option<u64> {
        self.slots.iter().map(|s| s.initiator.total_requests()).sum()
    }

    pub fn is_finished(&self) -> bool {
        self.slots
            .iter()
            .all(|s| matches!(s.state, SlotState::Finished))
            && self.controller.is_drained()
    }

    /// Runs until the traffic is served, or until simulated time would pass
    /// `until`.
    pub fn run(&mut self, until: Option<Time>) -> Result<(), SimError> {
        loop {
            self.poll_initiators()?;
            if self.is_finished() {
                break;
            }
            let Some(now) = self
                .slots
                .iter()
                .filter_map(Slot::arrival)
                .chain(self.wakeup)
                .chain(self.controller.next_completion_time())
                .min()
            else {
                log::warn!("no further events at {} ps with work outstanding", self.now);
                break;
            };
            if until.is_some_and(|limit| now > limit) {
                break;
            }
            self.now = now;

            let submitted = self.deliver(now)?;
            if submitted || self.wakeup.is_some_and(|t| t <= now) {
                self.wakeup = self.controller.step(now)?.next_trigger;
            }
            for completion in self.controller.drain_completions(now) {
                self.route(completion);
            }
        }
        Ok(())
    }

    fn poll_initiators(&mut self) -> Result<(), SimError> {
        for slot in &mut self.slots {
            if !matches!(slot.state, SlotState::Ready) {
                continue;
            }
            slot.state = match slot.initiator.poll(self.now)? {
                Emit::Request(request) => SlotState::Holding(Request {
                    arrival: request.arrival.max(self.now),
                    ..request
                }),
                Emit::Blocked => SlotState::Blocked,
                Emit::Finished => SlotState::Finished,
            };
        }
        Ok(())
    }

    /// Submits every request due by `now`, re-polling initiators that may
    /// have more at the same time.
    fn deliver(&mut self, now: Time) -> Result<bool, SimError> {
        let mut submitted = false;
        loop {
            let mut any = false;
            for (index, slot) in self.slots.iter_mut().enumerate() {
                if slot.arrival().is_none_or(|arrival| arrival > now) {
                    continue;
                }
                let SlotState::Holding(request) = std::mem::replace(&mut slot.state, SlotState::Ready) else {
                    continue;
                };
                let id = self.next_id;
                self.next_id += 1;
                self.owners.insert(id, index);
                self.controller.submit(Request { id, ..request })?;
                any = true;
            }
            if !any {
                return Ok(submitted);
            }
            submitted = true;
            self.poll_initiators()?;
        }
    }

    fn route(&mut self, completion: Completion) {
        if let Some(slot) = self
            .owners
            .remove(&completion.id)
            .and_then(|index| self.slots.get_mut(index))
        {
            slot.initiator.completed(&completion);
            if matches!(slot.state, SlotState::Blocked) {
                slot.state = SlotState::Ready;
            }
        }
        if self.record_completions {
            self.completions.push(completion);
        }
    }
}
