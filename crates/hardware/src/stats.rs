//! Controller statistics collection and reporting.
//!
//! Command counts, request latency and row-buffer locality are accumulated
//! by the controller as commands issue. Refresh and power-down figures live
//! in the per-rank managers and are folded in when a snapshot is taken.

use serde::Serialize;

use crate::common::time::to_ns;
use crate::common::{Command, Completion, Direction, Time};
use crate::controller::power_down::PowerResidency;
use crate::controller::refresh::RefreshCounters;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ControllerStats {
    /// Issued commands, indexed by [`Command::index`].
    pub commands: [u64; Command::COUNT],

    pub reads: u64,
    pub writes: u64,
    pub bytes: u64,
    pub row_hits: u64,
    pub row_misses: u64,

    pub total_latency: Time,
    pub max_latency: Time,
    /// Finish time of the latest completion.
    pub last_finish: Time,

    pub refresh: RefreshCounters,
    pub power: PowerResidency,
}

impl ControllerStats {
    pub(crate) fn record_command(&mut self, command: Command) {
        self.commands[command.index()] += 1;
    }

    pub(crate) fn record_completion(&mut self, completion: &Completion, bytes: u64, row_hit: bool) {
        match completion.direction {
            Direction::Read => self.reads += 1,
            Direction::Write => self.writes += 1,
        }
        if row_hit {
            self.row_hits += 1;
        } else {
            self.row_misses += 1;
        }
        self.bytes += bytes;
        let latency = completion.latency();
        self.total_latency += latency;
        self.max_latency = self.max_latency.max(latency);
        self.last_finish = self.last_finish.max(completion.finish);
    }

    pub(crate) fn add_refresh(&mut self, counters: RefreshCounters) {
        self.refresh.issued += counters.issued;
        self.refresh.postponed += counters.postponed;
        self.refresh.pulled_in += counters.pulled_in;
        self.refresh.forced += counters.forced;
    }

    pub(crate) fn add_power(&mut self, residency: PowerResidency) {
        self.power.power_down_entries += residency.power_down_entries;
        self.power.self_refresh_entries += residency.self_refresh_entries;
        self.power.power_down_time += residency.power_down_time;
        self.power.self_refresh_time += residency.self_refresh_time;
    }

    pub fn command_count(&self, command: Command) -> u64 {
        self.commands[command.index()]
    }

    pub fn refresh_commands(&self) -> u64 {
        Command::ALL
            .iter()
            .filter(|c| c.is_refresh())
            .map(|&c| self.command_count(c))
            .sum()
    }

    pub fn completed(&self) -> u64 {
        self.reads + self.writes
    }

    /// Mean request latency in nanoseconds.
    pub fn average_latency_ns(&self) -> f64 {
        match self.completed() {
            0 => 0.0,
            n => to_ns(self.total_latency) / n as f64,
        }
    }

    /// Achieved bandwidth over the run in GB/s (bytes per nanosecond).
    pub fn bandwidth_gbps(&self) -> f64 {
        match self.last_finish {
            0 => 0.0,
            t => self.bytes as f64 / to_ns(t),
        }
    }

    pub fn row_hit_rate(&self) -> f64 {
        let total = self.row_hits + self.row_misses;
        if total == 0 {
            0.0
        } else {
            self.row_hits as f64 / total as f64
        }
    }

    /// Prints a formatted summary.
    pub fn print(&self) {
        println!("\n==========================================================");
        println!("DRAM CONTROLLER STATISTICS");
        println!("==========================================================");
        println!("sim_time                 {:.3} ns", to_ns(self.last_finish));
        println!("requests.read            {}", self.reads);
        println!("requests.write           {}", self.writes);
        println!("bytes                    {}", self.bytes);
        println!("bandwidth                {:.3} GB/s", self.bandwidth_gbps());
        println!("latency.avg              {:.3} ns", self.average_latency_ns());
        println!("latency.max              {:.3} ns", to_ns(self.max_latency));
        println!(
            "row_buffer.hits          {} ({:.2}%)",
            self.row_hits,
            self.row_hit_rate() * 100.0
        );
        println!("row_buffer.misses        {}", self.row_misses);
        println!("----------------------------------------------------------");
        println!("COMMANDS");
        for command in Command::ALL {
            let count = self.command_count(command);
            if count > 0 {
                println!("  {:<22} {}", command.name(), count);
            }
        }
        println!("----------------------------------------------------------");
        println!("REFRESH");
        println!("  issued                 {}", self.refresh.issued);
        println!("  postponed              {}", self.refresh.postponed);
        println!("  pulled_in              {}", self.refresh.pulled_in);
        println!("  forced                 {}", self.refresh.forced);
        println!("----------------------------------------------------------");
        println!("POWER");
        println!("  power_down.entries     {}", self.power.power_down_entries);
        println!(
            "  power_down.time        {:.3} ns",
            to_ns(self.power.power_down_time)
        );
        println!("  self_refresh.entries   {}", self.power.self_refresh_entries);
        println!(
            "  self_refresh.time      {:.3} ns",
            to_ns(self.power.self_refresh_time)
        );
        println!("==========================================================");
    }
}
