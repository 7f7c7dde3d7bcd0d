//! Device description.
//!
//! A [`MemSpec`] is built once from a [`MemSpecConfig`], validated, and then
//! shared read-only (`Arc<MemSpec>`) by every controller component. Each
//! supported memory type lives in its own module and maps its JEDEC parameter
//! names onto the common [`TimingParams`]; the constraint table the timing
//! checker consults is derived from those in [`constraints`].
//!
//! # Supported types
//!
//! DDR4, DDR5, LPDDR4, LPDDR5, HBM2 and Wide I/O. Other JEDEC types parse but
//! are rejected with [`ConfigError::UnsupportedMemoryType`].

pub mod constraints;
pub mod presets;

mod ddr4;
mod ddr5;
mod hbm2;
mod lpddr4;
mod lpddr5;
mod reader;
mod wideio;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use constraints::{ActivationWindow, Constraint, ConstraintTable, Scope};

use crate::common::{BankAddress, Command, ConfigError, Footprint, Time, TimeInterval};
use crate::config::{MemSpecConfig, RefreshPolicy};
use reader::SpecReader;

/// JEDEC memory standard of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemoryType {
    Ddr3,
    Ddr4,
    Ddr5,
    Lpddr4,
    Lpddr5,
    #[serde(rename = "WIDEIO_SDR", alias = "WIDEIO")]
    WideIo,
    #[serde(rename = "WIDEIO2")]
    WideIo2,
    Gddr5,
    Gddr5x,
    Gddr6,
    Hbm2,
    Hbm3,
    #[serde(rename = "STT-MRAM")]
    SttMram,
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MemoryType::Ddr3 => "DDR3",
            MemoryType::Ddr4 => "DDR4",
            MemoryType::Ddr5 => "DDR5",
            MemoryType::Lpddr4 => "LPDDR4",
            MemoryType::Lpddr5 => "LPDDR5",
            MemoryType::WideIo => "WIDEIO_SDR",
            MemoryType::WideIo2 => "WIDEIO2",
            MemoryType::Gddr5 => "GDDR5",
            MemoryType::Gddr5x => "GDDR5X",
            MemoryType::Gddr6 => "GDDR6",
            MemoryType::Hbm2 => "HBM2",
            MemoryType::Hbm3 => "HBM3",
            MemoryType::SttMram => "STT-MRAM",
        };
        f.write_str(name)
    }
}

/// Organisation of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Geometry {
    pub ranks: usize,
    pub bank_groups_per_rank: usize,
    pub banks_per_rank: usize,
    pub rows: usize,
    pub columns: usize,
    /// Data pins per device.
    pub device_width: usize,
    pub devices_per_rank: usize,
    pub burst_length: usize,
    /// Data beats per clock.
    pub data_rate: usize,
}

impl Geometry {
    pub fn banks_per_group(&self) -> usize {
        self.banks_per_rank / self.bank_groups_per_rank
    }

    pub fn total_banks(&self) -> usize {
        self.banks_per_rank * self.ranks
    }

    pub fn total_bank_groups(&self) -> usize {
        self.bank_groups_per_rank * self.ranks
    }

    /// Channel-wide address of `bank` (index within `rank`).
    pub fn bank_address(&self, rank: usize, bank: usize) -> BankAddress {
        let flat = rank * self.banks_per_rank + bank;
        BankAddress {
            rank,
            bank_group: self.group_of(flat),
            bank: flat,
        }
    }

    /// Address used for rank-level commands: the first bank of the rank.
    pub fn rank_address(&self, rank: usize) -> BankAddress {
        self.bank_address(rank, 0)
    }

    /// Flat bank group of a flat bank index.
    pub fn group_of(&self, flat_bank: usize) -> usize {
        flat_bank / self.banks_per_group()
    }

    /// Flat bank indices of `rank`.
    pub fn rank_banks(&self, rank: usize) -> std::ops::Range<usize> {
        let first = rank * self.banks_per_rank;
        first..first + self.banks_per_rank
    }

    /// Banks `command` acts on when targeted at `target`.
    pub fn footprint(&self, command: Command, target: BankAddress) -> BankSpan {
        let first = target.rank * self.banks_per_rank;
        let in_rank = target.bank - first;
        match command.footprint() {
            Footprint::Bank => BankSpan::new(target.bank, 1, 1),
            Footprint::Rank => BankSpan::new(first, self.banks_per_rank, 1),
            Footprint::SameBank => {
                let per_group = self.banks_per_group();
                BankSpan::new(
                    first + in_rank % per_group,
                    self.bank_groups_per_rank,
                    per_group,
                )
            }
            Footprint::BankPair => {
                let half = (self.banks_per_rank / 2).max(1);
                let count = if self.banks_per_rank >= 2 { 2 } else { 1 };
                BankSpan::new(first + in_rank % half, count, half)
            }
        }
    }

    /// Bytes moved by one burst across all devices of a rank.
    pub fn bytes_per_burst(&self) -> u32 {
        (self.burst_length * self.device_width * self.devices_per_rank / 8) as u32
    }

    /// Capacity of the channel.
    pub fn memory_size_bytes(&self) -> u64 {
        let device_bits = self.banks_per_rank as u64
            * self.rows as u64
            * self.columns as u64
            * self.device_width as u64;
        device_bits / 8 * self.devices_per_rank as u64 * self.ranks as u64
    }
}

/// Arithmetic progression of flat bank indices produced by
/// [`Geometry::footprint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankSpan {
    next: usize,
    remaining: usize,
    step: usize,
}

impl BankSpan {
    fn new(first: usize, count: usize, step: usize) -> Self {
        Self {
            next: first,
            remaining: count,
            step,
        }
    }
}

impl Iterator for BankSpan {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let bank = self.next;
        self.remaining -= 1;
        self.next += self.step;
        Some(bank)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for BankSpan {}

/// Refresh cadence of one granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshTiming {
    /// Average time between two refresh commands of this granularity.
    pub interval: Time,
    /// Time the refreshed banks are busy (tRFC of the granularity).
    pub cycle: Time,
}

/// Refresh granularities a device supports. All-bank refresh is mandatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshModes {
    pub all_bank: RefreshTiming,
    pub per_bank: Option<RefreshTiming>,
    pub same_bank: Option<RefreshTiming>,
    pub per_two_bank: Option<RefreshTiming>,
    /// Minimum spacing between two partial refreshes of the same rank.
    pub partial_to_partial: Option<Time>,
    /// Minimum spacing between a partial refresh and an ACT to another bank.
    pub partial_to_activate: Option<Time>,
}

impl RefreshModes {
    pub fn all_bank(interval: Time, cycle: Time) -> Self {
        Self {
            all_bank: RefreshTiming { interval, cycle },
            per_bank: None,
            same_bank: None,
            per_two_bank: None,
            partial_to_partial: None,
            partial_to_activate: None,
        }
    }
}

/// Device timing in picoseconds.
///
/// Devices without bank groups use the same value for the `_s` and `_l`
/// variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimingParams {
    pub rcd_rd: Time,
    pub rcd_wr: Time,
    pub rp_pb: Time,
    pub rp_ab: Time,
    pub ras: Time,
    pub rc: Time,
    pub rl: Time,
    pub wl: Time,
    pub dqsck: Time,
    /// Duration of one data burst on the bus.
    pub burst: Time,
    pub rtp: Time,
    pub wr: Time,
    pub wtr_s: Time,
    pub wtr_l: Time,
    pub ccd_s: Time,
    pub ccd_l: Time,
    pub rrd_s: Time,
    pub rrd_l: Time,
    /// Rank-to-rank switch on the data bus.
    pub rtrs: Time,
    /// Explicit read-to-write turnaround; derived from latencies when absent.
    pub rtw: Option<Time>,
    /// Precharge-to-precharge spacing within a rank.
    pub ppd: Option<Time>,
    pub xp: Time,
    pub xs: Time,
    /// Minimum power-down duration (tCKE / tPD).
    pub pd: Time,
    /// Minimum self-refresh duration.
    pub ckesr: Time,
    pub actpden: Time,
    pub prpden: Time,
    pub refpden: Time,
    pub act_window: Option<ActivationWindow>,
    pub refresh: RefreshModes,
}

/// Validated, immutable device description.
#[derive(Debug, Clone)]
pub struct MemSpec {
    pub memory_id: String,
    pub memory_type: MemoryType,
    pub geometry: Geometry,
    /// Clock period.
    pub t_ck: Time,
    pub timing: TimingParams,
    command_cycles: [u64; Command::COUNT],
    constraints: ConstraintTable,
}

impl MemSpec {
    /// Builds and validates the description of a supported device.
    pub fn from_config(config: &MemSpecConfig) -> Result<Self, ConfigError> {
        let reader = SpecReader::new(config)?;
        let spec = match config.memory_type {
            MemoryType::Ddr4 => ddr4::build(&reader)?,
            MemoryType::Ddr5 => ddr5::build(&reader)?,
            MemoryType::Lpddr4 => lpddr4::build(&reader)?,
            MemoryType::Lpddr5 => lpddr5::build(&reader)?,
            MemoryType::Hbm2 => hbm2::build(&reader)?,
            MemoryType::WideIo => wideio::build(&reader)?,
            other => return Err(ConfigError::UnsupportedMemoryType(other.to_string())),
        };
        log::info!(
            "memspec {} ({}): {} rank(s) x {} banks in {} group(s), tCK {} ps, {} MiB",
            spec.memory_id,
            spec.memory_type,
            spec.geometry.ranks,
            spec.geometry.banks_per_rank,
            spec.geometry.bank_groups_per_rank,
            spec.t_ck,
            spec.memory_size_bytes() >> 20
        );
        Ok(spec)
    }

    /// Final step of every per-type builder: derives the constraint table
    /// and validates the result.
    fn assemble(
        reader: &SpecReader<'_>,
        memory_type: MemoryType,
        geometry: Geometry,
        timing: TimingParams,
        command_cycles: &[(Command, u64)],
    ) -> Result<Self, ConfigError> {
        if geometry.banks_per_rank % geometry.bank_groups_per_rank != 0 {
            return Err(reader.invalid(
                "nbrOfBanks",
                "banks per rank must be a multiple of the bank group count",
            ));
        }
        let mut cycles = [1u64; Command::COUNT];
        for &(command, length) in command_cycles {
            cycles[command.index()] = length;
        }
        let t_ck = reader.t_ck();
        let constraints = constraints::build(&timing, t_ck, &cycles);
        let spec = Self {
            memory_id: reader.memory_id().to_string(),
            memory_type,
            geometry,
            t_ck,
            timing,
            command_cycles: cycles,
            constraints,
        };
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timing;
        let inconsistent = |reason: String| ConfigError::InconsistentTiming {
            spec: self.memory_id.clone(),
            reason,
        };
        if t.rc < t.ras {
            return Err(inconsistent(format!(
                "tRC ({} ps) is shorter than tRAS ({} ps)",
                t.rc, t.ras
            )));
        }
        if t.ras < t.rcd_rd.min(t.rcd_wr) {
            return Err(inconsistent(format!(
                "tRAS ({} ps) is shorter than tRCD ({} ps)",
                t.ras, t.rcd_rd
            )));
        }
        if t.burst == 0 {
            return Err(inconsistent("burst duration is zero".into()));
        }
        let all_bank = t.refresh.all_bank;
        if all_bank.cycle == 0 {
            return Err(inconsistent("tRFC is zero".into()));
        }
        if all_bank.interval <= all_bank.cycle + t.rp_ab {
            return Err(ConfigError::UnsatisfiableTiming(format!(
                "{}: tREFI ({} ps) leaves no room after tRP + tRFC ({} ps)",
                self.memory_id,
                all_bank.interval,
                all_bank.cycle + t.rp_ab
            )));
        }
        Ok(())
    }

    pub fn burst_duration(&self) -> Time {
        self.timing.burst
    }

    pub fn bytes_per_burst(&self) -> u32 {
        self.geometry.bytes_per_burst()
    }

    pub fn memory_size_bytes(&self) -> u64 {
        self.geometry.memory_size_bytes()
    }

    /// Command bus occupancy of `command`.
    pub fn command_length(&self, command: Command) -> Time {
        self.command_cycles[command.index()] * self.t_ck
    }

    /// Window, relative to issue, in which a column command drives the data
    /// bus. `None` for commands without data.
    pub fn data_strobe(&self, command: Command) -> Option<TimeInterval> {
        let t = &self.timing;
        if command.is_read() {
            let start = t.rl + t.dqsck;
            Some(TimeInterval::new(start, start + t.burst))
        } else if command.is_write() {
            Some(TimeInterval::new(t.wl, t.wl + t.burst))
        } else {
            None
        }
    }

    /// Time until the bank(s) touched by `command` can accept the next phase.
    pub fn execution_time(&self, command: Command) -> Time {
        let t = &self.timing;
        match command {
            Command::Act => t.rcd_rd.min(t.rcd_wr),
            Command::Prepb | Command::Presb => t.rp_pb,
            Command::Preab => t.rp_ab,
            Command::Rd => t.rl + t.dqsck + t.burst,
            Command::Wr => t.wl + t.burst,
            Command::Rda => (t.rtp + t.rp_pb).max(t.rl + t.dqsck + t.burst),
            Command::Wra => t.wl + t.burst + t.wr + t.rp_pb,
            Command::Refab => t.refresh.all_bank.cycle,
            Command::Refpb => self.partial_cycle(t.refresh.per_bank),
            Command::Refsb => self.partial_cycle(t.refresh.same_bank),
            Command::Refp2b => self.partial_cycle(t.refresh.per_two_bank),
            Command::Pdea | Command::Pdep | Command::Srefen => self.t_ck,
            Command::Pdxa | Command::Pdxp => t.xp,
            Command::Srefex => t.xs,
        }
    }

    fn partial_cycle(&self, timing: Option<RefreshTiming>) -> Time {
        timing.map_or(self.timing.refresh.all_bank.cycle, |r| r.cycle)
    }

    /// Refresh cadence for `policy`, or `None` if the device lacks it.
    /// `NoRefresh` yields `None` as well.
    pub fn refresh_timing(&self, policy: RefreshPolicy) -> Option<RefreshTiming> {
        let modes = &self.timing.refresh;
        match policy {
            RefreshPolicy::NoRefresh => None,
            RefreshPolicy::AllBank => Some(modes.all_bank),
            RefreshPolicy::PerBank => modes.per_bank,
            RefreshPolicy::SameBank => modes.same_bank,
            RefreshPolicy::PerTwoBank => modes.per_two_bank,
        }
    }

    pub fn supports_refresh(&self, policy: RefreshPolicy) -> bool {
        policy == RefreshPolicy::NoRefresh || self.refresh_timing(policy).is_some()
    }

    pub fn constraints(&self) -> &ConstraintTable {
        &self.constraints
    }
}
