//! Requests entering the controller and completions leaving it.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::time::Time;

/// Transfer direction of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Read,
    Write,
}

/// A decoded memory request.
///
/// `bank` is the bank index within `rank`; the bank group is derived from it
/// by the device geometry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Request {
    pub id: u64,
    pub rank: usize,
    pub bank: usize,
    pub row: u32,
    pub column: u32,
    pub direction: Direction,
    /// Transfer size in bytes. Zero is treated as a single burst.
    pub size: u32,
    /// Time the request reaches the controller.
    pub arrival: Time,
}

impl Request {
    /// Single-burst read.
    pub fn read(id: u64, rank: usize, bank: usize, row: u32, column: u32, arrival: Time) -> Self {
        Self {
            id,
            rank,
            bank,
            row,
            column,
            direction: Direction::Read,
            size: 0,
            arrival,
        }
    }

    /// Single-burst write.
    pub fn write(id: u64, rank: usize, bank: usize, row: u32, column: u32, arrival: Time) -> Self {
        Self {
            direction: Direction::Write,
            ..Self::read(id, rank, bank, row, column, arrival)
        }
    }

    /// Sets the transfer size in bytes.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Number of column commands needed to move `size` bytes.
    pub fn bursts(&self, bytes_per_burst: u32) -> u32 {
        if self.size == 0 || bytes_per_burst == 0 {
            1
        } else {
            self.size.div_ceil(bytes_per_burst)
        }
    }
}

/// Reported once per request after its last data burst.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub id: u64,
    pub direction: Direction,
    pub arrival: Time,
    /// End of the last data burst on the bus.
    pub finish: Time,
}

impl Completion {
    pub fn latency(&self) -> Time {
        self.finish.saturating_sub(self.arrival)
    }
}

/// Channel-wide coordinates of one bank.
///
/// `bank_group` and `bank` are flat indices across the whole channel, so they
/// can index per-group and per-bank tables directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BankAddress {
    pub rank: usize,
    pub bank_group: usize,
    pub bank: usize,
}

impl fmt::Display for BankAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}.bg{}.b{}", self.rank, self.bank_group, self.bank)
    }
}
