//! Physical address to DRAM coordinates.
//!
//! Fixed bit-field layout derived from the device geometry, most significant
//! field first:
//!
//! ```text
//! | row | rank | bank | bank group | column | byte |
//! ```
//!
//! Bank-group bits sit right above the column so consecutive rows of data
//! rotate through the groups. Address bits above the row field are ignored.

use crate::common::ConfigError;
use crate::memspec::{Geometry, MemSpec};

/// DRAM coordinates of an address. `bank` is the index within the rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub rank: usize,
    pub bank: usize,
    pub row: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Field {
    shift: u32,
    bits: u32,
}

impl Field {
    fn extract(self, address: u64) -> u64 {
        (address >> self.shift) & ((1u64 << self.bits) - 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressMapper {
    banks_per_group: usize,
    column: Field,
    group: Field,
    bank: Field,
    rank: Field,
    row: Field,
}

impl AddressMapper {
    /// Builds the mapping for `memspec`. Every geometry dimension must be a
    /// power of two.
    pub fn new(memspec: &MemSpec) -> Result<Self, ConfigError> {
        let g = memspec.geometry;
        let bits = |key: &str, value: usize| -> Result<u32, ConfigError> {
            if value.is_power_of_two() {
                Ok(value.trailing_zeros())
            } else {
                Err(ConfigError::InvalidParameter {
                    spec: memspec.memory_id.clone(),
                    key: key.to_string(),
                    reason: format!("{value} is not a power of two, addresses cannot be mapped"),
                })
            }
        };
        let byte = bits("width", bus_bytes(&g))?;
        let column = bits("nbrOfColumns", g.columns)?;
        let group = bits("nbrOfBankGroups", g.bank_groups_per_rank)?;
        let bank = bits("nbrOfBanks", g.banks_per_group())?;
        let rank = bits("nbrOfRanks", g.ranks)?;
        let row = bits("nbrOfRows", g.rows)?;

        let mut shift = byte;
        let mut field = |width: u32| {
            let f = Field { shift, bits: width };
            shift += width;
            f
        };
        Ok(Self {
            banks_per_group: g.banks_per_group(),
            column: field(column),
            group: field(group),
            bank: field(bank),
            rank: field(rank),
            row: field(row),
        })
    }

    pub fn decode(&self, address: u64) -> Decoded {
        let group = self.group.extract(address) as usize;
        let bank = self.bank.extract(address) as usize;
        Decoded {
            rank: self.rank.extract(address) as usize,
            bank: group * self.banks_per_group + bank,
            row: self.row.extract(address) as u32,
            column: self.column.extract(address) as u32,
        }
    }

    /// Address of the first byte of `row` in bank 0 of rank 0.
    pub fn row_address(&self, row: u32) -> u64 {
        u64::from(row) << self.row.shift
    }
}

/// Width of the data bus in bytes.
fn bus_bytes(g: &Geometry) -> usize {
    (g.device_width * g.devices_per_rank / 8).max(1)
}
