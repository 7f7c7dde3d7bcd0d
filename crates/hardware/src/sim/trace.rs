//! STL trace player.
//!
//! One request per line:
//!
//! ```text
//! <cycle>: <read|write> <address> [<bytes>] [<data>]
//! ```
//!
//! `cycle` counts clocks of the player's own `clkMhz`. In `.stl` files it is
//! absolute; in `.rstl` files it is the delay since the previous request.
//! The address is hex with a `0x` prefix or decimal. Text after `#` is a
//! comment. Trailing data words are accepted and ignored.

use std::path::Path;

use super::address::AddressMapper;
use super::initiator::{Emit, Initiator};
use crate::common::{Direction, Request, SimError, Time};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceTiming {
    Absolute,
    Relative,
}

impl TraceTiming {
    /// Timing implied by the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "stl" => Some(TraceTiming::Absolute),
            "rstl" => Some(TraceTiming::Relative),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    cycle: u64,
    direction: Direction,
    address: u64,
    size: u32,
}

pub struct TracePlayer {
    name: String,
    entries: std::vec::IntoIter<Entry>,
    total: u64,
    timing: TraceTiming,
    period: Time,
    mapper: AddressMapper,
    last_arrival: Time,
    next_id: u64,
}

impl TracePlayer {
    /// Loads the trace at `path`; the extension selects the timing mode.
    pub fn open(path: &Path, clk_mhz: f64, mapper: AddressMapper) -> Result<Self, SimError> {
        let name = path.display().to_string();
        let fail = |reason: String| SimError::Trace {
            path: name.clone(),
            line: 0,
            reason,
        };
        let timing = TraceTiming::from_path(path)
            .ok_or_else(|| fail("not a valid trace format, expected .stl or .rstl".into()))?;
        let text = std::fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
        Self::parse(&name, &text, timing, clk_mhz, mapper)
    }

    /// Parses trace text. `name` is used in error messages.
    pub fn parse(
        name: &str,
        text: &str,
        timing: TraceTiming,
        clk_mhz: f64,
        mapper: AddressMapper,
    ) -> Result<Self, SimError> {
        if !clk_mhz.is_finite() || clk_mhz <= 0.0 {
            return Err(SimError::Trace {
                path: name.to_string(),
                line: 0,
                reason: format!("clock frequency {clk_mhz} MHz is not positive"),
            });
        }
        let entries = text
            .lines()
            .enumerate()
            .filter_map(|(i, line)| {
                parse_line(line)
                    .map_err(|reason| SimError::Trace {
                        path: name.to_string(),
                        line: i + 1,
                        reason,
                    })
                    .transpose()
            })
            .collect::<Result<Vec<_>, _>>()?;
        log::info!("trace {name}: {} request(s), {timing:?} timing", entries.len());
        Ok(Self {
            name: name.to_string(),
            total: entries.len() as u64,
            entries: entries.into_iter(),
            timing,
            period: (1.0e6 / clk_mhz).round() as Time,
            mapper,
            last_arrival: 0,
            next_id: 0,
        })
    }
}

/// `Ok(None)` for blank and comment lines.
fn parse_line(line: &str) -> Result<Option<Entry>, String> {
    let line = line.split('#').next().unwrap_or_default().trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (cycle, rest) = line
        .split_once(':')
        .ok_or_else(|| "missing `:` after the cycle".to_string())?;
    let cycle = cycle
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("bad cycle `{}`: {e}", cycle.trim()))?;

    let mut fields = rest.split_whitespace();
    let direction = match fields.next().map(str::to_ascii_lowercase).as_deref() {
        Some("read") => Direction::Read,
        Some("write") => Direction::Write,
        Some(other) => return Err(format!("unknown command `{other}`")),
        None => return Err("missing command".into()),
    };
    let address = fields.next().ok_or_else(|| "missing address".to_string())?;
    let address = match address.strip_prefix("0x").or_else(|| address.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => address.parse::<u64>(),
    }
    .map_err(|e| format!("bad address `{address}`: {e}"))?;
    let size = match fields.next() {
        Some(size) => size
            .parse::<u32>()
            .map_err(|e| format!("bad length `{size}`: {e}"))?,
        None => 0,
    };
    Ok(Some(Entry {
        cycle,
        direction,
        address,
        size,
    }))
}

impl Initiator for TracePlayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn poll(&mut self, now: Time) -> Result<Emit, SimError> {
        let Some(entry) = self.entries.next() else {
            return Ok(Emit::Finished);
        };
        let offset = entry.cycle * self.period;
        let arrival = match self.timing {
            TraceTiming::Absolute => offset,
            TraceTiming::Relative => self.last_arrival + offset,
        }
        .max(now);
        self.last_arrival = arrival;

        let at = self.mapper.decode(entry.address);
        let id = self.next_id;
        self.next_id += 1;
        Ok(Emit::Request(Request {
            id,
            rank: at.rank,
            bank: at.bank,
            row: at.row,
            column: at.column,
            direction: entry.direction,
            size: entry.size,
            arrival,
        }))
    }

    fn total_requests(&self) -> Option<u64> {
        Some(self.total)
    }
}
