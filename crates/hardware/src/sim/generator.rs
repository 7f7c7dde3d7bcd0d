//! Row-hammer traffic generator.
//!
//! Reads alternating between address 0 and `row_increment`, one request in
//! flight at a time, at most one per generator clock.

use super::address::AddressMapper;
use super::initiator::{Emit, Initiator};
use crate::common::{Completion, Request, SimError, Time};
use crate::config::RowHammerConfig;

pub struct RowHammer {
    name: String,
    total: u64,
    issued: u64,
    period: Time,
    row_increment: u64,
    mapper: AddressMapper,
    in_flight: bool,
    last_arrival: Option<Time>,
}

impl RowHammer {
    pub fn new(config: &RowHammerConfig, mapper: AddressMapper) -> Result<Self, SimError> {
        if !config.clk_mhz.is_finite() || config.clk_mhz <= 0.0 {
            return Err(SimError::Trace {
                path: config.name.clone(),
                line: 0,
                reason: format!("clock frequency {} MHz is not positive", config.clk_mhz),
            });
        }
        Ok(Self {
            name: config.name.clone(),
            total: config.num_requests,
            issued: 0,
            period: (1.0e6 / config.clk_mhz).round() as Time,
            row_increment: config.row_increment,
            mapper,
            in_flight: false,
            last_arrival: None,
        })
    }
}

impl Initiator for RowHammer {
    fn name(&self) -> &str {
        &self.name
    }

    fn poll(&mut self, now: Time) -> Result<Emit, SimError> {
        if self.issued >= self.total {
            return Ok(Emit::Finished);
        }
        if self.in_flight {
            return Ok(Emit::Blocked);
        }
        let address = if self.issued % 2 == 0 { 0 } else { self.row_increment };
        let arrival = self.last_arrival.map_or(now, |last| (last + self.period).max(now));
        let at = self.mapper.decode(address);
        let request = Request::read(self.issued, at.rank, at.bank, at.row, at.column, arrival);
        self.issued += 1;
        self.in_flight = true;
        self.last_arrival = Some(arrival);
        Ok(Emit::Request(request))
    }

    fn completed(&mut self, _completion: &Completion) {
        self.in_flight = false;
    }

    fn total_requests(&self) -> Option<u64> {
        Some(self.total)
    }
}
