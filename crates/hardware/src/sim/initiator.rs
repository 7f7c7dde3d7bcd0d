//! Traffic sources driven by the [`Simulator`](super::Simulator).

use crate::common::{Completion, Direction, Request, SimError, Time};

/// What an initiator has to offer when polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emit {
    /// A request to deliver at `request.arrival`, never earlier than the poll
    /// time. Its `id` is reassigned by the simulator.
    Request(Request),
    /// Nothing until one of the initiator's requests completes.
    Blocked,
    /// No more requests.
    Finished,
}

/// A source of requests.
///
/// The simulator polls an initiator again after delivering its previous
/// request, and after each completion while it is blocked.
pub trait Initiator {
    fn name(&self) -> &str;

    /// Next request as of `now`.
    fn poll(&mut self, now: Time) -> Result<Emit, SimError>;

    /// One of this initiator's requests finished.
    fn completed(&mut self, _completion: &Completion) {}

    /// Total requests this initiator will produce, when known up front.
    fn total_requests(&self) -> Option<u64> {
        None
    }
}

/// Plays back a fixed list of requests, for tests and scripted traffic.
pub struct ScriptedInitiator {
    name: String,
    requests: std::vec::IntoIter<Request>,
    total: u64,
}

impl ScriptedInitiator {
    /// `requests` must be sorted by arrival.
    pub fn new(name: impl Into<String>, requests: Vec<Request>) -> Self {
        Self {
            name: name.into(),
            total: requests.len() as u64,
            requests: requests.into_iter(),
        }
    }

    /// One single-burst request per `period` to the given bank and rows,
    /// cycling through `rows`, starting at time zero.
    pub fn stream(
        rank: usize,
        bank: usize,
        rows: &[u32],
        direction: Direction,
        period: Time,
        count: u64,
    ) -> Self {
        let requests = (0..count)
            .map(|i| {
                let row = rows[i as usize % rows.len().max(1)];
                let request = Request::read(i, rank, bank, row, (i % 128) as u32, i * period);
                Request {
                    direction,
                    ..request
                }
            })
            .collect();
        Self::new("stream", requests)
    }
}

impl Initiator for ScriptedInitiator {
    fn name(&self) -> &str {
        &self.name
    }

    fn poll(&mut self, now: Time) -> Result<Emit, SimError> {
        Ok(match self.requests.next() {
            Some(request) => Emit::Request(Request {
                arrival: request.arrival.max(now),
                ..request
            }),
            None => Emit::Finished,
        })
    }

    fn total_requests(&self) -> Option<u64> {
        Some(self.total)
    }
}
