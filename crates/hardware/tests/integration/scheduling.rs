//! Legality of complete runs and ordering of responses.

use crate::common::harness::{TestHarness, ddr4_config};
use dramctl::config::{
    ArbitrationPolicy, PagePolicy, PowerDownPolicy, RefreshPolicy, SchedulerPolicy,
};
use dramctl::memspec::presets;
use dramctl::{Command, Config, Direction, Request, Time};
use pretty_assertions::assert_eq;
use rstest::rstest;

/// Xorshift generator for reproducible traffic.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

/// `count` requests over every rank and bank, rows drawn from a small set so
/// there are hits as well as conflicts.
fn mixed_traffic(h: &mut TestHarness, count: u64, period: Time, seed: u64) {
    let g = h.controller.memspec().geometry;
    let mut rng = XorShift(seed | 1);
    for i in 0..count {
        let rank = rng.below(g.ranks as u64) as usize;
        let bank = rng.below(g.banks_per_rank as u64) as usize;
        let row = rng.below(4) as u32;
        let column = rng.below(g.columns as u64) as u32;
        let direction = if rng.below(3) == 0 {
            Direction::Write
        } else {
            Direction::Read
        };
        h.push(Request {
            direction,
            ..Request::read(0, rank, bank, row, column, i * period)
        });
    }
}

#[rstest]
#[case::ddr4_all_bank(presets::ddr4_2400(), RefreshPolicy::AllBank)]
#[case::ddr5_same_bank(presets::ddr5_4800(), RefreshPolicy::SameBank)]
#[case::lpddr4_per_bank(presets::lpddr4_3200(), RefreshPolicy::PerBank)]
#[case::lpddr5_all_bank(presets::lpddr5_6400(), RefreshPolicy::AllBank)]
#[case::hbm2_per_bank(presets::hbm2_2000(), RefreshPolicy::PerBank)]
#[case::wideio_all_bank(presets::wideio_200(), RefreshPolicy::AllBank)]
fn test_every_device_serves_mixed_traffic_legally(
    #[case] memspec: dramctl::config::MemSpecConfig,
    #[case] refresh: RefreshPolicy,
    #[values(PowerDownPolicy::NoPowerDown, PowerDownPolicy::Staggered)] power: PowerDownPolicy,
) {
    let mut config = Config::with_memspec(memspec);
    config.mcconfig.refresh_policy = refresh;
    config.mcconfig.power_down_policy = power;
    let mut h = TestHarness::new(config);
    mixed_traffic(&mut h, 400, 25_000, 0x5eed);
    h.run_until_drained(200_000_000);

    assert_eq!(h.completions.len(), 400);
    assert!(h.completions.iter().all(|c| c.finish > c.arrival));

    // Idle tail: refresh keeps running, with or without power-down.
    let idle_end = h.now + 30_000_000;
    h.run_until(idle_end);
    assert!(h.controller.stats().refresh_commands() > 0);
    h.assert_trace_is_legal();
}

#[rstest]
fn test_page_and_arbitration_policies_stay_legal(
    #[values(PagePolicy::Open, PagePolicy::OpenAdaptive, PagePolicy::Closed, PagePolicy::ClosedAdaptive)]
    page: PagePolicy,
    #[values(ArbitrationPolicy::Oldest, ArbitrationPolicy::RoundRobin)] arbiter: ArbitrationPolicy,
) {
    let mut config = ddr4_config(RefreshPolicy::AllBank, PowerDownPolicy::NoPowerDown);
    config.mcconfig.page_policy = page;
    config.mcconfig.arbiter = arbiter;
    let mut h = TestHarness::new(config);
    mixed_traffic(&mut h, 300, 5_000, 42);
    h.run_until_drained(100_000_000);

    assert_eq!(h.completions.len(), 300);
    h.assert_trace_is_legal();
}

#[rstest]
fn test_same_row_responses_keep_their_order(
    #[values(SchedulerPolicy::Fifo, SchedulerPolicy::FrFcfs)] scheduler: SchedulerPolicy,
) {
    let mut config = ddr4_config(RefreshPolicy::AllBank, PowerDownPolicy::NoPowerDown);
    config.mcconfig.scheduler = scheduler;
    let mut h = TestHarness::new(config);
    let mut rows = Vec::new();
    for i in 0..60u64 {
        let row = [3, 3, 8, 3, 8, 8][i as usize % 6];
        let id = if i % 4 == 3 {
            h.write(5, row, (i * 8 % 1024) as u32, i * 2_000)
        } else {
            h.read(5, row, (i * 8 % 1024) as u32, i * 2_000)
        };
        rows.push((id, row));
    }
    h.run_until_drained(50_000_000);
    assert_eq!(h.completions.len(), 60);

    for row in [3, 8] {
        let submitted: Vec<u64> = rows.iter().filter(|r| r.1 == row).map(|r| r.0).collect();
        let completed: Vec<u64> = h
            .completions
            .iter()
            .map(|c| c.id)
            .filter(|id| submitted.contains(id))
            .collect();
        assert_eq!(completed, submitted, "row {row}");
    }
}

#[test]
fn test_row_hits_skip_ahead_of_conflicts() {
    let mut config = ddr4_config(RefreshPolicy::NoRefresh, PowerDownPolicy::NoPowerDown);
    config.mcconfig.scheduler = SchedulerPolicy::FrFcfs;
    let mut h = TestHarness::new(config);
    let first = h.read(0, 1, 0, 0);
    let conflict = h.read(0, 2, 0, 0);
    let hit = h.read(0, 1, 8, 0);
    h.run_until_drained(10_000_000);

    let order: Vec<u64> = h.completions.iter().map(|c| c.id).collect();
    assert_eq!(order, vec![first, hit, conflict]);
    let stats = h.controller.stats();
    assert_eq!(stats.row_hits, 1);
    assert_eq!(stats.row_misses, 2);
    assert_eq!(stats.command_count(Command::Prepb), 1);
}

#[test]
fn test_multi_burst_request_completes_after_its_last_burst() {
    let mut h = TestHarness::ddr4(RefreshPolicy::NoRefresh, PowerDownPolicy::NoPowerDown);
    let bytes = h.controller.memspec().bytes_per_burst();
    let t = h.controller.memspec().timing;
    let id = h.push(Request::read(0, 0, 2, 0, 0, 0).with_size(4 * bytes));
    h.run_until_drained(10_000_000);

    assert_eq!(h.issued(Command::Rd).len(), 4);
    let last_read = *h.issued(Command::Rd).last().expect("reads issued");
    assert_eq!(
        h.completions.iter().find(|c| c.id == id).map(|c| c.finish),
        Some(last_read + t.rl + t.dqsck + t.burst)
    );
    assert_eq!(h.controller.stats().bytes, 4 * bytes as u64);
}
