//! Refresh behavior of a fully loaded or bursty rank.

use crate::common::harness::{TestHarness, ddr4_config, lpddr4_config};
use dramctl::config::{PowerDownPolicy, RefreshPolicy};
use dramctl::{Command, Config, Time};
use pretty_assertions::assert_eq;
use rstest::rstest;

/// Back-to-back row hits to bank 0, one every `period`, from time zero.
fn saturate_bank(h: &mut TestHarness, until: Time, period: Time) {
    for i in 0..until / period {
        h.read(0, 0, (i % 128) as u32 * 8, i * period);
    }
}

#[test]
fn test_postponed_refresh_is_forced_after_eight_intervals() {
    let mut config = ddr4_config(RefreshPolicy::AllBank, PowerDownPolicy::NoPowerDown);
    config.memspec.memtimingspec.set("REFI", 7800.0);
    config.mcconfig.refresh_max_postponed = 8;
    let mut h = TestHarness::new(config);
    let interval: Time = 7_800_000;
    let end: Time = 70_000_000;

    saturate_bank(&mut h, end, 4_000);
    h.run_until(end);

    let refreshes = h.issued(Command::Refab);
    assert!(!refreshes.is_empty(), "no refresh within {end} ps");
    let first = refreshes[0];
    assert!(first >= 8 * interval, "refresh at {first} ps was not postponed");
    assert!(
        first < 8 * interval + 100_000,
        "forced refresh issued late at {first} ps"
    );

    let stats = h.controller.stats();
    assert_eq!(stats.refresh.postponed, 8);
    assert!(stats.refresh.forced >= 1);
    assert!(refreshes.len() as u64 >= end.div_ceil(interval) - 8);
    h.assert_trace_is_legal();
}

/// Any refresh command counts, so for per-bank refresh the bound is on the
/// rank as a whole.
#[rstest]
#[case::all_bank(ddr4_config(RefreshPolicy::AllBank, PowerDownPolicy::NoPowerDown), 1560, Command::Refab)]
#[case::per_bank(lpddr4_config(RefreshPolicy::PerBank, PowerDownPolicy::NoPowerDown), 3120, Command::Refpb)]
fn test_refresh_gap_never_exceeds_postponement_bound(
    #[case] mut config: Config,
    #[case] refi_ns: Time,
    #[case] refresh: Command,
) {
    config.memspec.memtimingspec.set("REFI", refi_ns as f64);
    config.mcconfig.refresh_max_postponed = 3;
    config.mcconfig.refresh_max_pulledin = 3;
    let mut h = TestHarness::new(config);
    let interval: Time = refi_ns * 1_000;
    let end: Time = 20 * interval;

    saturate_bank(&mut h, end, 4_000);
    h.run_until(end);

    let refreshes = h.issued(refresh);
    assert!(refreshes.len() >= 5);
    let worst = worst_refresh_gap(&refreshes, h.now);
    assert!(worst <= interval * 4, "{worst} ps without refresh");
    h.assert_trace_is_legal();
}

/// Largest distance between consecutive refreshes, counting the run start
/// and `end` as refreshes.
fn worst_refresh_gap(refreshes: &[Time], end: Time) -> Time {
    let mut previous = 0;
    let mut worst = 0;
    for &t in refreshes.iter().chain([end].iter()) {
        worst = worst.max(t - previous);
        previous = t;
    }
    worst
}

#[test]
fn test_pulled_in_credit_does_not_stretch_the_refresh_gap() {
    let mut config = ddr4_config(RefreshPolicy::AllBank, PowerDownPolicy::NoPowerDown);
    config.memspec.memtimingspec.set("REFI", 1560.0);
    config.mcconfig.refresh_max_postponed = 3;
    config.mcconfig.refresh_max_pulledin = 3;
    let mut h = TestHarness::new(config);
    let interval: Time = 1_560_000;
    let busy_from: Time = 20_000_000;
    let end: Time = 60_000_000;

    for i in 0..(end - busy_from) / 4_000 {
        h.read(0, 0, (i % 128) as u32 * 8, busy_from + i * 4_000);
    }
    let mut lowest = 0;
    h.run_until_with(end, |c| lowest = lowest.min(c.refresh_manager(0).flexibility()));

    // The idle phase banked the full pull-in credit before traffic started.
    assert_eq!(lowest, -3);
    let refreshes = h.issued(Command::Refab);
    let worst = worst_refresh_gap(&refreshes, h.now);
    assert!(
        worst <= interval * 4,
        "{worst} ps between refreshes, bound {} ps",
        interval * 4
    );
    assert!(h.controller.stats().refresh.forced >= 1);
    h.assert_trace_is_legal();
}

#[rstest]
#[case(8, 8)]
#[case(2, 4)]
#[case(4, 0)]
#[case(0, 2)]
fn test_credit_counters_stay_within_bounds(#[case] max_postponed: u32, #[case] max_pulled_in: u32) {
    let mut config = ddr4_config(RefreshPolicy::AllBank, PowerDownPolicy::NoPowerDown);
    config.memspec.memtimingspec.set("REFI", 1560.0);
    config.mcconfig.refresh_max_postponed = max_postponed;
    config.mcconfig.refresh_max_pulledin = max_pulled_in;
    let mut h = TestHarness::new(config);

    // Busy and idle phases of 8 µs each.
    let phase: Time = 8_000_000;
    for burst in [0, 2] {
        let start = burst * phase;
        for i in 0..phase / 4_000 {
            h.read((i % 4) as usize * 4, 1, 0, start + i * 4_000);
        }
    }

    let mut lowest = 0;
    let mut highest = 0;
    h.run_until_with(4 * phase, |c| {
        let flexibility = c.refresh_manager(0).flexibility();
        lowest = lowest.min(flexibility);
        highest = highest.max(flexibility);
    });

    assert!(highest <= max_postponed as i64, "postponed {highest} > {max_postponed}");
    assert!(-lowest <= max_pulled_in as i64, "pulled in {} > {max_pulled_in}", -lowest);
    let stats = h.controller.stats();
    assert!(stats.refresh.pulled_in <= stats.refresh.issued);
    assert_eq!(h.completions.len() as Time, 2 * phase / 4_000);
    h.assert_trace_is_legal();
}

#[test]
fn test_idle_rank_pulls_refreshes_in() {
    let mut config = ddr4_config(RefreshPolicy::AllBank, PowerDownPolicy::NoPowerDown);
    config.mcconfig.refresh_max_pulledin = 4;
    let mut h = TestHarness::new(config);
    h.run_until(5_000_000);

    let refreshes = h.issued(Command::Refab);
    // The regular refresh at time zero plus four pulled in behind it.
    assert_eq!(refreshes.len(), 5);
    assert_eq!(refreshes[0], 0);
    assert_eq!(h.controller.refresh_manager(0).flexibility(), -4);
    assert_eq!(h.controller.stats().refresh.pulled_in, 4);
}
