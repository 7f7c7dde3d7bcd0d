use dramctl::config::{McConfig, PagePolicy, RefreshPolicy, SchedulerPolicy};
use dramctl::controller::bank_machine::BankMachine;
use dramctl::controller::refresh::{RefreshManager, RefreshMode};
use dramctl::memspec::presets;
use dramctl::{Command, ConfigError, MemSpec, Request};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn spec(device: &str) -> MemSpec {
    MemSpec::from_config(&presets::by_name(device).unwrap()).unwrap()
}

fn policy(refresh_policy: RefreshPolicy) -> McConfig {
    McConfig {
        refresh_policy,
        ..McConfig::default()
    }
}

fn banks(spec: &MemSpec, rank: usize) -> Vec<BankMachine> {
    (0..spec.geometry.banks_per_rank)
        .map(|b| {
            BankMachine::new(
                spec.geometry.bank_address(rank, b),
                PagePolicy::Open,
                SchedulerPolicy::FrFcfs,
                8,
                spec.bytes_per_burst(),
            )
        })
        .collect()
}

#[test]
fn test_unsupported_granularity_is_rejected() {
    let err = RefreshManager::new(0, &spec("ddr4"), &policy(RefreshPolicy::PerBank))
        .err()
        .unwrap();
    match err {
        ConfigError::UnsupportedRefreshPolicy { policy, memory } => {
            assert_eq!(policy, "PerBank");
            assert_eq!(memory, "DDR4");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_disabled_manager_never_asks_for_anything() {
    let spec = spec("ddr4");
    let mut manager = RefreshManager::new(0, &spec, &policy(RefreshPolicy::NoRefresh)).unwrap();
    let banks = banks(&spec, 0);
    let demand = manager.evaluate(1_000_000_000, &banks);
    assert!(!demand.interrupt);
    assert!(demand.forced.is_none());
    assert_eq!(manager.next_command(), None);
    assert_eq!(manager.time_for_next_trigger(), None);
    assert!(manager.clock().is_none());
}

#[rstest]
#[case::lpddr4_per_bank("lpddr4", RefreshPolicy::PerBank, 8)]
#[case::ddr5_same_bank("ddr5", RefreshPolicy::SameBank, 4)]
#[case::hbm2_per_bank("hbm2", RefreshPolicy::PerBank, 16)]
#[case::ddr4_all_bank("ddr4", RefreshPolicy::AllBank, 1)]
fn test_credit_bounds_scale_with_refresh_groups(
    #[case] device: &str,
    #[case] refresh_policy: RefreshPolicy,
    #[case] groups: i64,
) {
    let manager = RefreshManager::new(0, &spec(device), &policy(refresh_policy)).unwrap();
    let clock = manager.clock().unwrap();
    assert_eq!(clock.max_postponed(), 8 * groups);
    assert_eq!(clock.max_pulled_in(), 8 * groups);
    assert_eq!(clock.mode(), RefreshMode::Regular);
}

#[test]
fn test_second_rank_starts_half_an_interval_later() {
    let spec = spec("hbm2");
    let config = policy(RefreshPolicy::AllBank);
    let first = RefreshManager::new(0, &spec, &config).unwrap();
    let second = RefreshManager::new(1, &spec, &config).unwrap();
    let interval = spec.timing.refresh.all_bank.interval;
    assert_eq!(first.time_for_next_trigger(), Some(0));
    assert_eq!(second.time_for_next_trigger(), Some(interval / 2));
}

#[test]
fn test_open_row_is_closed_before_refresh() {
    let spec = spec("ddr4");
    let mut banks = banks(&spec, 0);
    banks[2].enqueue(Request::read(0, 0, 2, 11, 0, 0), 0);
    banks[2].evaluate(0);
    banks[2].issue(0, &spec);
    banks[2].evaluate(spec.timing.rcd_rd);
    assert!(banks[2].issue(spec.timing.rcd_rd, &spec).is_some());
    assert!(banks[2].is_activated());

    let mut manager = RefreshManager::new(0, &spec, &policy(RefreshPolicy::AllBank)).unwrap();
    let demand = manager.evaluate(0, &banks);
    assert!(demand.interrupt);
    assert_eq!(manager.next_command().map(|(c, _)| c), Some(Command::Preab));

    for bank in &mut banks {
        bank.observe(Command::Preab, 0, &spec);
    }
    manager.evaluate(0, &banks);
    assert_eq!(manager.next_command().map(|(c, _)| c), Some(Command::Refab));
}

#[test]
fn test_refresh_on_another_rank_is_ignored() {
    let spec = spec("hbm2");
    let mut manager = RefreshManager::new(0, &spec, &policy(RefreshPolicy::AllBank)).unwrap();
    manager.update(Command::Refab, spec.geometry.rank_address(1), 0);
    assert_eq!(manager.counters().issued, 0);
    manager.update(Command::Refab, spec.geometry.rank_address(0), 0);
    assert_eq!(manager.counters().issued, 1);
}
