use dramctl::common::TimeInterval;
use dramctl::config::{MemSpecConfig, RefreshPolicy};
use dramctl::memspec::{MemoryType, presets};
use dramctl::{Command, ConfigError, MemSpec};
use pretty_assertions::assert_eq;
use rstest::rstest;

const T_CK: u64 = 833;

fn ddr4() -> MemSpec {
    MemSpec::from_config(&presets::ddr4_2400()).unwrap()
}

fn ddr4_with(edit: impl FnOnce(&mut MemSpecConfig)) -> Result<MemSpec, ConfigError> {
    let mut config = presets::ddr4_2400();
    edit(&mut config);
    MemSpec::from_config(&config)
}

#[test]
fn test_ddr4_cycles_become_picoseconds() {
    let spec = ddr4();
    assert_eq!(spec.t_ck, T_CK);
    assert_eq!(spec.timing.rcd_rd, 16 * T_CK);
    assert_eq!(spec.timing.refresh.all_bank.interval, 9360 * T_CK);
    assert_eq!(spec.timing.refresh.all_bank.cycle, 420 * T_CK);
    assert_eq!(spec.burst_duration(), 4 * T_CK);
    assert_eq!(spec.bytes_per_burst(), 64);
    assert_eq!(spec.geometry.banks_per_group(), 4);
}

#[test]
fn test_data_strobe_windows() {
    let spec = ddr4();
    assert_eq!(
        spec.data_strobe(Command::Rd),
        Some(TimeInterval::new(16 * T_CK, 20 * T_CK))
    );
    assert_eq!(
        spec.data_strobe(Command::Wra),
        Some(TimeInterval::new(12 * T_CK, 16 * T_CK))
    );
    assert_eq!(spec.data_strobe(Command::Act), None);
}

#[test]
fn test_execution_times() {
    let spec = ddr4();
    assert_eq!(spec.execution_time(Command::Act), 16 * T_CK);
    assert_eq!(spec.execution_time(Command::Refab), 420 * T_CK);
    assert_eq!(spec.execution_time(Command::Pdxp), 8 * T_CK);
    assert_eq!(spec.execution_time(Command::Srefex), 432 * T_CK);
    // WL + burst + WR + RP
    assert_eq!(spec.execution_time(Command::Wra), (12 + 4 + 18 + 16) * T_CK);
}

#[test]
fn test_missing_parameter_is_named() {
    let err = ddr4_with(|c| {
        c.memtimingspec.remove("RFC");
    })
    .unwrap_err();
    match err {
        ConfigError::MissingParameter { key, .. } => assert_eq!(key, "RFC"),
        other => panic!("unexpected error: {other}"),
    }
}

#[rstest]
#[case::zero_clock("clkMhz", 0.0)]
#[case::negative_timing("RCD", -1.0)]
fn test_invalid_timing_values(#[case] key: &str, #[case] value: f64) {
    let err = ddr4_with(|c| c.memtimingspec.set(key, value)).unwrap_err();
    assert!(
        matches!(&err, ConfigError::InvalidParameter { key: k, .. } if k == key),
        "{err}"
    );
}

#[rstest]
#[case::fractional_rows("nbrOfRows", 1000.5)]
#[case::banks_not_divisible_by_groups("nbrOfBanks", 15.0)]
fn test_invalid_geometry(#[case] key: &str, #[case] value: f64) {
    let err = ddr4_with(|c| c.memarchitecturespec.set(key, value)).unwrap_err();
    assert!(
        matches!(&err, ConfigError::InvalidParameter { key: k, .. } if k == key),
        "{err}"
    );
}

#[test]
fn test_row_cycle_shorter_than_active_time_is_inconsistent() {
    let err = ddr4_with(|c| c.memtimingspec.set("RC", 20.0)).unwrap_err();
    assert!(matches!(err, ConfigError::InconsistentTiming { .. }), "{err}");
}

#[test]
fn test_refresh_interval_must_fit_a_refresh() {
    let err = ddr4_with(|c| c.memtimingspec.set("REFI", 400.0)).unwrap_err();
    assert!(matches!(err, ConfigError::UnsatisfiableTiming(_)), "{err}");
}

#[test]
fn test_unsupported_memory_type() {
    let err = ddr4_with(|c| c.memory_type = MemoryType::Gddr6).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedMemoryType(_)), "{err}");
}

#[rstest]
#[case::ddr4("ddr4", RefreshPolicy::PerBank, false)]
#[case::ddr4_all_bank("ddr4", RefreshPolicy::AllBank, true)]
#[case::ddr5_same_bank("ddr5", RefreshPolicy::SameBank, true)]
#[case::lpddr4_per_bank("lpddr4", RefreshPolicy::PerBank, true)]
#[case::hbm2_per_bank("hbm2", RefreshPolicy::PerBank, true)]
#[case::wideio_same_bank("wideio", RefreshPolicy::SameBank, false)]
#[case::no_refresh("wideio", RefreshPolicy::NoRefresh, true)]
fn test_refresh_granularity_support(
    #[case] device: &str,
    #[case] policy: RefreshPolicy,
    #[case] supported: bool,
) {
    let spec = MemSpec::from_config(&presets::by_name(device).unwrap()).unwrap();
    assert_eq!(spec.supports_refresh(policy), supported);
}

#[test]
fn test_memory_type_names_round_trip_through_json() {
    let json = serde_json::to_string(&presets::ddr4_2400()).unwrap();
    assert!(json.contains("\"memoryType\":\"DDR4\""), "{json}");
    let wideio: MemoryType = serde_json::from_str("\"WIDEIO\"").unwrap();
    assert_eq!(wideio, MemoryType::WideIo);
}
