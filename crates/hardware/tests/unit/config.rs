use dramctl::config::{
    ArbitrationPolicy, McConfig, PagePolicy, PowerDownPolicy, RefreshPolicy, SchedulerPolicy,
};
use dramctl::memspec::presets;
use dramctl::{Config, ConfigError};
use pretty_assertions::assert_eq;

fn document(mcconfig: serde_json::Value) -> String {
    serde_json::json!({
        "memspec": presets::lpddr4_3200(),
        "mcconfig": mcconfig,
        "simconfig": { "SimulationName": "lpddr4-run", "RecordCommands": true, "AddressMapping": "am.json" },
    })
    .to_string()
}

#[test]
fn test_full_mcconfig_is_read() {
    let config = Config::from_json(&document(serde_json::json!({
        "PagePolicy": "ClosedAdaptive",
        "Scheduler": "Fifo",
        "Arbiter": "RoundRobin",
        "RequestBufferSize": 4,
        "RefreshPolicy": "PerBank",
        "RefreshMaxPostponed": 2,
        "RefreshMaxPulledin": 1,
        "PowerDownPolicy": "Staggered",
        "PowerDownTimeout": 25,
        "PowerDownMinResidency": 12.5,
    })))
    .unwrap();

    assert_eq!(
        config.mcconfig,
        McConfig {
            page_policy: PagePolicy::ClosedAdaptive,
            scheduler: SchedulerPolicy::Fifo,
            arbiter: ArbitrationPolicy::RoundRobin,
            request_buffer_size: 4,
            refresh_policy: RefreshPolicy::PerBank,
            refresh_max_postponed: 2,
            refresh_max_pulledin: 1,
            power_down_policy: PowerDownPolicy::Staggered,
            power_down_timeout: 25,
            power_down_min_residency: 12.5,
        }
    );
    assert_eq!(config.simconfig.simulation_name, "lpddr4-run");
    assert!(config.simconfig.record_commands);
}

#[test]
fn test_defaults_fill_missing_keys() {
    let config = Config::from_json(&document(serde_json::json!({ "PagePolicy": "Closed" }))).unwrap();
    let mc = config.mcconfig;
    assert_eq!(mc.page_policy, PagePolicy::Closed);
    assert_eq!(mc.request_buffer_size, 8);
    assert_eq!(mc.refresh_policy, RefreshPolicy::AllBank);
    assert_eq!(mc.refresh_max_postponed, 8);
    assert_eq!(mc.refresh_max_pulledin, 8);
    assert_eq!(mc.power_down_policy, PowerDownPolicy::NoPowerDown);
    assert_eq!(mc.power_down_timeout, 10);
}

#[test]
fn test_negative_residency_is_rejected() {
    let err = Config::from_json(&document(serde_json::json!({ "PowerDownMinResidency": -1.0 })))
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidController(_)), "{err}");
}

#[test]
fn test_unknown_policy_is_a_parse_error() {
    let err = Config::from_json(&document(serde_json::json!({ "RefreshPolicy": "Sometimes" })))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)), "{err}");
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ddr5.json");
    let mut config = Config::with_memspec(presets::ddr5_4800());
    config.mcconfig.refresh_policy = RefreshPolicy::SameBank;
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    assert_eq!(Config::from_file(&path).unwrap(), config);
}

#[test]
fn test_missing_file_reports_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let err = Config::from_file(&path).unwrap_err();
    match err {
        ConfigError::Io { path: reported, .. } => assert!(reported.ends_with("absent.json")),
        other => panic!("unexpected error: {other}"),
    }
}
