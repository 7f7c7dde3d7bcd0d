use dramctl::Command;
use dramctl::stats::ControllerStats;
use pretty_assertions::assert_eq;

fn sample() -> ControllerStats {
    let mut stats = ControllerStats {
        reads: 3,
        writes: 1,
        bytes: 256,
        row_hits: 3,
        row_misses: 1,
        total_latency: 40_000,
        max_latency: 19_000,
        last_finish: 128_000,
        ..ControllerStats::default()
    };
    stats.commands[Command::Refab.index()] = 2;
    stats.commands[Command::Refpb.index()] = 5;
    stats.commands[Command::Act.index()] = 1;
    stats
}

#[test]
fn test_derived_metrics() {
    let stats = sample();
    assert_eq!(stats.completed(), 4);
    assert_eq!(stats.average_latency_ns(), 10.0);
    assert_eq!(stats.bandwidth_gbps(), 2.0);
    assert_eq!(stats.row_hit_rate(), 0.75);
    assert_eq!(stats.refresh_commands(), 7);
    assert_eq!(stats.command_count(Command::Act), 1);
}

#[test]
fn test_empty_run_has_zero_rates() {
    let stats = ControllerStats::default();
    assert_eq!(stats.average_latency_ns(), 0.0);
    assert_eq!(stats.bandwidth_gbps(), 0.0);
    assert_eq!(stats.row_hit_rate(), 0.0);
}

#[test]
fn test_serializes_counters() {
    let json = serde_json::to_value(sample()).unwrap();
    assert_eq!(json["reads"], 3);
    assert_eq!(json["row_misses"], 1);
    assert!(json["refresh"].is_object());
}
