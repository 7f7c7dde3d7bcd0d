use std::sync::Arc;

use dramctl::controller::checker::TimingChecker;
use dramctl::memspec::presets;
use dramctl::{Command, MemSpec};
use pretty_assertions::assert_eq;
use rstest::rstest;

const T_CK: u64 = 833;

fn checker(ranks: u32) -> TimingChecker {
    let mut config = presets::ddr4_2400();
    config.memarchitecturespec.set("nbrOfRanks", f64::from(ranks));
    TimingChecker::new(Arc::new(MemSpec::from_config(&config).unwrap()))
}

#[rstest]
#[case::same_bank_group(1, 6 * T_CK)]
#[case::other_bank_group(4, 4 * T_CK)]
fn test_back_to_back_reads(#[case] next_bank: usize, #[case] expected: u64) {
    let mut c = checker(1);
    let g = c.memspec().geometry;
    c.insert(Command::Rd, g.bank_address(0, 0), 0);
    assert_eq!(c.earliest(Command::Rd, g.bank_address(0, next_bank)), expected);
}

#[test]
fn test_read_to_read_on_another_rank_needs_rank_switch() {
    let mut c = checker(2);
    let g = c.memspec().geometry;
    c.insert(Command::Rd, g.bank_address(0, 0), 0);
    // burst + tRTRS
    assert_eq!(c.earliest(Command::Rd, g.bank_address(1, 0)), 5 * T_CK);
    assert_eq!(c.earliest(Command::Act, g.bank_address(1, 0)), T_CK);
}

#[test]
fn test_read_to_write_turnaround_spans_the_channel() {
    let mut c = checker(2);
    let g = c.memspec().geometry;
    c.insert(Command::Rd, g.bank_address(0, 0), 0);
    // RL + burst + 2 tCK - WL
    for target in [g.bank_address(0, 7), g.bank_address(1, 3)] {
        assert_eq!(c.earliest(Command::Wr, target), 10 * T_CK);
    }
}

#[test]
fn test_write_to_read_waits_for_write_to_read_delay() {
    let mut c = checker(1);
    let g = c.memspec().geometry;
    c.insert(Command::Wr, g.bank_address(0, 0), 0);
    // WL + burst + tWTR_L / tWTR_S
    assert_eq!(c.earliest(Command::Rd, g.bank_address(0, 2)), (12 + 4 + 9) * T_CK);
    assert_eq!(c.earliest(Command::Rd, g.bank_address(0, 8)), (12 + 4 + 3) * T_CK);
}

#[test]
fn test_power_down_exit_gates_the_rank() {
    let mut c = checker(1);
    let g = c.memspec().geometry;
    let rank = g.rank_address(0);
    c.insert(Command::Pdep, rank, 0);
    assert_eq!(c.earliest(Command::Pdxp, rank), 6 * T_CK);
    c.insert(Command::Pdxp, rank, 6 * T_CK);
    assert_eq!(c.earliest(Command::Act, g.bank_address(0, 5)), (6 + 8) * T_CK);
}

#[test]
fn test_command_bus_serializes_unrelated_commands() {
    let mut c = checker(2);
    let g = c.memspec().geometry;
    c.insert(Command::Act, g.bank_address(0, 0), 10 * T_CK);
    assert_eq!(c.earliest(Command::Act, g.bank_address(1, 9)), 11 * T_CK);
}

#[test]
fn test_earliest_is_aligned_to_the_clock() {
    let mut c = checker(1);
    let g = c.memspec().geometry;
    c.insert(Command::Act, g.bank_address(0, 0), 0);
    for command in [Command::Rd, Command::Prepb, Command::Act] {
        assert_eq!(c.earliest(command, g.bank_address(0, 0)) % T_CK, 0, "{command}");
    }
}
