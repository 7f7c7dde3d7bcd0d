//! Each expected value below is worked out by hand from the preset's cycle
//! counts, so a wrong or missing rule in the constraint table shows up here
//! even though the harness replay shares that table.

use std::sync::Arc;

use dramctl::controller::checker::TimingChecker;
use dramctl::memspec::presets;
use dramctl::{Command, MemSpec};
use pretty_assertions::assert_eq;

const T: u64 = 1_000;

/// `device` with its clock set to 1 GHz, so cycle counts read as nanoseconds.
fn checker(device: &str) -> TimingChecker {
    let mut config = presets::by_name(device).unwrap();
    config.memtimingspec.set("clkMhz", 1000.0);
    TimingChecker::new(Arc::new(MemSpec::from_config(&config).unwrap()))
}

#[test]
fn test_ddr5_activate_spacing_follows_bank_groups() {
    let mut c = checker("ddr5");
    let g = c.memspec().geometry;
    c.insert(Command::Act, g.bank_address(0, 0), 0);
    // tRRD_L inside the group, tRRD_S across groups.
    assert_eq!(c.earliest(Command::Act, g.bank_address(0, 1)), 12 * T);
    assert_eq!(c.earliest(Command::Act, g.bank_address(0, 4)), 8 * T);
    assert_eq!(c.earliest(Command::Rd, g.bank_address(0, 0)), 40 * T);
}

#[test]
fn test_ddr5_write_to_read() {
    let mut c = checker("ddr5");
    let g = c.memspec().geometry;
    c.insert(Command::Wr, g.bank_address(0, 0), 0);
    // WL 38 + BL16/2 + tWTR_L 24, or + tWTR_S 6 in another group.
    assert_eq!(c.earliest(Command::Rd, g.bank_address(0, 1)), 70 * T);
    assert_eq!(c.earliest(Command::Rd, g.bank_address(0, 4)), 52 * T);
}

#[test]
fn test_ddr5_same_bank_refresh() {
    let mut c = checker("ddr5");
    let g = c.memspec().geometry;
    c.insert(Command::Refsb, g.rank_address(0), 0);
    // Bank 4 is bank 0 of group 1: refreshed, so tRFCsb.
    assert_eq!(c.earliest(Command::Act, g.bank_address(0, 4)), 312 * T);
    // Bank 1 is untouched: only tREFSBRD.
    assert_eq!(c.earliest(Command::Act, g.bank_address(0, 1)), 72 * T);
    assert_eq!(c.earliest(Command::Refsb, g.bank_address(0, 1)), 72 * T);
}

#[test]
fn test_lpddr4_per_bank_refresh() {
    let mut c = checker("lpddr4");
    let g = c.memspec().geometry;
    c.insert(Command::Refpb, g.bank_address(0, 0), 0);
    assert_eq!(c.earliest(Command::Act, g.bank_address(0, 0)), 224 * T);
    // PBR2ACT on the other banks, PBR2PBR between per-bank refreshes.
    assert_eq!(c.earliest(Command::Act, g.bank_address(0, 3)), 16 * T);
    assert_eq!(c.earliest(Command::Refpb, g.bank_address(0, 1)), 144 * T);
}

#[test]
fn test_lpddr4_write_to_read_uses_a_single_wtr() {
    let mut c = checker("lpddr4");
    let g = c.memspec().geometry;
    c.insert(Command::Wr, g.bank_address(0, 0), 0);
    // WL 14 + BL16/2 + tWTR 16, same for every bank.
    for bank in [0, 5] {
        assert_eq!(c.earliest(Command::Rd, g.bank_address(0, bank)), 38 * T);
    }
}

#[test]
fn test_hbm2_row_to_column_differs_by_direction() {
    let mut c = checker("hbm2");
    let g = c.memspec().geometry;
    c.insert(Command::Act, g.bank_address(0, 0), 0);
    assert_eq!(c.earliest(Command::Rd, g.bank_address(0, 0)), 14 * T);
    assert_eq!(c.earliest(Command::Wr, g.bank_address(0, 0)), 10 * T);
    assert_eq!(c.earliest(Command::Act, g.bank_address(0, 1)), 6 * T);
    assert_eq!(c.earliest(Command::Act, g.bank_address(0, 4)), 4 * T);
}

#[test]
fn test_hbm2_turnarounds() {
    let mut c = checker("hbm2");
    let g = c.memspec().geometry;
    c.insert(Command::Rd, g.bank_address(0, 0), 0);
    // tRTW is given directly and spans both pseudo channels.
    assert_eq!(c.earliest(Command::Wr, g.bank_address(0, 9)), 18 * T);
    assert_eq!(c.earliest(Command::Wr, g.bank_address(1, 0)), 18 * T);

    let mut c = checker("hbm2");
    c.insert(Command::Wr, g.bank_address(0, 0), 0);
    // WL 7 + BL4/2 + tWTR_L 8 or tWTR_S 3.
    assert_eq!(c.earliest(Command::Rd, g.bank_address(0, 1)), 17 * T);
    assert_eq!(c.earliest(Command::Rd, g.bank_address(0, 4)), 12 * T);
}

#[test]
fn test_hbm2_single_bank_refresh() {
    let mut c = checker("hbm2");
    let g = c.memspec().geometry;
    c.insert(Command::Refpb, g.bank_address(0, 2), 0);
    assert_eq!(c.earliest(Command::Act, g.bank_address(0, 2)), 96 * T);
    assert_eq!(c.earliest(Command::Act, g.bank_address(0, 3)), 8 * T);
}

#[test]
fn test_wideio_two_activate_window() {
    let mut c = checker("wideio");
    let g = c.memspec().geometry;
    c.insert(Command::Act, g.bank_address(0, 0), 0);
    assert_eq!(c.earliest(Command::Act, g.bank_address(0, 1)), 2 * T);
    c.insert(Command::Act, g.bank_address(0, 1), 2 * T);
    // tRRD alone would allow 4 ns; tTAW holds the third ACT back.
    assert_eq!(c.earliest(Command::Act, g.bank_address(0, 2)), 10 * T);
}

#[test]
fn test_wideio_column_timing() {
    let mut c = checker("wideio");
    let g = c.memspec().geometry;
    c.insert(Command::Rd, g.bank_address(0, 0), 0);
    // max(tCCD_R, tCCD_W) between column commands; tRTP is one burst.
    assert_eq!(c.earliest(Command::Rd, g.bank_address(0, 1)), 2 * T);
    assert_eq!(c.earliest(Command::Prepb, g.bank_address(0, 0)), 4 * T);

    let mut c = checker("wideio");
    c.insert(Command::Wr, g.bank_address(0, 0), 0);
    // WL 1 + BL4 at single data rate + tWTR 3.
    assert_eq!(c.earliest(Command::Rd, g.bank_address(0, 2)), 8 * T);
}
