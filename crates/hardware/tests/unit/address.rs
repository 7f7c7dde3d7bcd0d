use dramctl::memspec::presets;
use dramctl::sim::{AddressMapper, Decoded};
use dramctl::{ConfigError, MemSpec};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn mapper(ranks: f64) -> AddressMapper {
    let mut config = presets::ddr4_2400();
    config.memarchitecturespec.set("nbrOfRanks", ranks);
    AddressMapper::new(&MemSpec::from_config(&config).unwrap()).unwrap()
}

fn at(rank: usize, bank: usize, row: u32, column: u32) -> Decoded {
    Decoded {
        rank,
        bank,
        row,
        column,
    }
}

// DDR4 x64: 3 byte bits, 10 column bits, 2 group bits, 2 bank bits, 16 row bits.
#[rstest]
#[case::zero(0x0, at(0, 0, 0, 0))]
#[case::next_burst(0x40, at(0, 0, 0, 8))]
#[case::bank_group(1 << 13, at(0, 4, 0, 0))]
#[case::bank_in_group(1 << 15, at(0, 1, 0, 0))]
#[case::row(3 << 17, at(0, 0, 3, 0))]
#[case::above_the_device(1 << 40, at(0, 0, 0, 0))]
fn test_single_rank_fields(#[case] address: u64, #[case] expected: Decoded) {
    assert_eq!(mapper(1.0).decode(address), expected);
}

#[test]
fn test_rank_bit_sits_below_the_row() {
    let m = mapper(2.0);
    assert_eq!(m.decode(1 << 17), at(1, 0, 0, 0));
    assert_eq!(m.decode(m.row_address(9)), at(0, 0, 9, 0));
    assert_eq!(m.row_address(1), 1 << 18);
}

#[test]
fn test_non_power_of_two_rows_cannot_be_mapped() {
    let mut config = presets::ddr4_2400();
    config.memarchitecturespec.set("nbrOfRows", 1000.0);
    let spec = MemSpec::from_config(&config).unwrap();
    match AddressMapper::new(&spec) {
        Err(ConfigError::InvalidParameter { key, .. }) => assert_eq!(key, "nbrOfRows"),
        other => panic!("unexpected result: {other:?}"),
    }
}
