//! Built-in device descriptions.
//!
//! Values follow the JEDEC speed bins named in each memory id. Timings are in
//! clock cycles of the listed `clkMhz`.

use super::MemoryType;
use crate::config::{Entries, MemSpecConfig};

fn preset<const A: usize, const T: usize>(
    memory_id: &str,
    memory_type: MemoryType,
    architecture: [(&str, f64); A],
    timing: [(&str, f64); T],
) -> MemSpecConfig {
    MemSpecConfig {
        memory_id: memory_id.to_string(),
        memory_type,
        memarchitecturespec: Entries::from(architecture),
        memtimingspec: Entries::from(timing),
    }
}

/// DDR4-2400, 8 Gb x8 devices, one rank of eight devices (64-bit channel).
pub fn ddr4_2400() -> MemSpecConfig {
    preset(
        "JEDEC_8Gb_DDR4-2400_x8",
        MemoryType::Ddr4,
        [
            ("nbrOfRanks", 1.0),
            ("nbrOfBankGroups", 4.0),
            ("nbrOfBanks", 16.0),
            ("nbrOfRows", 65536.0),
            ("nbrOfColumns", 1024.0),
            ("width", 8.0),
            ("nbrOfDevices", 8.0),
            ("burstLength", 8.0),
            ("dataRate", 2.0),
        ],
        [
            ("clkMhz", 1200.0),
            ("RCD", 16.0),
            ("RP", 16.0),
            ("RAS", 39.0),
            ("RC", 55.0),
            ("RL", 16.0),
            ("WL", 12.0),
            ("RTP", 9.0),
            ("WR", 18.0),
            ("WTR_S", 3.0),
            ("WTR_L", 9.0),
            ("CCD_S", 4.0),
            ("CCD_L", 6.0),
            ("RRD_S", 4.0),
            ("RRD_L", 6.0),
            ("FAW", 26.0),
            ("RTRS", 1.0),
            ("XP", 8.0),
            ("XS", 432.0),
            ("CKE", 6.0),
            ("CKESR", 7.0),
            ("ACTPDEN", 2.0),
            ("PRPDEN", 2.0),
            ("REFPDEN", 2.0),
            ("RFC", 420.0),
            ("REFI", 9360.0),
        ],
    )
}

/// DDR5-4800, 16 Gb x8 devices, one 32-bit sub-channel.
pub fn ddr5_4800() -> MemSpecConfig {
    preset(
        "JEDEC_16Gb_DDR5-4800_x8",
        MemoryType::Ddr5,
        [
            ("nbrOfRanks", 1.0),
            ("nbrOfBankGroups", 8.0),
            ("nbrOfBanks", 32.0),
            ("nbrOfRows", 65536.0),
            ("nbrOfColumns", 1024.0),
            ("width", 8.0),
            ("nbrOfDevices", 4.0),
            ("burstLength", 16.0),
            ("dataRate", 2.0),
        ],
        [
            ("clkMhz", 2400.0),
            ("RCD", 40.0),
            ("RP", 40.0),
            ("RAS", 77.0),
            ("RC", 117.0),
            ("RL", 40.0),
            ("WL", 38.0),
            ("RTP", 18.0),
            ("WR", 72.0),
            ("WTR_S", 6.0),
            ("WTR_L", 24.0),
            ("CCD_S", 8.0),
            ("CCD_L", 12.0),
            ("RRD_S", 8.0),
            ("RRD_L", 12.0),
            ("FAW", 32.0),
            ("RTRS", 2.0),
            ("XP", 18.0),
            ("XS", 720.0),
            ("PD", 18.0),
            ("CKESR", 24.0),
            ("RFC", 708.0),
            ("RFCsb", 312.0),
            ("REFSBRD", 72.0),
            ("REFI", 9360.0),
        ],
    )
}

/// LPDDR4-3200, one x16 channel.
pub fn lpddr4_3200() -> MemSpecConfig {
    preset(
        "JEDEC_8Gb_LPDDR4-3200_x16",
        MemoryType::Lpddr4,
        [
            ("nbrOfRanks", 1.0),
            ("nbrOfBanks", 8.0),
            ("nbrOfRows", 65536.0),
            ("nbrOfColumns", 1024.0),
            ("width", 16.0),
            ("nbrOfDevices", 1.0),
            ("burstLength", 16.0),
            ("dataRate", 2.0),
        ],
        [
            ("clkMhz", 1600.0),
            ("RCD", 29.0),
            ("RPpb", 29.0),
            ("RPab", 34.0),
            ("RAS", 68.0),
            ("RC", 97.0),
            ("RL", 28.0),
            ("WL", 14.0),
            ("DQSCK", 3.0),
            ("RTP", 12.0),
            ("WR", 29.0),
            ("WTR", 16.0),
            ("CCD", 8.0),
            ("RRD", 16.0),
            ("FAW", 64.0),
            ("PPD", 4.0),
            ("RTRS", 1.0),
            ("XP", 12.0),
            ("XSR", 460.0),
            ("CKE", 12.0),
            ("CKESR", 24.0),
            ("CMDCKE", 3.0),
            ("RFCab", 448.0),
            ("RFCpb", 224.0),
            ("PBR2PBR", 144.0),
            ("PBR2ACT", 16.0),
            ("REFI", 6240.0),
        ],
    )
}

/// LPDDR5-6400 in 16-bank mode, one x16 channel.
pub fn lpddr5_6400() -> MemSpecConfig {
    preset(
        "JEDEC_8Gb_LPDDR5-6400_x16",
        MemoryType::Lpddr5,
        [
            ("nbrOfRanks", 1.0),
            ("nbrOfBankGroups", 1.0),
            ("nbrOfBanks", 16.0),
            ("nbrOfRows", 65536.0),
            ("nbrOfColumns", 1024.0),
            ("width", 16.0),
            ("nbrOfDevices", 1.0),
            ("burstLength", 16.0),
            ("dataRate", 8.0),
        ],
        [
            ("clkMhz", 800.0),
            ("RCD", 15.0),
            ("RPpb", 15.0),
            ("RPab", 17.0),
            ("RAS", 34.0),
            ("RC", 48.0),
            ("RL", 17.0),
            ("WL", 9.0),
            ("RTP", 6.0),
            ("WR", 28.0),
            ("WTR", 10.0),
            ("CCD", 2.0),
            ("RRD", 4.0),
            ("FAW", 16.0),
            ("PPD", 2.0),
            ("RTRS", 1.0),
            ("XP", 6.0),
            ("XSR", 176.0),
            ("CKE", 2.0),
            ("CKESR", 12.0),
            ("RFCab", 224.0),
            ("RFCpb", 112.0),
            ("PBR2PBR", 72.0),
            ("PBR2ACT", 6.0),
            ("REFI", 3120.0),
        ],
    )
}

/// HBM2 at 1 GHz, two pseudo channels.
pub fn hbm2_2000() -> MemSpecConfig {
    preset(
        "JEDEC_HBM2_2000_PC",
        MemoryType::Hbm2,
        [
            ("nbrOfRanks", 2.0),
            ("nbrOfBankGroups", 4.0),
            ("nbrOfBanks", 16.0),
            ("nbrOfRows", 16384.0),
            ("nbrOfColumns", 64.0),
            ("width", 64.0),
            ("nbrOfDevices", 1.0),
            ("burstLength", 4.0),
            ("dataRate", 2.0),
        ],
        [
            ("clkMhz", 1000.0),
            ("RC", 48.0),
            ("RAS", 33.0),
            ("RCDRD", 14.0),
            ("RCDWR", 10.0),
            ("RRDL", 6.0),
            ("RRDS", 4.0),
            ("FAW", 16.0),
            ("RTP", 4.0),
            ("RP", 15.0),
            ("RL", 17.0),
            ("WL", 7.0),
            ("WR", 16.0),
            ("CCDL", 4.0),
            ("CCDS", 2.0),
            ("WTRL", 8.0),
            ("WTRS", 3.0),
            ("RTW", 18.0),
            ("XP", 8.0),
            ("CKE", 8.0),
            ("XS", 268.0),
            ("RFC", 260.0),
            ("RFCSB", 96.0),
            ("RREFD", 8.0),
            ("REFI", 3900.0),
            ("REFISB", 244.0),
        ],
    )
}

/// Wide I/O SDR at 200 MHz.
pub fn wideio_200() -> MemSpecConfig {
    preset(
        "JEDEC_WideIO_SDR-200_1Gb",
        MemoryType::WideIo,
        [
            ("nbrOfRanks", 1.0),
            ("nbrOfBanks", 4.0),
            ("nbrOfRows", 4096.0),
            ("nbrOfColumns", 128.0),
            ("width", 128.0),
            ("nbrOfDevices", 1.0),
            ("burstLength", 4.0),
            ("dataRate", 1.0),
        ],
        [
            ("clkMhz", 200.0),
            ("CKE", 3.0),
            ("CKESR", 3.0),
            ("AC", 1.0),
            ("RAS", 9.0),
            ("RC", 12.0),
            ("RCD", 3.0),
            ("RL", 3.0),
            ("WL", 1.0),
            ("WR", 3.0),
            ("XP", 2.0),
            ("XS", 24.0),
            ("CCD_R", 2.0),
            ("CCD_W", 1.0),
            ("REFI", 1560.0),
            ("RFC", 26.0),
            ("RP", 3.0),
            ("RRD", 2.0),
            ("TAW", 10.0),
            ("WTR", 3.0),
            ("RTRS", 1.0),
        ],
    )
}

/// Looks a preset up by a short name such as `ddr4` or `lpddr5-6400`.
pub fn by_name(name: &str) -> Option<MemSpecConfig> {
    match name.to_ascii_lowercase().as_str() {
        "ddr4" | "ddr4-2400" => Some(ddr4_2400()),
        "ddr5" | "ddr5-4800" => Some(ddr5_4800()),
        "lpddr4" | "lpddr4-3200" => Some(lpddr4_3200()),
        "lpddr5" | "lpddr5-6400" => Some(lpddr5_6400()),
        "hbm2" | "hbm2-2000" => Some(hbm2_2000()),
        "wideio" | "wideio-200" => Some(wideio_200()),
        _ => None,
    }
}

/// Short names accepted by [`by_name`].
pub const NAMES: [&str; 6] = ["ddr4", "ddr5", "lpddr4", "lpddr5", "hbm2", "wideio"];
