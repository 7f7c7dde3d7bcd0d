//! Wide I/O SDR: single data rate, four banks, two-activate window.

use super::reader::SpecReader;
use super::{ActivationWindow, Geometry, MemSpec, MemoryType, RefreshModes, TimingParams};
use crate::common::ConfigError;

pub(super) fn build(r: &SpecReader<'_>) -> Result<MemSpec, ConfigError> {
    let geometry = Geometry {
        ranks: r.count("nbrOfRanks")?,
        bank_groups_per_rank: 1,
        banks_per_rank: r.count("nbrOfBanks")?,
        rows: r.count("nbrOfRows")?,
        columns: r.count("nbrOfColumns")?,
        device_width: r.count("width")?,
        devices_per_rank: r.count_or("nbrOfDevices", 1)?,
        burst_length: r.count("burstLength")?,
        data_rate: r.count_or("dataRate", 1)?,
    };
    let t_ck = r.t_ck();
    let burst = geometry.burst_length as u64 * t_ck / geometry.data_rate as u64;
    let rcd = r.cycles("RCD")?;
    let rp = r.cycles("RP")?;
    let wtr = r.cycles("WTR")?;
    let rrd = r.cycles("RRD")?;
    // One column-to-column spacing covers both directions.
    let ccd = r.cycles("CCD_R")?.max(r.cycles("CCD_W")?);

    let timing = TimingParams {
        rcd_rd: rcd,
        rcd_wr: rcd,
        rp_pb: rp,
        rp_ab: rp,
        ras: r.cycles("RAS")?,
        rc: r.cycles("RC")?,
        rl: r.cycles("RL")?,
        wl: r.cycles("WL")?,
        dqsck: r.cycles_or("AC", 0)?,
        burst,
        rtp: burst,
        wr: r.cycles("WR")?,
        wtr_s: wtr,
        wtr_l: wtr,
        ccd_s: ccd,
        ccd_l: ccd,
        rrd_s: rrd,
        rrd_l: rrd,
        rtrs: r.cycles("RTRS")?,
        rtw: None,
        ppd: None,
        xp: r.cycles("XP")?,
        xs: r.cycles("XS")?,
        pd: r.cycles("CKE")?,
        ckesr: r.cycles("CKESR")?,
        actpden: t_ck,
        prpden: t_ck,
        refpden: t_ck,
        act_window: Some(ActivationWindow::two(r.cycles("TAW")?)),
        refresh: RefreshModes::all_bank(r.cycles("REFI")?, r.cycles("RFC")?),
    };

    MemSpec::assemble(r, MemoryType::WideIo, geometry, timing, &[])
}
