//! LPDDR5 in 16-bank mode. Data moves on WCK, so `dataRate` counts beats per
//! CK and is typically 8. Supports all-bank, per-bank and per-two-bank
//! refresh.

use super::reader::SpecReader;
use super::{
    ActivationWindow, Geometry, MemSpec, MemoryType, RefreshModes, RefreshTiming, TimingParams,
};
use crate::common::{Command, ConfigError};

pub(super) fn build(r: &SpecReader<'_>) -> Result<MemSpec, ConfigError> {
    let geometry = Geometry {
        ranks: r.count("nbrOfRanks")?,
        bank_groups_per_rank: r.count_or("nbrOfBankGroups", 1)?,
        banks_per_rank: r.count("nbrOfBanks")?,
        rows: r.count("nbrOfRows")?,
        columns: r.count("nbrOfColumns")?,
        device_width: r.count("width")?,
        devices_per_rank: r.count_or("nbrOfDevices", 1)?,
        burst_length: r.count("burstLength")?,
        data_rate: r.count("dataRate")?,
    };
    let t_ck = r.t_ck();
    let rcd = r.cycles("RCD")?;
    let wtr = r.cycles("WTR")?;
    let ccd = r.cycles("CCD")?;
    let rrd = r.cycles("RRD")?;
    let refi = r.cycles("REFI")?;
    let rfc_pb = r.cycles("RFCpb")?;
    let banks = geometry.banks_per_rank as u64;

    let mut refresh = RefreshModes::all_bank(refi, r.cycles("RFCab")?);
    refresh.per_bank = Some(RefreshTiming {
        interval: refi / banks,
        cycle: rfc_pb,
    });
    if banks >= 2 {
        refresh.per_two_bank = Some(RefreshTiming {
            interval: refi / (banks / 2),
            cycle: r.cycles_or("RFCp2b", 0)?.max(rfc_pb),
        });
    }
    refresh.partial_to_partial = Some(r.cycles("PBR2PBR")?);
    refresh.partial_to_activate = Some(r.cycles("PBR2ACT")?);

    let timing = TimingParams {
        rcd_rd: rcd,
        rcd_wr: rcd,
        rp_pb: r.cycles("RPpb")?,
        rp_ab: r.cycles("RPab")?,
        ras: r.cycles("RAS")?,
        rc: r.cycles("RC")?,
        rl: r.cycles("RL")?,
        wl: r.cycles("WL")?,
        dqsck: r.cycles_or("WCK2DQO", 0)?,
        burst: geometry.burst_length as u64 * t_ck / geometry.data_rate as u64,
        rtp: r.cycles("RTP")?,
        wr: r.cycles("WR")?,
        wtr_s: wtr,
        wtr_l: wtr,
        ccd_s: ccd,
        ccd_l: ccd,
        rrd_s: rrd,
        rrd_l: rrd,
        rtrs: r.cycles("RTRS")?,
        rtw: None,
        ppd: r.cycles_opt("PPD")?,
        xp: r.cycles("XP")?,
        xs: r.cycles("XSR")?,
        pd: r.cycles("CKE")?,
        ckesr: r.cycles("CKESR")?,
        actpden: r.cycles_or("CMDPD", 1)?,
        prpden: r.cycles_or("CMDPD", 1)?,
        refpden: r.cycles_or("CMDPD", 1)?,
        act_window: Some(ActivationWindow::four(r.cycles("FAW")?)),
        refresh,
    };

    MemSpec::assemble(r, MemoryType::Lpddr5, geometry, timing, &[(Command::Act, 2)])
}
