//! LPDDR4: eight banks, no bank groups, multi-cycle commands on the CA bus,
//! all-bank and per-bank refresh.

use super::reader::SpecReader;
use super::{
    ActivationWindow, Geometry, MemSpec, MemoryType, RefreshModes, RefreshTiming, TimingParams,
};
use crate::common::{Command, ConfigError};

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
        data_rate: r.count_or("dataRate", 2)?,
    };
    let t_ck = r.t_ck();
    let rcd = r.cycles("RCD")?;
    let wtr = r.cycles("WTR")?;
    let ccd = r.cycles("CCD")?;
    let rrd = r.cycles("RRD")?;
    let cmdcke = r.cycles_or("CMDCKE", 1)?;
    let refi = r.cycles("REFI")?;

    let mut refresh = RefreshModes::all_bank(refi, r.cycles("RFCab")?);
    refresh.per_bank = Some(RefreshTiming {
        interval: refi / geometry.banks_per_rank as u64,
        cycle: r.cycles("RFCpb")?,
    });
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
        dqsck: r.cycles_or("DQSCK", 0)?,
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
        actpden: cmdcke,
        prpden: cmdcke,
        refpden: cmdcke,
        act_window: Some(ActivationWindow::four(r.cycles("FAW")?)),
        refresh,
    };

    MemSpec::assemble(
        r,
        MemoryType::Lpddr4,
        geometry,
        timing,
        &[
            (Command::Act, 4),
            (Command::Rd, 4),
            (Command::Wr, 4),
            (Command::Rda, 4),
            (Command::Wra, 4),
            (Command::Prepb, 2),
            (Command::Preab, 2),
            (Command::Refab, 2),
            (Command::Refpb, 2),
            (Command::Srefen, 2),
            (Command::Srefex, 2),
        ],
    )
}
