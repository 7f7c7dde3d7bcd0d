//! DDR5: eight bank groups, two-cycle ACT and CAS, all-bank and same-bank
//! refresh.

use super::reader::SpecReader;
use super::{
    ActivationWindow, Geometry, MemSpec, MemoryType, RefreshModes, RefreshTiming, TimingParams,
};
use crate::common::{Command, ConfigError};

pub(super) fn build(r: &SpecReader<'_>) -> Result<MemSpec, ConfigError> {
    let geometry = Geometry {
        ranks: r.count("nbrOfRanks")?,
        bank_groups_per_rank: r.count("nbrOfBankGroups")?,
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
    let rp = r.cycles("RP")?;
    let refi = r.cycles("REFI")?;
    let refsbrd = r.cycles("REFSBRD")?;

    let mut refresh = RefreshModes::all_bank(refi, r.cycles("RFC")?);
    refresh.same_bank = Some(RefreshTiming {
        interval: refi / geometry.banks_per_group().max(1) as u64,
        cycle: r.cycles("RFCsb")?,
    });
    refresh.partial_to_partial = Some(refsbrd);
    refresh.partial_to_activate = Some(refsbrd);

    let timing = TimingParams {
        rcd_rd: rcd,
        rcd_wr: rcd,
        rp_pb: rp,
        rp_ab: rp,
        ras: r.cycles("RAS")?,
        rc: r.cycles("RC")?,
        rl: r.cycles("RL")?,
        wl: r.cycles("WL")?,
        dqsck: r.cycles_or("DQSCK", 0)?,
        burst: geometry.burst_length as u64 * t_ck / geometry.data_rate as u64,
        rtp: r.cycles("RTP")?,
        wr: r.cycles("WR")?,
        wtr_s: r.cycles("WTR_S")?,
        wtr_l: r.cycles("WTR_L")?,
        ccd_s: r.cycles("CCD_S")?,
        ccd_l: r.cycles("CCD_L")?,
        rrd_s: r.cycles("RRD_S")?,
        rrd_l: r.cycles("RRD_L")?,
        rtrs: r.cycles("RTRS")?,
        rtw: None,
        ppd: r.cycles_opt("PPD")?,
        xp: r.cycles("XP")?,
        xs: r.cycles("XS")?,
        pd: r.cycles("PD")?,
        ckesr: r.cycles("CKESR")?,
        actpden: r.cycles_or("ACTPDEN", 1)?,
        prpden: r.cycles_or("PRPDEN", 1)?,
        refpden: r.cycles_or("REFPDEN", 1)?,
        act_window: Some(ActivationWindow::four(r.cycles("FAW")?)),
        refresh,
    };

    MemSpec::assemble(
        r,
        MemoryType::Ddr5,
        geometry,
        timing,
        &[
            (Command::Act, 2),
            (Command::Rd, 2),
            (Command::Wr, 2),
            (Command::Rda, 2),
            (Command::Wra, 2),
        ],
    )
}
