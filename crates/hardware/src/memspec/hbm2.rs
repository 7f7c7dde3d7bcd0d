//! HBM2 pseudo channel mode. Each pseudo channel is modelled as a rank that
//! shares the command bus; per-bank refresh uses the REFSB timing of the
//! device (single bank).

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
    let rp = r.cycles("RP")?;
    let cke = r.cycles("CKE")?;
    let rrefd = r.cycles("RREFD")?;

    let mut refresh = RefreshModes::all_bank(r.cycles("REFI")?, r.cycles("RFC")?);
    refresh.per_bank = Some(RefreshTiming {
        interval: r.cycles("REFISB")?,
        cycle: r.cycles("RFCSB")?,
    });
    refresh.partial_to_partial = Some(rrefd);
    refresh.partial_to_activate = Some(rrefd);

    let timing = TimingParams {
        rcd_rd: r.cycles("RCDRD")?,
        rcd_wr: r.cycles("RCDWR")?,
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
        wtr_s: r.cycles("WTRS")?,
        wtr_l: r.cycles("WTRL")?,
        ccd_s: r.cycles("CCDS")?,
        ccd_l: r.cycles("CCDL")?,
        rrd_s: r.cycles("RRDS")?,
        rrd_l: r.cycles("RRDL")?,
        rtrs: r.cycles_or("RTRS", 1)?,
        rtw: Some(r.cycles("RTW")?),
        ppd: None,
        xp: r.cycles("XP")?,
        xs: r.cycles("XS")?,
        pd: cke,
        ckesr: cke + t_ck,
        actpden: t_ck,
        prpden: t_ck,
        refpden: t_ck,
        act_window: Some(ActivationWindow::four(r.cycles("FAW")?)),
        refresh,
    };

    MemSpec::assemble(r, MemoryType::Hbm2, geometry, timing, &[(Command::Act, 2)])
}
