//! Inter-command timing constraints.
//!
//! The table maps each *next* command to the list of `(previous command,
//! scope, minimum separation)` triples that restrict it. Scope says which
//! earlier occurrence of the previous command counts: one on the same bank,
//! the same bank group, the same rank, any other rank of the channel, or any
//! rank at all.
//!
//! All device types share one derivation from [`TimingParams`]; type-specific
//! behaviour enters only through the parameter values.

use serde::Serialize;

use super::TimingParams;
use crate::common::{Command, Time};

/// Which earlier occurrence of a command a constraint refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Scope {
    Bank,
    BankGroup,
    Rank,
    /// Ranks of the channel other than the target's.
    OtherRanks,
    /// Any rank of the channel, the target's included.
    Channel,
}

/// One `previous --delay--> next` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Constraint {
    pub previous: Command,
    pub scope: Scope,
    pub delay: Time,
}

/// Rolling limit on activations per rank (tFAW, or tTAW on Wide I/O).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActivationWindow {
    /// ACTs allowed inside one window.
    pub activations: usize,
    pub span: Time,
}

impl ActivationWindow {
    pub fn four(span: Time) -> Self {
        Self {
            activations: 4,
            span,
        }
    }

    pub fn two(span: Time) -> Self {
        Self {
            activations: 2,
            span,
        }
    }
}

/// Constraint rules indexed by the next command.
#[derive(Debug, Clone)]
pub struct ConstraintTable {
    by_next: Vec<Vec<Constraint>>,
    window: Option<ActivationWindow>,
    horizon: Time,
}

impl ConstraintTable {
    /// Rules restricting `next`.
    pub fn for_command(&self, next: Command) -> &[Constraint] {
        &self.by_next[next.index()]
    }

    pub fn activation_window(&self) -> Option<ActivationWindow> {
        self.window
    }

    /// Longest distance any rule looks back. History older than this can
    /// never constrain a future command.
    pub fn horizon(&self) -> Time {
        self.horizon
    }

    pub fn len(&self) -> usize {
        self.by_next.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Builder {
    by_next: Vec<Vec<Constraint>>,
}

impl Builder {
    fn new() -> Self {
        Self {
            by_next: vec![Vec::new(); Command::COUNT],
        }
    }

    /// Adds `delay` between every pair of `previous` and `next`. Zero delays
    /// are dropped; duplicate rules keep the larger delay.
    fn add(&mut self, previous: &[Command], next: &[Command], scope: Scope, delay: Time) {
        if delay == 0 {
            return;
        }
        for &n in next {
            let rules = &mut self.by_next[n.index()];
            for &p in previous {
                match rules
                    .iter_mut()
                    .find(|c| c.previous == p && c.scope == scope)
                {
                    Some(existing) => existing.delay = existing.delay.max(delay),
                    None => rules.push(Constraint {
                        previous: p,
                        scope,
                        delay,
                    }),
                }
            }
        }
    }

    fn build(self, window: Option<ActivationWindow>, command_cycles: &[u64], t_ck: Time) -> ConstraintTable {
        let rule_max = self
            .by_next
            .iter()
            .flatten()
            .map(|c| c.delay)
            .max()
            .unwrap_or(0);
        let bus_max = command_cycles.iter().copied().max().unwrap_or(1) * t_ck;
        let window_max = window.map_or(0, |w| w.span);
        ConstraintTable {
            by_next: self.by_next,
            window,
            horizon: rule_max.max(bus_max).max(window_max),
        }
    }
}

use Command::*;

const READS: &[Command] = &[Rd, Rda];
const WRITES: &[Command] = &[Wr, Wra];
const CAS: &[Command] = &[Rd, Rda, Wr, Wra];
const PRECHARGES_PB: &[Command] = &[Prepb, Presb];
const PARTIAL_REFRESHES: &[Command] = &[Refpb, Refp2b, Refsb];
const POWER_DOWN_ENTRIES: &[Command] = &[Pdea, Pdep];
const POWER_DOWN_EXITS: &[Command] = &[Pdxa, Pdxp];

/// Derives the constraint table of a device.
pub(super) fn build(t: &TimingParams, t_ck: Time, command_cycles: &[u64]) -> ConstraintTable {
    let mut b = Builder::new();
    let refresh = &t.refresh;
    let rfc_ab = refresh.all_bank.cycle;
    let rfc_pb = refresh.per_bank.map_or(rfc_ab, |r| r.cycle);
    let rfc_sb = refresh.same_bank.map_or(rfc_ab, |r| r.cycle);
    let rfc_p2b = refresh.per_two_bank.map_or(rfc_pb, |r| r.cycle);

    let read_data_end = t.rl + t.dqsck + t.burst;
    let write_data_end = t.wl + t.burst;
    let write_recovery = write_data_end + t.wr;
    let rda_to_act = (t.rtp + t.rp_pb).max(read_data_end);
    let wra_to_act = write_recovery + t.rp_pb;
    let rd_to_wr = t
        .rtw
        .unwrap_or_else(|| (read_data_end + 2 * t_ck).saturating_sub(t.wl));
    let rd_to_pde = read_data_end + t_ck;
    let wr_to_pde = write_recovery + t_ck;

    // ACT
    b.add(&[Act], &[Act], Scope::Bank, t.rc);
    b.add(&[Act], &[Act], Scope::BankGroup, t.rrd_l);
    b.add(&[Act], &[Act], Scope::Rank, t.rrd_s);
    b.add(PRECHARGES_PB, &[Act], Scope::Bank, t.rp_pb);
    b.add(&[Preab], &[Act], Scope::Bank, t.rp_ab);
    b.add(&[Rda], &[Act], Scope::Bank, rda_to_act);
    b.add(&[Wra], &[Act], Scope::Bank, wra_to_act);
    b.add(&[Refab], &[Act], Scope::Bank, rfc_ab);
    b.add(&[Refpb], &[Act], Scope::Bank, rfc_pb);
    b.add(&[Refsb], &[Act], Scope::Bank, rfc_sb);
    b.add(&[Refp2b], &[Act], Scope::Bank, rfc_p2b);
    if let Some(delay) = refresh.partial_to_activate {
        b.add(PARTIAL_REFRESHES, &[Act], Scope::Rank, delay);
    }

    // Column commands.
    b.add(&[Act], READS, Scope::Bank, t.rcd_rd);
    b.add(&[Act], WRITES, Scope::Bank, t.rcd_wr);
    b.add(READS, READS, Scope::BankGroup, t.ccd_l);
    b.add(READS, READS, Scope::Rank, t.ccd_s);
    b.add(READS, READS, Scope::OtherRanks, t.burst + t.rtrs);
    b.add(WRITES, WRITES, Scope::BankGroup, t.ccd_l);
    b.add(WRITES, WRITES, Scope::Rank, t.ccd_s);
    b.add(WRITES, WRITES, Scope::OtherRanks, t.burst + t.rtrs);
    b.add(WRITES, READS, Scope::BankGroup, write_data_end + t.wtr_l);
    b.add(WRITES, READS, Scope::Rank, write_data_end + t.wtr_s);
    b.add(
        WRITES,
        READS,
        Scope::OtherRanks,
        (write_data_end + t.rtrs).saturating_sub(t.rl + t.dqsck),
    );
    b.add(READS, WRITES, Scope::Channel, rd_to_wr);

    // Precharge.
    let precharges = &[Prepb, Presb, Preab];
    b.add(&[Act], precharges, Scope::Bank, t.ras);
    b.add(&[Rd], precharges, Scope::Bank, t.rtp);
    b.add(&[Wr], precharges, Scope::Bank, write_recovery);
    b.add(&[Rda], &[Preab, Presb], Scope::Bank, t.rtp);
    b.add(&[Wra], &[Preab, Presb], Scope::Bank, write_recovery);
    if let Some(ppd) = t.ppd {
        b.add(precharges, precharges, Scope::Rank, ppd);
    }

    // Refresh.
    let all_refreshes = &[Refab, Refpb, Refp2b, Refsb];
    b.add(&[Act], all_refreshes, Scope::Bank, t.rc);
    b.add(PRECHARGES_PB, all_refreshes, Scope::Bank, t.rp_pb);
    b.add(&[Preab], all_refreshes, Scope::Bank, t.rp_ab);
    b.add(&[Rda], all_refreshes, Scope::Bank, rda_to_act);
    b.add(&[Wra], all_refreshes, Scope::Bank, wra_to_act);
    b.add(&[Refab], all_refreshes, Scope::Rank, rfc_ab);
    b.add(&[Refpb], all_refreshes, Scope::Bank, rfc_pb);
    b.add(&[Refsb], all_refreshes, Scope::Bank, rfc_sb);
    b.add(&[Refp2b], all_refreshes, Scope::Bank, rfc_p2b);
    b.add(&[Act], PARTIAL_REFRESHES, Scope::Rank, t.rrd_s);
    if let Some(delay) = refresh.partial_to_partial {
        b.add(PARTIAL_REFRESHES, PARTIAL_REFRESHES, Scope::Rank, delay);
    }

    // Power-down and self-refresh entry.
    let entries = &[Pdea, Pdep, Srefen];
    b.add(&[Act], entries, Scope::Rank, t.actpden);
    b.add(READS, entries, Scope::Rank, rd_to_pde);
    b.add(&[Wr], entries, Scope::Rank, wr_to_pde);
    b.add(&[Wra], entries, Scope::Rank, wr_to_pde + t.rp_pb);
    b.add(&[Prepb, Presb, Preab], entries, Scope::Rank, t.prpden);
    b.add(all_refreshes, entries, Scope::Rank, t.refpden);
    // Self-refresh needs every bank settled.
    b.add(&[Act], &[Srefen], Scope::Rank, t.rc);
    b.add(PRECHARGES_PB, &[Srefen], Scope::Rank, t.rp_pb);
    b.add(&[Preab], &[Srefen], Scope::Rank, t.rp_ab);
    b.add(&[Rda], &[Srefen], Scope::Rank, rda_to_act);
    b.add(&[Wra], &[Srefen], Scope::Rank, wra_to_act);
    b.add(&[Refab], &[Srefen], Scope::Rank, rfc_ab);
    b.add(&[Refpb], &[Srefen], Scope::Rank, rfc_pb);
    b.add(&[Refsb], &[Srefen], Scope::Rank, rfc_sb);
    b.add(&[Refp2b], &[Srefen], Scope::Rank, rfc_p2b);

    // Exits.
    b.add(POWER_DOWN_ENTRIES, POWER_DOWN_EXITS, Scope::Rank, t.pd);
    b.add(&[Srefen], &[Srefex], Scope::Rank, t.ckesr);

    // Everything after an exit.
    let after_exit: Vec<Command> = Command::ALL
        .into_iter()
        .filter(|c| !c.is_power_down_exit())
        .collect();
    b.add(POWER_DOWN_EXITS, &after_exit, Scope::Rank, t.xp);
    b.add(&[Srefex], &after_exit, Scope::Rank, t.xs);

    b.build(t.act_window, command_cycles, t_ck)
}
