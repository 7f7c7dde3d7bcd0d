//! DRAM command set.
//!
//! Every command the scheduler can put on the command bus. A command is a
//! plain `Copy` value; which banks it touches is described by its
//! [`Footprint`] and resolved against the device geometry by
//! [`Geometry::footprint`](crate::memspec::Geometry::footprint).
//!
//! "No command" is expressed as `Option::<Command>::None` rather than a
//! dedicated NOP variant.

use std::fmt;

use serde::Serialize;

/// A DRAM command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Command {
    /// Column read.
    Rd,
    /// Column write.
    Wr,
    /// Column read with auto-precharge.
    Rda,
    /// Column write with auto-precharge.
    Wra,
    /// Row activate.
    Act,
    /// Precharge one bank.
    Prepb,
    /// Precharge every bank of a rank.
    Preab,
    /// Precharge the same bank index in every bank group.
    Presb,
    /// All-bank refresh.
    Refab,
    /// Per-bank refresh.
    Refpb,
    /// Refresh of a bank pair (b, b + banks/2).
    Refp2b,
    /// Same-bank refresh across all bank groups.
    Refsb,
    /// Active power-down entry.
    Pdea,
    /// Active power-down exit.
    Pdxa,
    /// Precharge power-down entry.
    Pdep,
    /// Precharge power-down exit.
    Pdxp,
    /// Self-refresh entry.
    Srefen,
    /// Self-refresh exit.
    Srefex,
}

/// Set of banks a command acts on, relative to its target bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Footprint {
    /// The target bank only.
    Bank,
    /// The target's bank index in every bank group of the rank.
    SameBank,
    /// The target bank and its partner half a rank away.
    BankPair,
    /// Every bank of the target's rank.
    Rank,
}

impl Command {
    /// Number of distinct commands.
    pub const COUNT: usize = 18;

    /// All commands in declaration order.
    pub const ALL: [Command; Command::COUNT] = [
        Command::Rd,
        Command::Wr,
        Command::Rda,
        Command::Wra,
        Command::Act,
        Command::Prepb,
        Command::Preab,
        Command::Presb,
        Command::Refab,
        Command::Refpb,
        Command::Refp2b,
        Command::Refsb,
        Command::Pdea,
        Command::Pdxa,
        Command::Pdep,
        Command::Pdxp,
        Command::Srefen,
        Command::Srefex,
    ];

    /// Dense index for table lookups.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Mnemonic as used in command traces.
    pub const fn name(self) -> &'static str {
        match self {
            Command::Rd => "RD",
            Command::Wr => "WR",
            Command::Rda => "RDA",
            Command::Wra => "WRA",
            Command::Act => "ACT",
            Command::Prepb => "PREPB",
            Command::Preab => "PREAB",
            Command::Presb => "PRESB",
            Command::Refab => "REFAB",
            Command::Refpb => "REFPB",
            Command::Refp2b => "REFP2B",
            Command::Refsb => "REFSB",
            Command::Pdea => "PDEA",
            Command::Pdxa => "PDXA",
            Command::Pdep => "PDEP",
            Command::Pdxp => "PDXP",
            Command::Srefen => "SREFEN",
            Command::Srefex => "SREFEX",
        }
    }

    /// Banks affected by this command relative to its target.
    pub const fn footprint(self) -> Footprint {
        match self {
            Command::Rd
            | Command::Wr
            | Command::Rda
            | Command::Wra
            | Command::Act
            | Command::Prepb
            | Command::Refpb => Footprint::Bank,
            Command::Presb | Command::Refsb => Footprint::SameBank,
            Command::Refp2b => Footprint::BankPair,
            Command::Preab
            | Command::Refab
            | Command::Pdea
            | Command::Pdxa
            | Command::Pdep
            | Command::Pdxp
            | Command::Srefen
            | Command::Srefex => Footprint::Rank,
        }
    }

    /// Column (CAS) command.
    pub const fn is_cas(self) -> bool {
        matches!(self, Command::Rd | Command::Wr | Command::Rda | Command::Wra)
    }

    pub const fn is_read(self) -> bool {
        matches!(self, Command::Rd | Command::Rda)
    }

    pub const fn is_write(self) -> bool {
        matches!(self, Command::Wr | Command::Wra)
    }

    /// Column command that closes the row afterwards.
    pub const fn is_auto_precharge(self) -> bool {
        matches!(self, Command::Rda | Command::Wra)
    }

    pub const fn is_precharge(self) -> bool {
        matches!(self, Command::Prepb | Command::Preab | Command::Presb)
    }

    pub const fn is_refresh(self) -> bool {
        matches!(
            self,
            Command::Refab | Command::Refpb | Command::Refp2b | Command::Refsb
        )
    }

    /// Power-down or self-refresh entry.
    pub const fn is_power_down_entry(self) -> bool {
        matches!(self, Command::Pdea | Command::Pdep | Command::Srefen)
    }

    /// Power-down or self-refresh exit.
    pub const fn is_power_down_exit(self) -> bool {
        matches!(self, Command::Pdxa | Command::Pdxp | Command::Srefex)
    }

    /// Commands issued on behalf of a whole rank rather than a bank queue.
    pub const fn is_rank_command(self) -> bool {
        matches!(self.footprint(), Footprint::Rank)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
