//! Controller component tests.

/// Earliest-issue computation across bank, bank group, rank and channel.
pub mod checker;

/// Refresh manager construction and idle-rank behavior.
pub mod refresh;

/// Hand-derived delays of the non-DDR4 devices at a 1 ns clock.
pub mod device_rules;
