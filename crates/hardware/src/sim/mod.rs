//! Simulation driver around the controller: event loop, traffic initiators
//! and the address mapping they use.

pub mod address;
pub mod generator;
pub mod initiator;
pub mod simulator;
pub mod trace;

pub use address::{AddressMapper, Decoded};
pub use generator::RowHammer;
pub use initiator::{Emit, Initiator, ScriptedInitiator};
pub use simulator::Simulator;
pub use trace::{TracePlayer, TraceTiming};
