//! Python bindings for the dramctl DRAM controller simulator.
//!
//! Built as the `_core` extension module. The CLI registers the same
//! contents as a top-level `dramctl` module for `--script` runs.

mod conversion;
mod simulator;
mod stats;

use pyo3::prelude::*;

pub use simulator::PySimulator;
pub use stats::PyStats;

/// Adds the simulator classes to `m`.
pub fn register_dramctl_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PySimulator>()?;
    m.add_class::<PyStats>()?;
    m.add_function(wrap_pyfunction!(simulator::default_config, m)?)?;
    Ok(())
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    register_dramctl_module(m)
}
