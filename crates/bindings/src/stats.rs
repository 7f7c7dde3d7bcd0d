//! Statistics snapshot exposed to Python.

use dramctl::Command;
use dramctl::common::time::to_ns;
use dramctl::stats::ControllerStats;
use pyo3::prelude::*;
use pyo3::types::PyDict;

/// Read-only copy of the controller statistics at the time it was taken.
#[pyclass(frozen)]
pub struct PyStats {
    inner: ControllerStats,
}

impl From<ControllerStats> for PyStats {
    fn from(inner: ControllerStats) -> Self {
        Self { inner }
    }
}

#[pymethods]
impl PyStats {
    #[getter]
    fn reads(&self) -> u64 {
        self.inner.reads
    }

    #[getter]
    fn writes(&self) -> u64 {
        self.inner.writes
    }

    #[getter]
    fn bytes(&self) -> u64 {
        self.inner.bytes
    }

    #[getter]
    fn row_hits(&self) -> u64 {
        self.inner.row_hits
    }

    #[getter]
    fn row_misses(&self) -> u64 {
        self.inner.row_misses
    }

    #[getter]
    fn average_latency_ns(&self) -> f64 {
        self.inner.average_latency_ns()
    }

    #[getter]
    fn max_latency_ns(&self) -> f64 {
        to_ns(self.inner.max_latency)
    }

    #[getter]
    fn bandwidth_gbps(&self) -> f64 {
        self.inner.bandwidth_gbps()
    }

    #[getter]
    fn row_hit_rate(&self) -> f64 {
        self.inner.row_hit_rate()
    }

    /// Issue count of the named command (`"ACT"`, `"RD"`, `"REFAB"`, ...).
    /// Unknown names count zero.
    fn command_count(&self, name: &str) -> u64 {
        Command::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
            .map_or(0, |c| self.inner.command_count(c))
    }

    /// All counters as a flat dict.
    fn to_dict<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let s = &self.inner;
        let d = PyDict::new(py);
        d.set_item("reads", s.reads)?;
        d.set_item("writes", s.writes)?;
        d.set_item("bytes", s.bytes)?;
        d.set_item("row_hits", s.row_hits)?;
        d.set_item("row_misses", s.row_misses)?;
        d.set_item("average_latency_ns", s.average_latency_ns())?;
        d.set_item("max_latency_ns", to_ns(s.max_latency))?;
        d.set_item("bandwidth_gbps", s.bandwidth_gbps())?;
        d.set_item("refresh_issued", s.refresh.issued)?;
        d.set_item("refresh_postponed", s.refresh.postponed)?;
        d.set_item("refresh_pulled_in", s.refresh.pulled_in)?;
        d.set_item("refresh_forced", s.refresh.forced)?;
        d.set_item("power_down_entries", s.power.power_down_entries)?;
        d.set_item("power_down_time_ns", to_ns(s.power.power_down_time))?;
        d.set_item("self_refresh_entries", s.power.self_refresh_entries)?;
        d.set_item("self_refresh_time_ns", to_ns(s.power.self_refresh_time))?;
        let commands = PyDict::new(py);
        for command in Command::ALL {
            commands.set_item(command.name(), s.command_count(command))?;
        }
        d.set_item("commands", commands)?;
        Ok(d)
    }

    fn print(&self) {
        self.inner.print();
    }

    fn __repr__(&self) -> String {
        format!(
            "Stats(reads={}, writes={}, avg_latency={:.3} ns, row_hit_rate={:.3})",
            self.inner.reads,
            self.inner.writes,
            self.inner.average_latency_ns(),
            self.inner.row_hit_rate()
        )
    }
}
