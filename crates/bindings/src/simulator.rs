//! Simulator Python binding.
//!
//! Builds a simulator from a config dict, attaches initiators, runs it and
//! exposes statistics, the command trace and per-request completions.

use std::path::PathBuf;

use crate::conversion::{config_to_py_dict, py_dict_to_config};
use crate::stats::PyStats;
use dramctl::common::time::{ns_f64, to_ns};
use dramctl::sim::{AddressMapper, ScriptedInitiator, TracePlayer};
use dramctl::{Config, Direction, Request, Simulator};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

/// Returns the built-in default configuration as a dict.
#[pyfunction]
pub fn default_config(py: Python) -> PyResult<PyObject> {
    config_to_py_dict(py, &Config::default())
}

fn parse_direction(kind: &str) -> PyResult<Direction> {
    match kind.to_ascii_lowercase().as_str() {
        "read" | "r" => Ok(Direction::Read),
        "write" | "w" => Ok(Direction::Write),
        other => Err(PyValueError::new_err(format!("unknown request kind `{other}`"))),
    }
}

/// Python-exposed simulator: one controller plus its initiators.
#[pyclass(unsendable)]
pub struct PySimulator {
    inner: Simulator,
    mapper: AddressMapper,
    base_dir: PathBuf,
}

#[pymethods]
impl PySimulator {
    /// Creates a simulator.
    ///
    /// # Arguments
    /// * `config` - Configuration dict, `None` for the defaults. Initiators
    ///   listed under `tracesetup` are attached immediately.
    /// * `base_dir` - Directory trace file names are resolved against.
    ///
    /// # Errors
    /// `ValueError` for an invalid configuration or unreadable trace.
    #[new]
    #[pyo3(signature = (config=None, base_dir=None))]
    fn new(py: Python, config: Option<&Bound<'_, PyAny>>, base_dir: Option<PathBuf>) -> PyResult<Self> {
        let config = py_dict_to_config(py, config)?;
        let base_dir = base_dir.unwrap_or_else(|| PathBuf::from("."));
        let inner = Simulator::from_config(&config, &base_dir)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        let mapper = AddressMapper::new(inner.controller().memspec())
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(Self {
            inner,
            mapper,
            base_dir,
        })
    }

    /// Attaches an STL trace player. `.stl` is absolute, `.rstl` relative.
    fn add_trace(&mut self, path: PathBuf, clk_mhz: f64) -> PyResult<()> {
        let player = TracePlayer::open(&self.base_dir.join(path), clk_mhz, self.mapper)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        self.inner.add_initiator(Box::new(player));
        Ok(())
    }

    /// Attaches a fixed list of `(arrival_ns, "read" | "write", address)`
    /// requests. They must be sorted by arrival.
    #[pyo3(signature = (requests, name="script"))]
    fn add_requests(&mut self, requests: Vec<(f64, String, u64)>, name: &str) -> PyResult<()> {
        let requests = requests
            .into_iter()
            .enumerate()
            .map(|(i, (arrival, kind, address))| {
                let at = self.mapper.decode(address);
                Ok(Request {
                    direction: parse_direction(&kind)?,
                    ..Request::read(i as u64, at.rank, at.bank, at.row, at.column, ns_f64(arrival))
                })
            })
            .collect::<PyResult<Vec<_>>>()?;
        self.inner
            .add_initiator(Box::new(ScriptedInitiator::new(name, requests)));
        Ok(())
    }

    /// Attaches a stream of `count` requests to one bank, one every
    /// `period_ns`, cycling through `rows`.
    #[pyo3(signature = (rank, bank, rows, count, period_ns, kind="read"))]
    fn add_stream(
        &mut self,
        rank: usize,
        bank: usize,
        rows: Vec<u32>,
        count: u64,
        period_ns: f64,
        kind: &str,
    ) -> PyResult<()> {
        if rows.is_empty() {
            return Err(PyValueError::new_err("stream needs at least one row"));
        }
        let stream =
            ScriptedInitiator::stream(rank, bank, &rows, parse_direction(kind)?, ns_f64(period_ns), count);
        self.inner.add_initiator(Box::new(stream));
        Ok(())
    }

    /// Runs until all traffic is served or `until_ns` would be passed.
    /// Returns whether the run finished.
    ///
    /// # Errors
    /// `RuntimeError` on a timing violation or rejected request.
    #[pyo3(signature = (until_ns=None))]
    fn run(&mut self, py: Python, until_ns: Option<f64>) -> PyResult<bool> {
        py.check_signals()?;
        self.inner
            .run(until_ns.map(ns_f64))
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
        Ok(self.inner.is_finished())
    }

    #[getter]
    fn now_ns(&self) -> f64 {
        to_ns(self.inner.now())
    }

    /// Returns a snapshot of the current statistics.
    fn get_stats(&self) -> PyStats {
        PyStats::from(self.inner.stats())
    }

    /// Issued commands as `(time_ps, name, rank, bank_group, bank)`. Empty
    /// unless `simconfig.recordCommands` is set.
    fn get_commands(&self) -> Vec<(u64, &'static str, usize, usize, usize)> {
        self.inner
            .controller()
            .commands()
            .iter()
            .map(|c| (c.time, c.command.name(), c.target.rank, c.target.bank_group, c.target.bank))
            .collect()
    }

    /// Completions as `(id, is_write, arrival_ps, finish_ps)`.
    fn get_completions(&self) -> Vec<(u64, bool, u64, u64)> {
        self.inner
            .completions()
            .iter()
            .map(|c| (c.id, c.direction == Direction::Write, c.arrival, c.finish))
            .collect()
    }
}
