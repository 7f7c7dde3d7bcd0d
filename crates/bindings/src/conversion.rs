//! Python object to configuration conversion.
//!
//! Dicts are serialized through the `json` module and parsed by the same
//! path as configuration files, so field names and defaults match exactly.

use dramctl::config::Config;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

/// `None` yields the default configuration; anything else must be a
/// JSON-serializable mapping with the configuration layout.
pub fn py_dict_to_config(py: Python, obj: Option<&Bound<'_, PyAny>>) -> PyResult<Config> {
    let Some(obj) = obj.filter(|o| !o.is_none()) else {
        return Ok(Config::default());
    };
    let json = py.import("json")?;
    let text: String = json.call_method1("dumps", (obj,))?.extract()?;
    Config::from_json(&text).map_err(|e| PyValueError::new_err(e.to_string()))
}

pub fn config_to_py_dict(py: Python, config: &Config) -> PyResult<PyObject> {
    let text = serde_json::to_string(config).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let json = py.import("json")?;
    Ok(json.call_method1("loads", (text,))?.unbind())
}
