//! DRAM controller simulator CLI.

use clap::Parser;
use pyo3::prelude::*;
use pyo3::types::PyList;
use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::{fs, process};

use dramctl::common::time::ns_f64;
use dramctl::sim::{AddressMapper, TracePlayer};
use dramctl::{Config, Simulator};

#[derive(Parser, Debug)]
#[command(
    name = "dramctl",
    author,
    version,
    about = "Cycle-accurate DRAM controller simulator",
    long_about = None,
)]
struct Cli {
    /// JSON configuration (memspec, mcconfig, simconfig, tracesetup).
    #[arg(short = 'c', long, conflicts_with = "script")]
    config: Option<PathBuf>,

    /// Extra STL trace to replay (.stl absolute, .rstl relative timing).
    #[arg(short = 't', long, conflicts_with = "script")]
    trace: Vec<PathBuf>,

    /// Clock of the --trace players in MHz.
    #[arg(long, default_value_t = 1000.0)]
    trace_clk: f64,

    /// Stop once simulated time would pass this many nanoseconds.
    #[arg(long)]
    until: Option<f64>,

    /// Print every issued command.
    #[arg(long)]
    dump_commands: bool,

    /// Print statistics as JSON instead of the text report.
    #[arg(long)]
    json: bool,

    /// Python script to run against the bindings.
    #[arg(long, conflicts_with_all = ["config", "trace"])]
    script: Option<String>,

    /// Arguments passed to the script as sys.argv[1:].
    #[arg(
        allow_hyphen_values = true,
        trailing_var_arg = true,
        requires = "script"
    )]
    script_args: Vec<String>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if let Some(script) = cli.script {
        run_python_script(&script, cli.script_args);
    } else if cli.config.is_some() || !cli.trace.is_empty() {
        if let Err(e) = cmd_simulate(&cli) {
            eprintln!("\n\x1b[1;31merror:\x1b[0m {e}");
            process::exit(1);
        }
    } else {
        eprintln!(
            "\n\x1b[1;31merror:\x1b[0m one of \x1b[1m--config\x1b[0m, \x1b[1m--trace\x1b[0m, or \x1b[1m--script\x1b[0m is required\n"
        );
        eprintln!("\x1b[1;33mUsage:\x1b[0m");
        eprintln!(
            "  \x1b[1;36mdramctl \x1b[0m \x1b[32m-c\x1b[0m <config.json> [\x1b[32m--until\x1b[0m ns]        \x1b[2mConfigured run\x1b[0m"
        );
        eprintln!(
            "  \x1b[1;36mdramctl \x1b[0m \x1b[32m-t\x1b[0m <trace.stl> [\x1b[32m--trace-clk\x1b[0m MHz]     \x1b[2mDefault device, one trace\x1b[0m"
        );
        eprintln!(
            "  \x1b[1;36mdramctl \x1b[0m \x1b[32m--script\x1b[0m <script.py> [args...]          \x1b[2mPython script\x1b[0m"
        );
        eprintln!();
        eprintln!("Run \x1b[1mdramctl --help\x1b[0m for full usage information.");
        process::exit(1);
    }
}

fn cmd_simulate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let (mut config, base_dir) = match &cli.config {
        Some(path) => (
            Config::from_file(path)?,
            path.parent().map(Path::to_path_buf).unwrap_or_default(),
        ),
        None => (Config::default(), PathBuf::new()),
    };
    config.simconfig.record_commands |= cli.dump_commands;
    config.simconfig.record_completions = false;
    log::info!("simulation {}", config.simconfig.simulation_name);

    let mut sim = Simulator::from_config(&config, &base_dir)?;
    let mapper = AddressMapper::new(sim.controller().memspec())?;
    for trace in &cli.trace {
        sim.add_initiator(Box::new(TracePlayer::open(trace, cli.trace_clk, mapper)?));
    }

    let result = sim.run(cli.until.map(ns_f64));
    if cli.dump_commands {
        for command in sim.controller().commands() {
            println!("{command}");
        }
    }
    result?;

    if !sim.is_finished() {
        log::warn!(
            "stopped at {} ps with {} request(s) pending",
            sim.now(),
            sim.controller().pending_requests()
        );
    }
    let stats = sim.stats();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        stats.print();
    }
    Ok(())
}

fn run_python_script(script_path: &str, script_args: Vec<String>) {
    let script_content = fs::read_to_string(script_path).unwrap_or_else(|e| {
        eprintln!("Error reading script {}: {}", script_path, e);
        process::exit(1);
    });

    let outcome = Python::with_gil(|py| -> PyResult<()> {
        let sys = py.import("sys")?;
        sys.getattr("path")?.call_method1("insert", (0, "."))?;

        // Inject the compiled extension as `dramctl` so scripts import it
        // without an installed wheel.
        let m = PyModule::new(py, "dramctl")?;
        _core::register_dramctl_module(&m)?;
        sys.getattr("modules")?.set_item("dramctl", m)?;

        let mut full_args = vec![script_path.to_string()];
        full_args.extend(script_args);
        sys.setattr("argv", PyList::new(py, &full_args)?)?;

        let nul = |e: std::ffi::NulError| pyo3::exceptions::PyValueError::new_err(e.to_string());
        let code_c = CString::new(script_content).map_err(nul)?;
        let file_c = CString::new(script_path).map_err(nul)?;
        let name_c = CString::new("__main__").map_err(nul)?;
        PyModule::from_code(py, &code_c, &file_c, &name_c)?;
        Ok(())
    });
    if let Err(e) = outcome {
        Python::with_gil(|py| e.print(py));
        process::exit(1);
    }
}
