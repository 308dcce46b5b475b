//! CLI argument parsing using Clap.

use crate::config::DEFAULT_MARKER_DIR;
use clap::Parser;
use std::path::PathBuf;

/// Convert Atomic Red Team test definitions into Caldera stockpile abilities.
#[derive(Parser, Debug)]
#[command(name = "atomic-caldera")]
#[command(version, about, long_about = None)]
#[command(after_help = "Examples:
  atomic-caldera -i ./atomic-red-team/atomics
  atomic-caldera -i ./atomics -f ./stockpile/data -c ./cti
  atomic-caldera -i ./atomics -o catalog.csv -v variables.csv --yes
")]
pub struct Cli {
    // === Inputs ===
    /// The Atomic Red Team "atomics" folder path
    #[arg(short = 'i', long = "inputdir", env = "ATOMIC_CALDERA_INPUT_DIR")]
    pub input_dir: Option<PathBuf>,

    /// The path to the MITRE CTI database (default: ./cti)
    #[arg(short = 'c', long = "cti", env = "ATOMIC_CALDERA_CTI")]
    pub cti: Option<PathBuf>,

    /// Template wrapping command_prompt commands (default: ./Cmd-Wrapper.txt)
    #[arg(long = "cmd-wrapper", env = "ATOMIC_CALDERA_CMD_WRAPPER")]
    pub cmd_wrapper: Option<PathBuf>,

    /// Subdirectory that must exist in the input folder
    #[arg(long = "marker-dir", default_value = DEFAULT_MARKER_DIR)]
    pub marker_dir: String,

    // === Outputs ===
    /// The directory the converted YAML files will be stored in (default: .)
    #[arg(short = 'f', long = "fileoutdir", env = "ATOMIC_CALDERA_OUTPUT_DIR")]
    pub file_out_dir: Option<PathBuf>,

    /// The path to the CSV catalog file (default: ./atomic-caldera.csv)
    #[arg(short = 'o', long = "csv", env = "ATOMIC_CALDERA_CSV")]
    pub csv: Option<PathBuf>,

    /// The path to the CSV file of variables for each test (default: ./atomic-variables.csv)
    #[arg(short = 'v', long = "varcsv", env = "ATOMIC_CALDERA_VARCSV")]
    pub var_csv: Option<PathBuf>,

    // === Behaviour ===
    /// Continue without asking when the output already holds abilities
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Default log filter when `RUST_LOG` is not set.
    pub const fn log_level(&self) -> &'static str {
        if self.debug { "debug" } else { "warn" }
    }
}
