//! Run configuration resolved from the command line.

use crate::cli::Cli;
use crate::emit::ABILITIES_DIR;
use crate::error::{Error, Result};
use crate::taxonomy::ENTERPRISE_DATASET;
use std::path::{Path, PathBuf};

pub const DEFAULT_CTI_DIR: &str = "cti";
pub const DEFAULT_LEDGER_FILE: &str = "atomic-caldera.csv";
pub const DEFAULT_VARIABLE_LEDGER_FILE: &str = "atomic-variables.csv";
pub const DEFAULT_CMD_WRAPPER: &str = "Cmd-Wrapper.txt";
pub const DEFAULT_MARKER_DIR: &str = "T1002";

/// Extension of source definition files.
pub const DEFINITION_EXTENSION: &str = "yaml";

/// Absolute paths and switches for one conversion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub cti_dir: PathBuf,
    pub ledger_path: PathBuf,
    pub variable_ledger_path: PathBuf,
    pub cmd_wrapper_path: PathBuf,
    pub marker_dir: String,
    pub assume_yes: bool,
}

impl Config {
    /// Resolve `cli` against `cwd`, applying defaults for unset paths.
    pub fn from_cli(cli: &Cli, cwd: &Path) -> Result<Self> {
        let input_dir = cli
            .input_dir
            .as_deref()
            .ok_or_else(|| Error::config("No input directory was provided"))?;
        let resolve = |path: Option<&Path>, default: &str| -> PathBuf {
            let path = path.unwrap_or_else(|| Path::new(default));
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                cwd.join(path)
            }
        };

        let config = Self {
            input_dir: resolve(Some(input_dir), ""),
            output_dir: resolve(cli.file_out_dir.as_deref(), "."),
            cti_dir: resolve(cli.cti.as_deref(), DEFAULT_CTI_DIR),
            ledger_path: resolve(cli.csv.as_deref(), DEFAULT_LEDGER_FILE),
            variable_ledger_path: resolve(cli.var_csv.as_deref(), DEFAULT_VARIABLE_LEDGER_FILE),
            cmd_wrapper_path: resolve(cli.cmd_wrapper.as_deref(), DEFAULT_CMD_WRAPPER),
            marker_dir: cli.marker_dir.clone(),
            assume_yes: cli.yes,
        };
        tracing::debug!(?config, "Resolved configuration");
        Ok(config)
    }

    /// `<output>/abilities`.
    pub fn abilities_dir(&self) -> PathBuf {
        self.output_dir.join(ABILITIES_DIR)
    }

    /// `<cti>/enterprise-attack`.
    pub fn enterprise_dir(&self) -> PathBuf {
        self.cti_dir.join(ENTERPRISE_DATASET)
    }

    /// `<input>/<marker>`.
    pub fn marker_path(&self) -> PathBuf {
        self.input_dir.join(&self.marker_dir)
    }
}
