//! Executor-family normalization.
//!
//! Source executors map onto the two executor keys the stockpile format knows:
//!
//! | source            | key    | command rewrite                                   |
//! |-------------------|--------|---------------------------------------------------|
//! | `sh`, `bash`      | `bash` | literal `\n` becomes a newline                    |
//! | `command_prompt`  | `psh`  | substituted into the `Cmd-Wrapper.txt` template   |
//! | `powershell`      | `psh`  | literal `\n` becomes a newline, then `;` + newline |
//!
//! Anything else is unsupported and the test is dropped.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Placeholder token in the wrapper template.
pub const WRAPPER_PLACEHOLDER: &str = "#{command}";

/// Normalized executor key written to abilities and ledgers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKey {
    Bash,
    Psh,
}

impl ExecutorKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bash => "bash",
            Self::Psh => "psh",
        }
    }
}

impl fmt::Display for ExecutorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source executor families that can be converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorFamily {
    Shell,
    CommandPrompt,
    PowerShell,
}

impl ExecutorFamily {
    /// Classify a source executor name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sh" | "bash" => Some(Self::Shell),
            "command_prompt" => Some(Self::CommandPrompt),
            "powershell" => Some(Self::PowerShell),
            _ => None,
        }
    }

    pub const fn key(self) -> ExecutorKey {
        match self {
            Self::Shell => ExecutorKey::Bash,
            Self::CommandPrompt | Self::PowerShell => ExecutorKey::Psh,
        }
    }
}

/// The `Cmd-Wrapper.txt` template, read on first use.
#[derive(Debug)]
pub struct CommandWrapper {
    path: PathBuf,
    template: Option<String>,
}

impl CommandWrapper {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            template: None,
        }
    }

    /// A wrapper with an already-known template.
    pub fn from_template(template: impl Into<String>) -> Self {
        Self {
            path: PathBuf::new(),
            template: Some(template.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Substitute `command` for every placeholder in the template.
    pub fn wrap(&mut self, command: &str) -> Result<String> {
        if self.template.is_none() {
            let template = std::fs::read_to_string(&self.path).map_err(|err| {
                Error::config(format!(
                    "Unable to read command wrapper {}: {err}",
                    self.path.display()
                ))
            })?;
            tracing::debug!(path = %self.path.display(), "Loaded command wrapper template");
            self.template = Some(template);
        }
        let template = self.template.as_deref().unwrap_or_default();
        Ok(template.replace(WRAPPER_PLACEHOLDER, command))
    }
}

/// Rewrite `command` for `family`, returning the executor key and the new command.
pub fn normalize(
    family: ExecutorFamily,
    command: &str,
    wrapper: &mut CommandWrapper,
) -> Result<(ExecutorKey, String)> {
    let normalized = match family {
        ExecutorFamily::Shell => command.replace("\\n", "\n"),
        ExecutorFamily::CommandPrompt => wrapper.wrap(command)?,
        ExecutorFamily::PowerShell => command.replace("\\n", "\n").replace('\n', ";\n"),
    };
    Ok((family.key(), normalized))
}
