//! Error hints: mapping from error variants to user-facing remediation suggestions.
//!
//! Each error variant maps to:
//! - A 1-line summary (human readable)
//! - 0-2 actionable hints (flags, paths)
//! - Contextual fields that should be printed with the error
//!
//! Hints must be stable for testability and never suggest destructive actions.

use crate::error::Error;
use std::fmt::Write as _;

/// A remediation hint for an error.
#[derive(Debug, Clone)]
pub struct ErrorHint {
    /// Brief 1-line summary of the error category.
    pub summary: &'static str,
    /// Actionable hints for the user (0-2 items).
    pub hints: &'static [&'static str],
    /// Context fields that should be displayed with the error.
    pub context_fields: &'static [&'static str],
}

/// Get remediation hints for an error variant.
pub fn hints_for_error(error: &Error) -> ErrorHint {
    match error {
        Error::Config(msg) => config_hints(msg),
        Error::Preflight(_) => ErrorHint {
            summary: "Preflight validation failed",
            hints: &[
                "Review the preflight report above; nothing was written",
                "Run with --help to see every path flag and its default",
            ],
            context_fields: &[],
        },
        Error::Definition { .. } => ErrorHint {
            summary: "A definition file could not be parsed",
            hints: &[
                "Fix or remove the file named above and run again",
                "Abilities written before the failure have no ledger rows yet",
            ],
            context_fields: &["path"],
        },
        Error::Argument { .. } => ErrorHint {
            summary: "An input argument default could not be encoded",
            hints: &["Give every input argument a scalar, list or string-keyed map default"],
            context_fields: &["technique", "argument"],
        },
        Error::Ledger(_) | Error::Csv(_) => ErrorHint {
            summary: "Ledger could not be read or written",
            hints: &[
                "Check that the --csv and --varcsv paths are writable",
                "Ledger files must be produced by this tool",
            ],
            context_fields: &["path"],
        },
        Error::Taxonomy(_) | Error::Json(_) => ErrorHint {
            summary: "MITRE CTI database is unusable",
            hints: &[
                "Clone https://github.com/mitre/cti and pass its path with --cti",
                "Re-clone the database if a record is corrupt",
            ],
            context_fields: &["path"],
        },
        Error::Output { .. } => ErrorHint {
            summary: "Abilities could not be written",
            hints: &["Check that --fileoutdir exists and is writable"],
            context_fields: &["path"],
        },
        Error::Io(err) => io_hints(err),
        Error::Yaml(_) => ErrorHint {
            summary: "Invalid YAML",
            hints: &["Check indentation and quoting in the definition file"],
            context_fields: &["line", "column"],
        },
    }
}

fn config_hints(msg: &str) -> ErrorHint {
    if msg.contains("input directory") {
        return ErrorHint {
            summary: "No Atomic Red Team library given",
            hints: &["Pass the atomics folder with -i/--inputdir"],
            context_fields: &[],
        };
    }
    if msg.contains("command wrapper") {
        return ErrorHint {
            summary: "Command wrapper template is missing",
            hints: &[
                "Create Cmd-Wrapper.txt with a #{command} placeholder",
                "Or point --cmd-wrapper at an existing template",
            ],
            context_fields: &["path"],
        };
    }
    ErrorHint {
        summary: "Configuration error",
        hints: &["Run with --help to see the available flags"],
        context_fields: &[],
    }
}

fn io_hints(err: &std::io::Error) -> ErrorHint {
    match err.kind() {
        std::io::ErrorKind::NotFound => ErrorHint {
            summary: "File or directory not found",
            hints: &["Verify the path exists"],
            context_fields: &["path"],
        },
        std::io::ErrorKind::PermissionDenied => ErrorHint {
            summary: "Permission denied",
            hints: &["Check file/directory permissions"],
            context_fields: &["path"],
        },
        _ => ErrorHint {
            summary: "I/O error",
            hints: &["Check file system and permissions"],
            context_fields: &["path"],
        },
    }
}

/// Format an error with its hints for display.
pub fn format_error_with_hints(error: &Error) -> String {
    let hint = hints_for_error(error);
    let mut output = String::new();

    let _ = writeln!(&mut output, "Error: {error}");

    if !error.to_string().contains(hint.summary) {
        output.push('\n');
        output.push_str(hint.summary);
        output.push('\n');
    }

    if !hint.hints.is_empty() {
        output.push_str("\nSuggestions:\n");
        for &h in hint.hints {
            let _ = writeln!(&mut output, "  • {h}");
        }
    }

    output
}
