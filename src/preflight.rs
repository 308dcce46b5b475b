//! Preflight validation run before any data is touched.
//!
//! Every check produces a [`Finding`]; a single failing finding stops the run.
//! The input tree must look like an Atomic Red Team `atomics` folder, the CTI
//! checkout must carry its enterprise dataset, and any existing ledger must
//! start with the exact header of its schema. An output tree that already
//! holds abilities is only a warning: the caller asks before continuing.

use crate::config::{Config, DEFINITION_EXTENSION};
use crate::emit::ABILITY_EXTENSION;
use crate::ledger::{TEST_LEDGER_HEADER, VARIABLE_LEDGER_HEADER, header_matches};
use std::fmt;
use std::fmt::Write as _;
use std::path::Path;
use walkdir::WalkDir;

// ── Core Types ──────────────────────────────────────────────────────

/// How severe a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Pass,
    Warn,
    Fail,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Warn => write!(f, "WARN"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// Which input a check belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckCategory {
    Input,
    Taxonomy,
    Ledger,
    Output,
}

impl CheckCategory {
    const fn label(self) -> &'static str {
        match self {
            Self::Input => "Atomic library",
            Self::Taxonomy => "CTI database",
            Self::Ledger => "Ledgers",
            Self::Output => "Output",
        }
    }
}

impl fmt::Display for CheckCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single check result.
#[derive(Debug, Clone)]
pub struct Finding {
    pub category: CheckCategory,
    pub severity: Severity,
    pub title: String,
    pub detail: Option<String>,
    pub remediation: Option<String>,
}

impl Finding {
    fn new(category: CheckCategory, severity: Severity, title: impl Into<String>) -> Self {
        Self {
            category,
            severity,
            title: title.into(),
            detail: None,
            remediation: None,
        }
    }

    fn pass(category: CheckCategory, title: impl Into<String>) -> Self {
        Self::new(category, Severity::Pass, title)
    }

    fn warn(category: CheckCategory, title: impl Into<String>) -> Self {
        Self::new(category, Severity::Warn, title)
    }

    fn fail(category: CheckCategory, title: impl Into<String>) -> Self {
        Self::new(category, Severity::Fail, title)
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }
}

/// All findings of one preflight pass.
#[derive(Debug, Clone)]
pub struct PreflightReport {
    pub findings: Vec<Finding>,
    pub overall: Severity,
    /// Ability files already present under the output tree.
    pub existing_abilities: usize,
}

impl PreflightReport {
    fn from_findings(findings: Vec<Finding>, existing_abilities: usize) -> Self {
        let overall = findings
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(Severity::Pass);
        Self {
            findings,
            overall,
            existing_abilities,
        }
    }

    pub fn passed(&self) -> bool {
        self.overall != Severity::Fail
    }

    /// One-line list of failing checks, for error messages.
    pub fn failure_summary(&self) -> String {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Fail)
            .map(|f| f.title.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Render human-friendly text output.
    pub fn render_text(&self) -> String {
        let mut out = String::with_capacity(512);
        out.push_str("Preflight\n=========\n");
        let mut seen: Vec<CheckCategory> = Vec::new();
        for f in &self.findings {
            if !seen.contains(&f.category) {
                seen.push(f.category);
            }
        }
        for cat in &seen {
            let _ = writeln!(out, "\n{cat}");
            for f in self.findings.iter().filter(|f| f.category == *cat) {
                let _ = writeln!(out, "  [{}] {}", f.severity, f.title);
                if let Some(detail) = &f.detail {
                    let _ = writeln!(out, "       {detail}");
                }
                if let Some(rem) = &f.remediation {
                    let _ = writeln!(out, "       Fix: {rem}");
                }
            }
        }
        let _ = writeln!(out, "\nOverall: {}", self.overall);
        out
    }
}

// ── Entry Point ─────────────────────────────────────────────────────

/// Run every check against `config`.
pub fn run_preflight(config: &Config) -> PreflightReport {
    let mut findings = Vec::new();
    check_input(config, &mut findings);
    check_cti(config, &mut findings);
    check_ledger(&config.ledger_path, TEST_LEDGER_HEADER, "Test ledger", &mut findings);
    check_ledger(
        &config.variable_ledger_path,
        VARIABLE_LEDGER_HEADER,
        "Variable ledger",
        &mut findings,
    );
    let existing = check_output(&config.abilities_dir(), &mut findings);
    PreflightReport::from_findings(findings, existing)
}

// ── Checks ──────────────────────────────────────────────────────────

fn check_input(config: &Config, findings: &mut Vec<Finding>) {
    let cat = CheckCategory::Input;
    let input_dir = &config.input_dir;
    let marker = &config.marker_dir;
    if !input_dir.is_dir() {
        findings.push(
            Finding::fail(cat, "The provided input directory is not valid or does not exist")
                .with_detail(input_dir.display().to_string())
                .with_remediation("Point --inputdir at the atomics folder of Atomic Red Team"),
        );
        return;
    }
    if !config.marker_path().is_dir() {
        findings.push(
            Finding::fail(cat, format!("Input directory has no {marker}/ subdirectory"))
                .with_detail(input_dir.display().to_string())
                .with_remediation(
                    "Point --inputdir at the atomics folder, or pass --marker-dir",
                ),
        );
        return;
    }
    findings.push(Finding::pass(
        cat,
        format!("Atomic library: {}", input_dir.display()),
    ));
}

fn check_cti(config: &Config, findings: &mut Vec<Finding>) {
    let cat = CheckCategory::Taxonomy;
    let cti_dir = &config.cti_dir;
    if !cti_dir.is_dir() || !config.enterprise_dir().is_dir() {
        findings.push(
            Finding::fail(
                cat,
                "The provided path to the MITRE CTI database is incorrect or corrupt",
            )
            .with_detail(format!("Expected {}", config.enterprise_dir().display()))
            .with_remediation("Clone https://github.com/mitre/cti and pass its path with --cti"),
        );
        return;
    }
    findings.push(Finding::pass(cat, format!("CTI database: {}", cti_dir.display())));
}

fn check_ledger(path: &Path, header: &[&str], label: &str, findings: &mut Vec<Finding>) {
    let cat = CheckCategory::Ledger;
    if !path.exists() {
        findings.push(Finding::pass(
            cat,
            format!("{label}: not present, it will be created"),
        ));
        return;
    }
    match header_matches(path, header) {
        Ok(true) => findings.push(Finding::pass(cat, format!("{label}: {}", path.display()))),
        Ok(false) => findings.push(
            Finding::fail(cat, format!("{label}: unexpected header"))
                .with_detail(format!(
                    "{} must start with {}",
                    path.display(),
                    header.join(",")
                ))
                .with_remediation("Pass the path of a ledger written by this tool"),
        ),
        Err(err) => findings.push(
            Finding::fail(cat, format!("{label}: read error"))
                .with_detail(err.to_string())
                .with_remediation(format!("Check file permissions on {}", path.display())),
        ),
    }
}

/// Count ability files already under `abilities_dir`.
pub fn count_existing_abilities(abilities_dir: &Path) -> usize {
    if !abilities_dir.is_dir() {
        return 0;
    }
    WalkDir::new(abilities_dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(ABILITY_EXTENSION))
        })
        .count()
}

fn check_output(abilities_dir: &Path, findings: &mut Vec<Finding>) -> usize {
    let cat = CheckCategory::Output;
    let existing = count_existing_abilities(abilities_dir);
    if existing > 0 {
        findings.push(
            Finding::warn(
                cat,
                format!("{existing} ability files already present"),
            )
            .with_detail(abilities_dir.display().to_string())
            .with_remediation("Make sure the run will not duplicate abilities"),
        );
    } else {
        findings.push(Finding::pass(
            cat,
            format!("Output: {}", abilities_dir.display()),
        ));
    }
    existing
}

/// Whether `path` names a source definition file.
pub fn is_definition_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(DEFINITION_EXTENSION))
}
