//! Stockpile ability records and their YAML rendering.

use crate::executor::ExecutorKey;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::OnceLock;

/// Provenance tag appended to every description.
pub const PROVENANCE: &str = "(Atomic Red Team)";

/// A converted test, one per output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tactic: String,
    pub technique: Technique,
    pub executors: BTreeMap<ExecutorKey, ExecutorCommand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technique {
    pub attack_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorCommand {
    pub command: String,
}

/// Collapse a free-text description onto one line and tag its provenance.
pub fn normalize_description(description: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
    let collapsed = whitespace.replace_all(description.trim(), " ");
    if collapsed.is_empty() {
        PROVENANCE.to_string()
    } else {
        format!("{collapsed} {PROVENANCE}")
    }
}

impl Ability {
    /// Render as a one-element YAML sequence, the layout stockpile loads.
    pub fn to_yaml(&self) -> String {
        let mut out = String::with_capacity(256 + self.description.len());
        let _ = writeln!(out, "- id: {}", quoted(&self.id));
        let _ = writeln!(out, "  name: {}", quoted(&self.name));
        let _ = writeln!(out, "  description: {}", quoted(&self.description));
        let _ = writeln!(out, "  tactic: {}", quoted(&self.tactic));
        out.push_str("  technique:\n");
        let _ = writeln!(out, "    attack_id: {}", quoted(&self.technique.attack_id));
        let _ = writeln!(out, "    name: {}", quoted(&self.technique.name));
        out.push_str("  executors:\n");
        for (key, executor) in &self.executors {
            let _ = writeln!(out, "    {key}:");
            out.push_str("      command: ");
            write_command(&mut out, &executor.command, 8);
        }
        out
    }
}

fn quoted(value: &str) -> String {
    // A JSON string is a valid YAML double-quoted scalar once the characters
    // JSON leaves raw but YAML readers reject or fold are escaped too.
    let json = serde_json::to_string(value).unwrap_or_else(|_| String::from("\"\""));
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '\u{85}' => out.push_str("\\N"),
            '\u{2028}' => out.push_str("\\L"),
            '\u{2029}' => out.push_str("\\P"),
            '\u{7f}'..='\u{9f}' => {
                let _ = write!(out, "\\x{:02x}", u32::from(c));
            }
            '\u{feff}' | '\u{fffe}' | '\u{ffff}' => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            _ => out.push(c),
        }
    }
    out
}

/// Whether `text` can be carried verbatim by a literal block scalar.
fn block_safe(text: &str) -> bool {
    !text.chars().any(|c| {
        (c.is_control() && c != '\n' && c != '\t')
            || matches!(
                c,
                '\u{feff}' | '\u{fffe}' | '\u{ffff}' | '\u{2028}' | '\u{2029}'
            )
    })
}

/// Write `text` as the value of a mapping key whose content sits at `indent` spaces.
fn write_command(out: &mut String, text: &str, indent: usize) {
    if !block_safe(text) {
        out.push_str(&quoted(text));
        out.push('\n');
        return;
    }

    let body = text.trim_end_matches('\n');
    let trailing = text.len() - body.len();
    let chomp = match trailing {
        0 => "-",
        1 if !body.is_empty() => "",
        _ => "+",
    };
    // Auto-detected indentation breaks on a first line that opens with blanks.
    let leading_space = body
        .split('\n')
        .find(|line| !line.is_empty())
        .is_some_and(|line| line.starts_with([' ', '\t']));
    let indicator = if leading_space { "2" } else { "" };
    let _ = writeln!(out, "|{indicator}{chomp}");

    let pad = " ".repeat(indent);
    for line in body.split('\n') {
        if !line.is_empty() {
            out.push_str(&pad);
            out.push_str(line);
        }
        out.push('\n');
    }
    for _ in 1..trailing {
        out.push('\n');
    }
}
