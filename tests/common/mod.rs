//! Common test infrastructure for `atomic_caldera`.
//!
//! - `TestHarness`: temp directory with failure dumps
//! - `AtomicLibrary`: a minimal Atomic Red Team tree, CTI checkout and
//!   wrapper template laid out the way a real run expects them

#![allow(dead_code)]

pub mod harness;

pub use harness::TestHarness;

use atomic_caldera::config::Config;
use serde_json::json;
use std::path::PathBuf;

pub const WRAPPER_TEMPLATE: &str = "cmd.exe /c \"#{command}\"\n";

/// Scratch layout: `atomics/`, `cti/`, `Cmd-Wrapper.txt`, output under `out/`.
pub struct AtomicLibrary {
    pub harness: TestHarness,
}

impl AtomicLibrary {
    pub fn new(name: &str) -> Self {
        let harness = TestHarness::new(name);
        harness.create_dir("atomics/T1002");
        harness.create_dir("cti/enterprise-attack/attack-pattern");
        harness.create_file("Cmd-Wrapper.txt", WRAPPER_TEMPLATE);
        Self { harness }
    }

    /// Write `atomics/<technique>/<technique>.yaml`.
    pub fn add_definition(&self, technique: &str, yaml: &str) -> PathBuf {
        self.harness
            .create_file(format!("atomics/{technique}/{technique}.yaml"), yaml)
    }

    /// Write a bundled STIX attack-pattern record mapping `technique` to `phase`.
    pub fn add_attack_pattern(&self, technique: &str, phase: &str) -> PathBuf {
        let bundle = json!({
            "type": "bundle",
            "id": format!("bundle--{technique}"),
            "objects": [{
                "type": "attack-pattern",
                "id": format!("attack-pattern--{technique}"),
                "name": technique,
                "external_references": [
                    { "source_name": "mitre-attack", "external_id": technique }
                ],
                "kill_chain_phases": [
                    { "kill_chain_name": "mitre-attack", "phase_name": phase }
                ]
            }]
        });
        self.harness.create_file(
            format!("cti/enterprise-attack/attack-pattern/attack-pattern--{technique}.json"),
            serde_json::to_string_pretty(&bundle).expect("serialize bundle"),
        )
    }

    pub fn config(&self) -> Config {
        Config {
            input_dir: self.harness.temp_path("atomics"),
            output_dir: self.harness.temp_path("out"),
            cti_dir: self.harness.temp_path("cti"),
            ledger_path: self.harness.temp_path("atomic-caldera.csv"),
            variable_ledger_path: self.harness.temp_path("atomic-variables.csv"),
            cmd_wrapper_path: self.harness.temp_path("Cmd-Wrapper.txt"),
            marker_dir: "T1002".to_string(),
            assume_yes: true,
        }
    }

    /// Every ability file written so far.
    pub fn abilities(&self) -> Vec<PathBuf> {
        self.harness.files_with_extension("out/abilities", "yml")
    }

    /// Data rows of a ledger (header excluded).
    pub fn ledger_rows(&self, file: &str) -> Vec<csv::StringRecord> {
        let mut reader = csv::Reader::from_path(self.harness.temp_path(file)).expect("open ledger");
        reader
            .records()
            .collect::<Result<_, _>>()
            .expect("parse ledger")
    }
}

/// A definition with one test.
pub fn single_test(technique: &str, name: &str, executor: &str, command: &str) -> String {
    format!(
        "attack_technique: {technique}\n\
         display_name: Command and Scripting Interpreter\n\
         atomic_tests:\n\
         - name: {name}\n\
         \x20 description: says hi\n\
         \x20 executor:\n\
         \x20   name: {executor}\n\
         \x20   command: {command}\n"
    )
}
