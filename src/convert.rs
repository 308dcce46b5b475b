//! Conversion pipeline: walk the definition tree, transform each test, emit
//! new abilities and record them in the ledgers.
//!
//! The run is strictly sequential. Any error aborts it before the ledgers are
//! flushed, so the ledger files on disk keep their pre-run content.

use crate::ability::{Ability, ExecutorCommand, Technique, normalize_description};
use crate::atomic::{AtomicDefinition, AtomicTest, Parsed};
use crate::config::Config;
use crate::emit::AbilityWriter;
use crate::error::Result;
use crate::escape::normalize_command;
use crate::executor::{CommandWrapper, ExecutorFamily, normalize};
use crate::ledger::{Ledgers, TestRecord, VariableRecord};
use crate::preflight::is_definition_file;
use crate::taxonomy::TacticResolver;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    /// Definition files carrying a technique identifier.
    pub files_processed: usize,
    /// Definition files without one.
    pub files_skipped: usize,
    pub emitted: usize,
    pub duplicates: usize,
    pub unsupported: usize,
}

impl fmt::Display for ConversionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Definition files processed: {}", self.files_processed)?;
        writeln!(f, "Definition files skipped:   {}", self.files_skipped)?;
        writeln!(f, "Abilities written:          {}", self.emitted)?;
        writeln!(f, "Already catalogued:         {}", self.duplicates)?;
        write!(f, "Unsupported executors:      {}", self.unsupported)
    }
}

/// What happened to one test entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Emitted(PathBuf),
    Duplicate,
    UnsupportedExecutor,
}

/// Owns the per-run state: ledgers, output writer and wrapper template.
pub struct Converter<'a, R: TacticResolver> {
    resolver: &'a R,
    writer: AbilityWriter,
    wrapper: CommandWrapper,
    ledgers: Ledgers,
    summary: ConversionSummary,
    on_file: Box<dyn FnMut(&Path) + 'a>,
}

impl<'a, R: TacticResolver> Converter<'a, R> {
    pub fn new(
        resolver: &'a R,
        writer: AbilityWriter,
        wrapper: CommandWrapper,
        ledgers: Ledgers,
    ) -> Self {
        Self {
            resolver,
            writer,
            wrapper,
            ledgers,
            summary: ConversionSummary::default(),
            on_file: Box::new(|_: &Path| {}),
        }
    }

    /// Call `on_file` with each definition path just before it is converted.
    #[must_use]
    pub fn on_file(mut self, on_file: impl FnMut(&Path) + 'a) -> Self {
        self.on_file = Box::new(on_file);
        self
    }

    pub const fn summary(&self) -> &ConversionSummary {
        &self.summary
    }

    pub const fn ledgers(&self) -> &Ledgers {
        &self.ledgers
    }

    /// Convert every definition file under `input_dir`, in sorted path order.
    pub fn run(&mut self, input_dir: &Path) -> Result<()> {
        for entry in WalkDir::new(input_dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() || !is_definition_file(entry.path()) {
                continue;
            }
            tracing::debug!(path = %entry.path().display(), "Processing definition");
            (self.on_file)(entry.path());
            self.convert_file(entry.path())?;
        }
        Ok(())
    }

    /// Convert all tests of one definition file.
    pub fn convert_file(&mut self, path: &Path) -> Result<()> {
        let definition = match AtomicDefinition::load(path)? {
            Parsed::Definition(definition) => definition,
            Parsed::NotADefinition => {
                tracing::debug!(path = %path.display(), "No attack_technique, skipping");
                self.summary.files_skipped += 1;
                return Ok(());
            }
        };
        self.summary.files_processed += 1;

        let technique = definition.attack_technique.as_deref().unwrap_or_default();
        let tactic = self.resolver.tactic_for(technique);
        tracing::debug!(technique, tactic = %tactic, "Resolved tactic");

        let Some(tests) = &definition.atomic_tests else {
            tracing::debug!(path = %path.display(), "No atomic_tests, skipping");
            return Ok(());
        };
        let display_name = definition.display_name.as_deref().unwrap_or_default();
        for test in tests {
            let outcome = self.convert_test(technique, display_name, &tactic, test)?;
            tracing::debug!(technique, test = ?test.name, ?outcome, "Test converted");
        }
        Ok(())
    }

    /// Transform one test entry and emit it unless it is filtered or catalogued.
    pub fn convert_test(
        &mut self,
        technique: &str,
        display_name: &str,
        tactic: &str,
        test: &AtomicTest,
    ) -> Result<TestOutcome> {
        let (executor_name, raw_command) = test
            .executor
            .as_ref()
            .and_then(|e| Some((e.name.as_deref().unwrap_or_default(), e.command.as_deref()?)))
            .unwrap_or(("", ""));

        let id = self.mint_id();
        let Some(family) = ExecutorFamily::from_name(executor_name) else {
            tracing::info!(technique, executor = executor_name, "Unsupported executor");
            self.summary.unsupported += 1;
            return Ok(TestOutcome::UnsupportedExecutor);
        };

        let orig_command = normalize_command(raw_command);
        let (key, command) = normalize(family, &orig_command, &mut self.wrapper)?;

        let variables: Vec<VariableRecord> = test
            .argument_defaults(technique)?
            .into_iter()
            .map(|(variable, value)| VariableRecord {
                attack_uuid: id.clone(),
                attack_id: technique.to_string(),
                executor: key.to_string(),
                variable,
                value,
            })
            .collect();

        if self.ledgers.tests.contains(technique, &orig_command) {
            self.summary.duplicates += 1;
            return Ok(TestOutcome::Duplicate);
        }

        let ability = Ability {
            id: id.clone(),
            name: display_name.to_string(),
            description: normalize_description(test.description.as_deref().unwrap_or_default()),
            tactic: tactic.to_string(),
            technique: Technique {
                attack_id: technique.to_string(),
                name: test.name.clone().unwrap_or_default(),
            },
            executors: BTreeMap::from([(
                key,
                ExecutorCommand {
                    command: command.clone(),
                },
            )]),
        };
        let path = self.writer.write(&ability)?;

        self.ledgers.tests.push(TestRecord {
            attack_uuid: id,
            attack_id: technique.to_string(),
            orig_command,
            command,
        })?;
        for row in variables {
            self.ledgers.variables.push(row);
        }
        self.summary.emitted += 1;
        Ok(TestOutcome::Emitted(path))
    }

    /// Flush both ledgers and return the run summary.
    pub fn finish(self) -> Result<ConversionSummary> {
        self.ledgers.flush()?;
        tracing::info!(
            tests = self.ledgers.tests.len(),
            variables = self.ledgers.variables.len(),
            "Ledgers written"
        );
        Ok(self.summary)
    }

    fn mint_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if !self.ledgers.tests.contains_id(&id) {
                return id;
            }
            tracing::warn!(id = %id, "Generated identifier already catalogued, retrying");
        }
    }
}

/// Run the whole pipeline for `config`.
pub fn run<R: TacticResolver>(config: &Config, resolver: &R) -> Result<ConversionSummary> {
    run_with_progress(config, resolver, |_| {})
}

/// [`run`], reporting each definition path to `on_file` as it is reached.
pub fn run_with_progress<R: TacticResolver>(
    config: &Config,
    resolver: &R,
    on_file: impl FnMut(&Path),
) -> Result<ConversionSummary> {
    let ledgers = Ledgers::load(&config.ledger_path, &config.variable_ledger_path)?;
    tracing::info!(
        tests = ledgers.tests.len(),
        variables = ledgers.variables.len(),
        "Ledgers loaded"
    );
    let mut converter = Converter::new(
        resolver,
        AbilityWriter::new(&config.output_dir),
        CommandWrapper::new(&config.cmd_wrapper_path),
        ledgers,
    )
    .on_file(on_file);
    converter.run(&config.input_dir)?;
    converter.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomic::ExecutorSpec;
    use crate::error::Error;
    use std::collections::HashMap;

    struct Fixture {
        dir: tempfile::TempDir,
        tactics: HashMap<String, String>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                tactics: HashMap::from([("T1059".to_string(), "execution".to_string())]),
            }
        }

        fn converter(&self) -> Converter<'_, HashMap<String, String>> {
            let root = self.dir.path();
            Converter::new(
                &self.tactics,
                AbilityWriter::new(root),
                CommandWrapper::from_template("cmd.exe /c \"#{command}\""),
                Ledgers::load(root.join("tests.csv"), root.join("vars.csv")).unwrap(),
            )
        }
    }

    fn test(executor: &str, command: &str) -> AtomicTest {
        AtomicTest {
            name: Some("Say Hi".to_string()),
            description: Some("says\n  hi".to_string()),
            executor: Some(ExecutorSpec {
                name: Some(executor.to_string()),
                command: Some(command.to_string()),
            }),
            input_arguments: None,
        }
    }

    fn with_arguments(mut test: AtomicTest, yaml: &str) -> AtomicTest {
        test.input_arguments = Some(serde_yaml::from_str(yaml).unwrap());
        test
    }

    #[test]
    fn emits_ability_and_ledger_row() {
        let fixture = Fixture::new();
        let mut converter = fixture.converter();
        let outcome = converter
            .convert_test("T1059", "Command Interpreter", "execution", &test("bash", "echo hi"))
            .unwrap();
        let TestOutcome::Emitted(path) = outcome else {
            panic!("expected emission, got {outcome:?}");
        };
        assert!(path.starts_with(fixture.dir.path().join("abilities/execution")));

        let abilities: Vec<Ability> =
            serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(abilities[0].name, "Command Interpreter");
        assert_eq!(abilities[0].description, "says hi (Atomic Red Team)");
        assert_eq!(abilities[0].technique.name, "Say Hi");

        let rows = converter.ledgers().tests.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].orig_command, "echo hi");
        assert_eq!(rows[0].attack_uuid, abilities[0].id);
    }

    #[test]
    fn second_identical_test_is_a_duplicate() {
        let fixture = Fixture::new();
        let mut converter = fixture.converter();
        let t = with_arguments(test("sh", "echo #{msg}"), "msg:\n  default: hi\n");
        converter.convert_test("T1059", "", "execution", &t).unwrap();
        let outcome = converter.convert_test("T1059", "", "execution", &t).unwrap();
        assert_eq!(outcome, TestOutcome::Duplicate);
        assert_eq!(converter.ledgers().tests.len(), 1);
        assert_eq!(converter.ledgers().variables.len(), 1);
        assert_eq!(converter.summary().duplicates, 1);
    }

    #[test]
    fn unsupported_executor_is_dropped() {
        let fixture = Fixture::new();
        let mut converter = fixture.converter();
        let outcome = converter
            .convert_test("T1059", "", "execution", &test("manual", "click things"))
            .unwrap();
        assert_eq!(outcome, TestOutcome::UnsupportedExecutor);
        assert!(converter.ledgers().tests.is_empty());
        assert!(!fixture.dir.path().join("abilities").exists());
    }

    #[test]
    fn missing_command_is_treated_as_unsupported() {
        let fixture = Fixture::new();
        let mut converter = fixture.converter();
        let mut t = test("bash", "");
        t.executor = Some(ExecutorSpec {
            name: Some("bash".to_string()),
            command: None,
        });
        let outcome = converter.convert_test("T1059", "", "execution", &t).unwrap();
        assert_eq!(outcome, TestOutcome::UnsupportedExecutor);
    }

    #[test]
    fn command_prompt_is_wrapped_and_keyed_psh() {
        let fixture = Fixture::new();
        let mut converter = fixture.converter();
        converter
            .convert_test("T1059", "", "execution", &test("command_prompt", "whoami"))
            .unwrap();
        let row = &converter.ledgers().tests.rows()[0];
        assert_eq!(row.orig_command, "whoami");
        assert_eq!(row.command, "cmd.exe /c \"whoami\"");
    }

    #[test]
    fn variable_rows_carry_executor_key() {
        let fixture = Fixture::new();
        let mut converter = fixture.converter();
        let t = with_arguments(
            test("powershell", "Get-Item #{path}"),
            "path:\n  default: C:\\Windows\nretries:\n  default: 3\n",
        );
        converter.convert_test("T1059", "", "execution", &t).unwrap();
        let vars = converter.ledgers().variables.rows();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].executor, "psh");
        assert_eq!(vars[0].variable, "path");
        assert_eq!(vars[0].value, "C:\\\\Windows");
        assert_eq!(vars[1].value, "3");
        assert_eq!(vars[0].attack_uuid, converter.ledgers().tests.rows()[0].attack_uuid);
    }

    #[test]
    fn argument_without_default_aborts_even_for_duplicates() {
        let fixture = Fixture::new();
        let mut converter = fixture.converter();
        converter
            .convert_test("T1059", "", "execution", &test("bash", "echo hi"))
            .unwrap();
        let broken = with_arguments(test("bash", "echo hi"), "msg:\n  type: string\n");
        let err = converter
            .convert_test("T1059", "", "execution", &broken)
            .unwrap_err();
        assert!(matches!(err, Error::Argument { .. }));
    }

    #[test]
    fn finish_flushes_ledgers() {
        let fixture = Fixture::new();
        let mut converter = fixture.converter();
        converter
            .convert_test("T1059", "", "execution", &test("bash", "echo hi"))
            .unwrap();
        let summary = converter.finish().unwrap();
        assert_eq!(summary.emitted, 1);
        let written = std::fs::read_to_string(fixture.dir.path().join("tests.csv")).unwrap();
        assert!(written.starts_with("attackUUID,attackID,origCommand,command"));
        assert!(written.contains("echo hi"));
        assert!(fixture.dir.path().join("vars.csv").exists());
    }

    #[test]
    fn run_reports_definition_files_in_sorted_order() {
        let fixture = Fixture::new();
        let atomics = fixture.dir.path().join("atomics");
        for technique in ["T1059", "T1003"] {
            let dir = atomics.join(technique);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(
                dir.join(format!("{technique}.yaml")),
                format!(
                    "attack_technique: {technique}\natomic_tests:\n- name: t\n  executor:\n    name: sh\n    command: id\n"
                ),
            )
            .unwrap();
            std::fs::write(dir.join("notes.md"), "not a definition").unwrap();
        }

        let mut seen = Vec::new();
        let mut converter = fixture.converter().on_file(|path| seen.push(path.to_path_buf()));
        converter.run(&atomics).unwrap();
        assert_eq!(converter.summary().files_processed, 2);
        drop(converter);
        assert_eq!(
            seen,
            vec![
                atomics.join("T1003").join("T1003.yaml"),
                atomics.join("T1059").join("T1059.yaml"),
            ]
        );
    }

    #[test]
    fn summary_renders_every_counter() {
        let summary = ConversionSummary {
            files_processed: 3,
            files_skipped: 1,
            emitted: 4,
            duplicates: 2,
            unsupported: 1,
        };
        let text = summary.to_string();
        assert!(text.contains("Abilities written:          4"));
        assert!(text.contains("Already catalogued:         2"));
        assert_eq!(text.lines().count(), 5);
    }
}
