//! CSV ledgers of converted tests and their argument defaults.
//!
//! Both ledgers are loaded once, appended to in memory, and written back in
//! full by [`Table::flush`]. A missing ledger, or one with a foreign header,
//! loads as empty: that is a first run. Rows are read by header name; short
//! rows fill the absent columns with empty strings and surplus fields are
//! dropped. A row that cannot be decoded at all aborts the load.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead as _, BufReader, Write as _};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Header of the test ledger.
pub const TEST_LEDGER_HEADER: &[&str] = &["attackUUID", "attackID", "origCommand", "command"];

/// Header of the variable ledger.
pub const VARIABLE_LEDGER_HEADER: &[&str] =
    &["attackUUID", "attackID", "executor", "variable", "value"];

/// A row type with a fixed CSV header.
pub trait LedgerRow: Serialize + DeserializeOwned {
    const HEADER: &'static [&'static str];
}

/// One converted test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestRecord {
    #[serde(rename = "attackUUID")]
    pub attack_uuid: String,
    #[serde(rename = "attackID")]
    pub attack_id: String,
    #[serde(rename = "origCommand")]
    pub orig_command: String,
    pub command: String,
}

impl LedgerRow for TestRecord {
    const HEADER: &'static [&'static str] = TEST_LEDGER_HEADER;
}

/// One argument default of a converted test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableRecord {
    #[serde(rename = "attackUUID")]
    pub attack_uuid: String,
    #[serde(rename = "attackID")]
    pub attack_id: String,
    pub executor: String,
    pub variable: String,
    pub value: String,
}

impl LedgerRow for VariableRecord {
    const HEADER: &'static [&'static str] = VARIABLE_LEDGER_HEADER;
}

/// Whether the first line of `path` is exactly `header`.
///
/// Both `\n` and `\r\n` line endings are accepted.
pub fn header_matches(path: &Path, header: &[&str]) -> Result<bool> {
    let mut line = String::new();
    BufReader::new(File::open(path)?).read_line(&mut line)?;
    let Some(line) = line
        .strip_suffix("\r\n")
        .or_else(|| line.strip_suffix('\n'))
    else {
        return Ok(false);
    };
    Ok(line == header.join(","))
}

/// An ordered, append-only table backed by a CSV file.
#[derive(Debug)]
pub struct Table<R> {
    path: PathBuf,
    rows: Vec<R>,
}

impl<R: LedgerRow> Table<R> {
    /// Load `path`, falling back to an empty table when it is absent or foreign.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let rows = match read_rows(&path)? {
            Some(rows) => {
                tracing::debug!(path = %path.display(), rows = rows.len(), "Loaded ledger");
                rows
            }
            None => Vec::new(),
        };
        Ok(Self { path, rows })
    }

    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rows: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: R) {
        self.rows.push(row);
    }

    /// Rewrite the backing file with the header and every row.
    pub fn flush(&self) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        let tmp = NamedTempFile::new_in(parent)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(tmp);
        writer.write_record(R::HEADER)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        let mut tmp = writer.into_inner().map_err(|err| {
            Error::ledger(format!(
                "Failed to write ledger {}: {}",
                self.path.display(),
                err.error()
            ))
        })?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|err| {
            Error::ledger(format!(
                "Failed to persist ledger {}: {}",
                self.path.display(),
                err.error
            ))
        })?;
        tracing::debug!(path = %self.path.display(), rows = self.rows.len(), "Ledger written");
        Ok(())
    }
}

fn read_rows<R: LedgerRow>(path: &Path) -> Result<Option<Vec<R>>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path);
    let mut reader = match reader {
        Ok(reader) => reader,
        Err(err) => {
            tracing::debug!(
                path = %path.display(),
                error = %err,
                "Ledger not loaded, starting empty"
            );
            return Ok(None);
        }
    };
    let header_ok = reader
        .headers()
        .is_ok_and(|headers| headers.iter().eq(R::HEADER.iter().copied()));
    if !header_ok {
        tracing::debug!(path = %path.display(), "Unexpected ledger header, starting empty");
        return Ok(None);
    }

    let mut rows = Vec::new();
    for row in reader.deserialize::<R>() {
        let row = row.map_err(|err| {
            Error::ledger(format!("Unable to read ledger {}: {err}", path.display()))
        })?;
        rows.push(row);
    }
    Ok(Some(rows))
}

/// The test ledger, indexed by identifier and by deduplication key.
#[derive(Debug)]
pub struct TestLedger {
    table: Table<TestRecord>,
    ids: HashSet<String>,
    keys: HashSet<(String, String)>,
}

impl TestLedger {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        Table::load(path).map(Self::from_table)
    }

    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self::from_table(Table::empty(path))
    }

    fn from_table(table: Table<TestRecord>) -> Self {
        let ids = table.rows().iter().map(|r| r.attack_uuid.clone()).collect();
        let keys = table
            .rows()
            .iter()
            .map(|r| (r.attack_id.clone(), r.orig_command.clone()))
            .collect();
        Self { table, ids, keys }
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Whether a test with this technique and original command was already converted.
    pub fn contains(&self, attack_id: &str, orig_command: &str) -> bool {
        self.keys
            .contains(&(attack_id.to_string(), orig_command.to_string()))
    }

    /// Append a row, refusing to break identifier or key uniqueness.
    pub fn push(&mut self, record: TestRecord) -> Result<()> {
        if self.ids.contains(&record.attack_uuid) {
            return Err(Error::ledger(format!(
                "identifier {} is already catalogued",
                record.attack_uuid
            )));
        }
        let key = (record.attack_id.clone(), record.orig_command.clone());
        if self.keys.contains(&key) {
            return Err(Error::ledger(format!(
                "{} with this command is already catalogued",
                record.attack_id
            )));
        }
        self.ids.insert(record.attack_uuid.clone());
        self.keys.insert(key);
        self.table.push(record);
        Ok(())
    }

    pub fn rows(&self) -> &[TestRecord] {
        self.table.rows()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn flush(&self) -> Result<()> {
        self.table.flush()
    }
}

pub type VariableLedger = Table<VariableRecord>;

/// Both ledgers, owned by one run.
#[derive(Debug)]
pub struct Ledgers {
    pub tests: TestLedger,
    pub variables: VariableLedger,
}

impl Ledgers {
    pub fn load(
        test_path: impl Into<PathBuf>,
        variable_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        Ok(Self {
            tests: TestLedger::load(test_path)?,
            variables: VariableLedger::load(variable_path)?,
        })
    }

    /// Write both ledgers back to disk.
    pub fn flush(&self) -> Result<()> {
        self.tests.flush()?;
        self.variables.flush()
    }
}
