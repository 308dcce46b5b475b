//! Typed schema for Atomic Red Team definition files.
//!
//! Every field is optional: definition trees contain files that are not test
//! definitions at all, and upstream tests omit fields freely. Callers decide
//! which absences skip work and which abort.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// One parsed definition file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AtomicDefinition {
    #[serde(deserialize_with = "scalar")]
    pub attack_technique: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub display_name: Option<String>,
    pub atomic_tests: Option<Vec<AtomicTest>>,
}

/// A single test record inside a definition file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AtomicTest {
    #[serde(deserialize_with = "scalar")]
    pub name: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub description: Option<String>,
    pub executor: Option<ExecutorSpec>,
    pub input_arguments: Option<Mapping>,
}

/// Execution environment plus command template.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExecutorSpec {
    #[serde(deserialize_with = "scalar")]
    pub name: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub command: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct InputArgument {
    #[serde(deserialize_with = "present")]
    default: Option<Value>,
}

// Distinguishes `default: ~` (Some(Null)) from a missing key (None).
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

// Scalars of any YAML type read as their text form, so `name: 2020` or
// `command: true` load the same as their quoted spellings.
fn scalar<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(scalar_text(&value))
}

/// Result of reading a file from the definition tree.
#[derive(Debug)]
pub enum Parsed {
    /// The file carries a technique identifier.
    Definition(AtomicDefinition),
    /// Valid YAML, but not a test definition.
    NotADefinition,
}

impl AtomicDefinition {
    /// Read and parse a definition file. Unparseable YAML is an error.
    pub fn load(path: &Path) -> Result<Parsed> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| Error::definition(path.display().to_string(), err.to_string()))?;
        Self::parse(&content).map_err(|err| match err {
            Error::Yaml(inner) => Error::definition(path.display().to_string(), inner.to_string()),
            other => other,
        })
    }

    /// Parse definition text.
    pub fn parse(content: &str) -> Result<Parsed> {
        let value: Value = serde_yaml::from_str(content)?;
        let has_technique = value
            .as_mapping()
            .is_some_and(|map| map.contains_key("attack_technique"));
        if !has_technique {
            return Ok(Parsed::NotADefinition);
        }
        let definition: Self = serde_yaml::from_value(value)?;
        if definition.attack_technique.is_none() {
            return Ok(Parsed::NotADefinition);
        }
        Ok(Parsed::Definition(definition))
    }
}

impl AtomicTest {
    /// Encoded argument defaults in source order, as `(name, value)` pairs.
    ///
    /// Values are stringified and then passed through
    /// [`crate::escape::normalize_argument`].
    pub fn argument_defaults(&self, technique: &str) -> Result<Vec<(String, String)>> {
        let Some(arguments) = &self.input_arguments else {
            return Ok(Vec::new());
        };
        let mut out = Vec::with_capacity(arguments.len());
        for (key, spec) in arguments {
            let name = scalar_text(key).unwrap_or_default();
            let argument: InputArgument = serde_yaml::from_value(spec.clone())
                .map_err(|err| Error::argument(technique, &name, err.to_string()))?;
            let Some(default) = argument.default else {
                return Err(Error::argument(technique, name, "no default value"));
            };
            let text = encode_value(&default)
                .map_err(|message| Error::argument(technique, &name, message))?;
            out.push((name, crate::escape::normalize_argument(&text)));
        }
        Ok(out)
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn encode_value(value: &Value) -> std::result::Result<String, String> {
    if let Some(text) = scalar_text(value) {
        return Ok(text);
    }
    serde_json::to_string(value).map_err(|err| err.to_string())
}
