//! ATT&CK technique-to-tactic lookup against a local STIX catalog.
//!
//! The catalog root is a checkout of the MITRE CTI repository. Technique
//! records live under `enterprise-attack/attack-pattern/`, either as flat
//! `attack-pattern--<id>.json` files or as one directory per object holding
//! versioned files. Each file holds a bare STIX object or a `bundle`.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Tactic used when a technique has no match in the catalog.
pub const UNKNOWN_TACTIC: &str = "unknown";

/// Dataset directory expected under the catalog root.
pub const ENTERPRISE_DATASET: &str = "enterprise-attack";

const ATTACK_PATTERN_TYPE: &str = "attack-pattern";

/// Read-only technique classification.
pub trait TacticResolver {
    /// Primary kill-chain phase of `technique_id`, if known.
    fn resolve(&self, technique_id: &str) -> Option<String>;

    /// Like [`TacticResolver::resolve`], falling back to [`UNKNOWN_TACTIC`].
    fn tactic_for(&self, technique_id: &str) -> String {
        self.resolve(technique_id)
            .unwrap_or_else(|| UNKNOWN_TACTIC.to_string())
    }
}

impl TacticResolver for HashMap<String, String> {
    fn resolve(&self, technique_id: &str) -> Option<String> {
        self.get(technique_id).cloned()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StixObject {
    #[serde(rename = "type")]
    kind: String,
    objects: Vec<StixObject>,
    external_references: Vec<ExternalReference>,
    kill_chain_phases: Vec<KillChainPhase>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExternalReference {
    external_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct KillChainPhase {
    phase_name: String,
}

/// Technique identifiers indexed from the attack-pattern records of a CTI checkout.
#[derive(Debug, Default)]
pub struct StixCatalog {
    root: PathBuf,
    phases: HashMap<String, String>,
}

impl StixCatalog {
    /// Index the catalog under `cti_root`.
    ///
    /// Files are read in sorted path order and the first record naming an
    /// identifier wins.
    pub fn open(cti_root: &Path) -> Result<Self> {
        let dataset = cti_root.join(ENTERPRISE_DATASET);
        if !dataset.is_dir() {
            return Err(Error::taxonomy(format!(
                "{} is not a MITRE CTI checkout: missing {ENTERPRISE_DATASET}/",
                cti_root.display()
            )));
        }

        let mut catalog = Self {
            root: cti_root.to_path_buf(),
            phases: HashMap::new(),
        };
        let patterns = dataset.join(ATTACK_PATTERN_TYPE);
        if !patterns.is_dir() {
            tracing::warn!(
                path = %patterns.display(),
                "No attack-pattern records found; every technique resolves to unknown"
            );
            return Ok(catalog);
        }

        let mut files = 0usize;
        for entry in WalkDir::new(&patterns).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || !path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
            {
                continue;
            }
            let content = std::fs::read_to_string(path)?;
            let object: StixObject = serde_json::from_str(&content).map_err(|err| {
                Error::taxonomy(format!("Unable to parse {}: {err}", path.display()))
            })?;
            catalog.index(&object);
            files += 1;
        }
        tracing::debug!(
            root = %cti_root.display(),
            files,
            techniques = catalog.phases.len(),
            "Indexed STIX catalog"
        );
        Ok(catalog)
    }

    fn index(&mut self, object: &StixObject) {
        for inner in &object.objects {
            self.index(inner);
        }
        if object.kind != ATTACK_PATTERN_TYPE {
            return;
        }
        let Some(phase) = object.kill_chain_phases.first() else {
            return;
        };
        for reference in &object.external_references {
            if let Some(id) = &reference.external_id {
                self.phases
                    .entry(id.clone())
                    .or_insert_with(|| phase.phase_name.clone());
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

impl TacticResolver for StixCatalog {
    fn resolve(&self, technique_id: &str) -> Option<String> {
        self.phases.get(technique_id).cloned()
    }
}
