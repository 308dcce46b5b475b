//! Writes ability files into the tactic-keyed output tree.

use crate::ability::Ability;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Name of the output container directory.
pub const ABILITIES_DIR: &str = "abilities";

/// Extension of written ability files.
pub const ABILITY_EXTENSION: &str = "yml";

/// Writes `<root>/abilities/<tactic>/<id>.yml`.
#[derive(Debug, Clone)]
pub struct AbilityWriter {
    abilities_dir: PathBuf,
}

impl AbilityWriter {
    /// A writer rooted at `output_root`; nothing is created until the first write.
    pub fn new(output_root: &Path) -> Self {
        Self {
            abilities_dir: output_root.join(ABILITIES_DIR),
        }
    }

    pub fn abilities_dir(&self) -> &Path {
        &self.abilities_dir
    }

    /// Write one ability, creating directories as needed. Returns the file path.
    pub fn write(&self, ability: &Ability) -> Result<PathBuf> {
        ensure_dir(&self.abilities_dir)?;
        let tactic = ability.tactic.as_str();
        if tactic.is_empty() || tactic == "." || tactic == ".." || tactic.contains(['/', '\\']) {
            return Err(Error::output(
                self.abilities_dir.display().to_string(),
                format!("unusable tactic directory name {:?}", ability.tactic),
            ));
        }
        let tactic_dir = self.abilities_dir.join(&ability.tactic);
        ensure_dir(&tactic_dir)?;

        let path = tactic_dir.join(format!("{}.{ABILITY_EXTENSION}", ability.id));
        std::fs::write(&path, ability.to_yaml())
            .map_err(|err| Error::output(path.display().to_string(), err.to_string()))?;
        tracing::debug!(path = %path.display(), "Ability written");
        Ok(path)
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        tracing::debug!(path = %dir.display(), "Directory exists");
        return Ok(());
    }
    std::fs::create_dir_all(dir)
        .map_err(|err| Error::output(dir.display().to_string(), err.to_string()))?;
    tracing::debug!(path = %dir.display(), "Directory created");
    Ok(())
}
