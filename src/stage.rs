//! Per-run working directory staging.
//!
//! Each run gets a fresh temp directory holding the three generated input
//! files plus the path where the engine is expected to leave its output.
//! The directory is deleted when the `Workdir` drops, unless the caller
//! asked to retain it for debugging — then it is deliberately leaked and
//! its path logged.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{BridgeResult, RuntimeError};
use crate::model::{Relation, Rule};
use crate::{facts, program};

pub const PROGRAM_FILENAME: &str = "prog.mln";
pub const EVIDENCE_FILENAME: &str = "evidence.db";
pub const QUERY_FILENAME: &str = "query.db";
pub const OUTPUT_FILENAME: &str = "out.txt";

const WORKDIR_PREFIX: &str = "mln-bridge.";

/// A staged working directory, cleaned up on drop unless retained.
#[derive(Debug)]
pub struct Workdir {
    // `None` when the caller opted to keep the directory on disk.
    temp: Option<TempDir>,
    path: PathBuf,
}

impl Workdir {
    /// Create a fresh directory and write the program, evidence, and query
    /// files into it.
    pub fn stage(relations: &[Relation], rules: &[Rule], retain: bool) -> BridgeResult<Self> {
        let temp = tempfile::Builder::new()
            .prefix(WORKDIR_PREFIX)
            .tempdir()
            .map_err(|source| RuntimeError::Stage {
                path: std::env::temp_dir().display().to_string(),
                source,
            })?;

        let program_text = program::write_program(relations, rules)?;
        let evidence_text = facts::write_evidence(relations)?;
        let query_text = facts::write_query(relations)?;

        write_file(temp.path(), PROGRAM_FILENAME, &program_text)?;
        write_file(temp.path(), EVIDENCE_FILENAME, &evidence_text)?;
        write_file(temp.path(), QUERY_FILENAME, &query_text)?;

        if retain {
            let path = temp.keep();
            tracing::info!(path = %path.display(), "retaining working directory");
            Ok(Self { temp: None, path })
        } else {
            let path = temp.path().to_path_buf();
            Ok(Self {
                temp: Some(temp),
                path,
            })
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the engine is expected to leave its output.
    pub fn output_path(&self) -> PathBuf {
        self.path.join(OUTPUT_FILENAME)
    }

    pub fn is_retained(&self) -> bool {
        self.temp.is_none()
    }
}

fn write_file(dir: &Path, name: &str, content: &str) -> Result<(), RuntimeError> {
    let path = dir.join(name);
    std::fs::write(&path, content).map_err(|source| RuntimeError::Stage {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Relation, Rule};

    fn typed_relation(name: &str) -> Relation {
        let mut relation = Relation::new(name, 1);
        relation.variable_types = Some(vec!["person".into()]);
        relation.observed_rows = vec![vec!["alice".into()]];
        relation.unobserved_rows = vec![vec!["bob".into()]];
        relation
    }

    #[test]
    fn stages_all_three_input_files() {
        let relations = vec![typed_relation("Smokes")];
        let rules = vec![Rule::weighted("Smokes(X) -> Smokes(X)", 1.0)];

        let workdir = Workdir::stage(&relations, &rules, false).unwrap();

        assert!(workdir.path().join(PROGRAM_FILENAME).exists());
        assert!(workdir.path().join(EVIDENCE_FILENAME).exists());
        assert!(workdir.path().join(QUERY_FILENAME).exists());
        assert!(!workdir.output_path().exists());
    }

    #[test]
    fn directory_is_removed_on_drop() {
        let relations = vec![typed_relation("Smokes")];
        let workdir = Workdir::stage(&relations, &[], false).unwrap();
        let path = workdir.path().to_path_buf();

        assert!(path.exists());
        drop(workdir);
        assert!(!path.exists());
    }

    #[test]
    fn retained_directory_survives_drop() {
        let relations = vec![typed_relation("Smokes")];
        let workdir = Workdir::stage(&relations, &[], true).unwrap();
        let path = workdir.path().to_path_buf();
        assert!(workdir.is_retained());

        drop(workdir);
        assert!(path.exists());

        std::fs::remove_dir_all(path).unwrap();
    }
}
