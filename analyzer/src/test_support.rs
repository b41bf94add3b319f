//! Test-only helpers for building sequences and scratch analyzer directories.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::descriptor::parse_descriptor;
use crate::core::sequence::PassSequence;
use crate::decode::Decoder;
use crate::io::artifacts::{ArtifactKind, artifact_path};
use crate::io::config::AnalyzerConfig;
use crate::io::init::AnalyzerPaths;
use crate::io::sequence_store::SequenceStore;
use crate::pass::{Pass, PassKind};

/// Parse descriptor text against a fixed `spec` directory.
pub fn sequence_from(descriptor: &str) -> PassSequence {
    parse_descriptor(descriptor, Path::new("spec"))
}

/// Names of every non-comment row, in order.
pub fn names(sequence: &PassSequence) -> Vec<&str> {
    sequence
        .passes()
        .iter()
        .filter(|pass| !pass.name().is_empty())
        .map(Pass::name)
        .collect()
}

/// Ordinal of every pass row (comments and folder markers skipped), in order.
pub fn ordinals(sequence: &PassSequence) -> Vec<Option<usize>> {
    sequence
        .passes()
        .iter()
        .filter(|pass| pass.kind() != PassKind::Comment && !pass.is_folder_marker())
        .map(|pass| pass.ordinal)
        .collect()
}

/// Analyzer directory in a temp dir, removed on drop.
pub struct TestAnalyzer {
    _temp: TempDir,
    paths: AnalyzerPaths,
}

impl TestAnalyzer {
    /// Create `spec/` and `input/` and write `descriptor` as the pass sequence.
    pub fn new(descriptor: &str) -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = AnalyzerPaths::new(temp.path());
        fs::create_dir_all(&paths.spec_dir).expect("create spec dir");
        fs::create_dir_all(&paths.input_dir).expect("create input dir");
        fs::write(&paths.sequence_path, descriptor).expect("write descriptor");
        Self { _temp: temp, paths }
    }

    pub fn root(&self) -> &Path {
        &self.paths.root
    }

    pub fn paths(&self) -> &AnalyzerPaths {
        &self.paths
    }

    pub fn store(&self) -> SequenceStore {
        SequenceStore::new(self.paths.clone())
    }

    pub fn decoder(&self) -> Decoder {
        Decoder::new(self.paths.clone(), AnalyzerConfig::default())
    }

    /// Current descriptor text on disk.
    pub fn descriptor(&self) -> String {
        fs::read_to_string(&self.paths.sequence_path).expect("read descriptor")
    }

    pub fn write_pass(&self, file_name: &str, contents: &str) -> PathBuf {
        let path = self.paths.spec_dir.join(file_name);
        fs::write(&path, contents).expect("write pass file");
        path
    }

    pub fn write_input(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.paths.input_dir.join(name);
        fs::write(&path, contents).expect("write input");
        path
    }

    /// Output directory for `input`, created if needed.
    pub fn log_dir(&self, input: &str) -> PathBuf {
        let dir = self.paths.log_dir(Path::new(input));
        fs::create_dir_all(&dir).expect("create log dir");
        dir
    }

    pub fn write_artifact(
        &self,
        input: &str,
        ordinal: usize,
        kind: ArtifactKind,
        contents: &str,
    ) -> PathBuf {
        let path = artifact_path(&self.log_dir(input), ordinal, kind);
        fs::write(&path, contents).expect("write artifact");
        path
    }

    pub fn read_artifact(&self, input: &str, ordinal: usize, kind: ArtifactKind) -> Option<String> {
        fs::read_to_string(artifact_path(&self.log_dir(input), ordinal, kind)).ok()
    }
}
