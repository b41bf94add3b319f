//! Analyzer directory layout and `analyzer init` scaffolding.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::info;

use super::config::{AnalyzerConfig, write_config};
use crate::pass::FileKind;

/// Canonical paths within an analyzer directory.
#[derive(Debug, Clone)]
pub struct AnalyzerPaths {
    pub root: PathBuf,
    /// Rule and record files, plus the pass descriptor.
    pub spec_dir: PathBuf,
    /// Input texts; engine output lands in a `<input>_log` directory beside each one.
    pub input_dir: PathBuf,
    pub sequence_path: PathBuf,
    pub config_path: PathBuf,
    /// Present while an engine run is in flight.
    pub lock_path: PathBuf,
}

impl AnalyzerPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let spec_dir = root.join("spec");
        Self {
            input_dir: root.join("input"),
            sequence_path: spec_dir.join("analyzer.seq"),
            config_path: root.join("analyzer.toml"),
            lock_path: root.join(".analysis.lock"),
            spec_dir,
            root,
        }
    }

    /// Input path resolved against `input/` unless already absolute.
    pub fn resolve_input(&self, input: &Path) -> PathBuf {
        if input.is_absolute() {
            input.to_path_buf()
        } else {
            self.input_dir.join(input)
        }
    }

    /// Output directory the engine writes for `input` (`text.txt` → `text.txt_log`).
    pub fn log_dir(&self, input: &Path) -> PathBuf {
        let file = self.resolve_input(input);
        let mut name = file
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push("_log");
        file.with_file_name(name)
    }

    pub fn pass_file(&self, kind: FileKind, name: &str) -> PathBuf {
        self.spec_dir.join(kind.file_name(name))
    }
}

/// Options for `init_analyzer`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite an existing descriptor and config.
    pub force: bool,
}

/// Create the analyzer scaffolding in `root`: `spec/`, `input/`, a descriptor
/// holding only the tokenizer, and a default `analyzer.toml`.
///
/// Fails if the descriptor already exists unless `options.force` is set.
pub fn init_analyzer(root: &Path, options: &InitOptions) -> Result<AnalyzerPaths> {
    let paths = AnalyzerPaths::new(root);
    if paths.sequence_path.exists() && !options.force {
        return Err(anyhow!(
            "analyzer init: {} already exists (use --force to overwrite)",
            paths.sequence_path.display()
        ));
    }
    if paths.spec_dir.exists() && !paths.spec_dir.is_dir() {
        return Err(anyhow!("analyzer init: spec exists but is not a directory"));
    }

    create_dir(&paths.spec_dir)?;
    create_dir(&paths.input_dir)?;
    write_file(&paths.sequence_path, DEFAULT_SEQUENCE)?;
    write_config(&paths.config_path, &AnalyzerConfig::default())?;
    info!(root = %paths.root.display(), "analyzer initialized");

    Ok(paths)
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("create directory {}", path.display()))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("write file {}", path.display()))
}

const DEFAULT_SEQUENCE: &str = "# Analyzer pass sequence\ntokenize\tnil\t# Gen: Convert input to token list.\n";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_expected_layout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_analyzer(temp.path(), &InitOptions { force: false }).expect("init");

        assert!(paths.spec_dir.is_dir());
        assert!(paths.input_dir.is_dir());
        assert!(paths.config_path.is_file());
        assert_eq!(
            fs::read_to_string(&paths.sequence_path).expect("read"),
            DEFAULT_SEQUENCE
        );
        assert!(!paths.lock_path.exists());
    }

    #[test]
    fn init_without_force_refuses_existing_descriptor() {
        let temp = tempfile::tempdir().expect("tempdir");
        init_analyzer(temp.path(), &InitOptions { force: false }).expect("init");
        let err = init_analyzer(temp.path(), &InitOptions { force: false }).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn init_with_force_restores_descriptor() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_analyzer(temp.path(), &InitOptions { force: false }).expect("init");
        fs::write(&paths.sequence_path, "custom").expect("write custom");
        init_analyzer(temp.path(), &InitOptions { force: true }).expect("re-init");
        assert_eq!(
            fs::read_to_string(&paths.sequence_path).expect("read"),
            DEFAULT_SEQUENCE
        );
    }

    #[test]
    fn log_dir_sits_beside_input() {
        let paths = AnalyzerPaths::new("/tmp/ana");
        assert_eq!(
            paths.log_dir(Path::new("news/story.txt")),
            PathBuf::from("/tmp/ana/input/news/story.txt_log")
        );
        assert_eq!(
            paths.log_dir(Path::new("/elsewhere/a.txt")),
            PathBuf::from("/elsewhere/a.txt_log")
        );
    }
}
