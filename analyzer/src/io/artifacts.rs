//! Ordinal-keyed engine output files.
//!
//! The engine writes one set of files per pass into each `<input>_log`
//! directory, named `ana<NNN>.<ext>` after the pass ordinal.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, instrument};
use walkdir::WalkDir;

/// Suffix of the per-input output directories under `input/`.
pub const LOG_DIR_SUFFIX: &str = "_log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Structured node log (`.log`).
    TreeLog,
    /// Marker-annotated copy of the input (`.txxt`).
    Highlight,
    /// Knowledge-base dump (`.kbb`).
    KnowledgeBase,
}

impl ArtifactKind {
    pub fn extension(self) -> &'static str {
        match self {
            Self::TreeLog => "log",
            Self::Highlight => "txxt",
            Self::KnowledgeBase => "kbb",
        }
    }
}

/// Artifacts that trade places when their passes swap ordinals. The tree log
/// is regenerated on the next run and stays put.
pub const SWAPPED_ARTIFACTS: [ArtifactKind; 2] = [ArtifactKind::Highlight, ArtifactKind::KnowledgeBase];

pub fn artifact_file_name(ordinal: usize, kind: ArtifactKind) -> String {
    format!("ana{ordinal:03}.{}", kind.extension())
}

pub fn artifact_path(log_dir: &Path, ordinal: usize, kind: ArtifactKind) -> PathBuf {
    log_dir.join(artifact_file_name(ordinal, kind))
}

/// Every `<input>_log` directory below `input_dir`, sorted.
pub fn log_dirs(input_dir: &Path) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut dirs = Vec::new();
    for entry in WalkDir::new(input_dir).min_depth(1) {
        let entry = entry.with_context(|| format!("walk {}", input_dir.display()))?;
        if entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(LOG_DIR_SUFFIX))
        {
            dirs.push(entry.into_path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Exchange the swapped artifacts of ordinals `a` and `b` in `log_dir`.
///
/// When both files exist they rotate through a temporary name; when only one
/// exists it takes the other's name.
pub fn swap_artifacts(log_dir: &Path, a: usize, b: usize) -> Result<()> {
    for kind in SWAPPED_ARTIFACTS {
        let path_a = artifact_path(log_dir, a, kind);
        let path_b = artifact_path(log_dir, b, kind);
        match (path_a.exists(), path_b.exists()) {
            (true, true) => {
                let tmp = log_dir.join(format!("{}.swap", artifact_file_name(a, kind)));
                rename(&path_a, &tmp)?;
                rename(&path_b, &path_a)?;
                rename(&tmp, &path_b)?;
            }
            (true, false) => rename(&path_a, &path_b)?,
            (false, true) => rename(&path_b, &path_a)?,
            (false, false) => {}
        }
    }
    Ok(())
}

/// Replay `swaps` in order in every log directory under `input_dir`.
///
/// Returns the number of directories touched.
#[instrument(skip(swaps), fields(swaps = swaps.len()))]
pub fn apply_swaps(input_dir: &Path, swaps: &[(usize, usize)]) -> Result<usize> {
    if swaps.is_empty() {
        return Ok(0);
    }
    let dirs = log_dirs(input_dir)?;
    for dir in &dirs {
        for &(a, b) in swaps {
            swap_artifacts(dir, a, b)?;
        }
        debug!(dir = %dir.display(), "artifacts swapped");
    }
    Ok(dirs.len())
}

fn rename(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to)
        .with_context(|| format!("rename {} to {}", from.display(), to.display()))
}
