//! Validation of an analyzer directory for `analyzer validate`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Serialize;

use crate::core::invariants::validate_invariants;
use crate::io::config::load_config;
use crate::io::init::AnalyzerPaths;
use crate::io::run_lock::run_in_flight;
use crate::io::sequence_store::SequenceStore;

/// Pass referenced by the descriptor whose file is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingPass {
    pub ordinal: Option<usize>,
    pub name: String,
    pub path: PathBuf,
}

/// High-level validation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidateOutcome {
    pub active_passes: usize,
    pub violations: Vec<String>,
    pub missing: Vec<MissingPass>,
    pub run_in_flight: bool,
}

impl ValidateOutcome {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty() && self.missing.is_empty()
    }
}

/// Validate layout, config, descriptor invariants, and pass files.
///
/// Layout and config problems are errors; sequence problems are reported in
/// the outcome so they can all be listed at once.
pub fn validate_analyzer(root: &Path) -> Result<ValidateOutcome> {
    let paths = AnalyzerPaths::new(root);

    ensure_dir(&paths.spec_dir)?;
    ensure_file(&paths.sequence_path)?;
    load_config(&paths.config_path).with_context(|| "load analyzer.toml")?;

    let sequence = SequenceStore::new(paths.clone())
        .load()
        .with_context(|| "load analyzer.seq")?;
    let violations = validate_invariants(&sequence);
    let missing = sequence
        .passes()
        .iter()
        .filter(|pass| pass.is_missing())
        .filter_map(|pass| {
            pass.file_path().map(|path| MissingPass {
                ordinal: pass.ordinal,
                name: pass.name().to_string(),
                path: path.to_path_buf(),
            })
        })
        .collect();
    let active_passes = sequence
        .passes()
        .iter()
        .filter(|pass| pass.ordinal.is_some())
        .count();

    Ok(ValidateOutcome {
        active_passes,
        violations,
        missing,
        run_in_flight: run_in_flight(&paths.lock_path),
    })
}

fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(anyhow!("missing directory {}", path.display()));
    }
    if !path.is_dir() {
        return Err(anyhow!("expected directory {}", path.display()));
    }
    Ok(())
}

fn ensure_file(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(anyhow!("missing file {}", path.display()));
    }
    if !path.is_file() {
        return Err(anyhow!("expected file {}", path.display()));
    }
    Ok(())
}
