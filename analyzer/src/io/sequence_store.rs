//! Descriptor load/save and on-disk effects of structural edits.
//!
//! The store never caches a sequence: every operation re-reads the descriptor,
//! applies one edit, and rewrites the whole file. Edits are refused while an
//! analysis run is in flight.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use super::artifacts::apply_swaps;
use super::init::AnalyzerPaths;
use super::run_lock::run_in_flight;
use super::templates::PassTemplates;
use crate::core::descriptor::{parse_descriptor, serialize_descriptor};
use crate::core::invariants::validate_invariants;
use crate::core::sequence::{EditOutcome, MoveOutcome, PassSequence, validate_name};
use crate::core::types::{Direction, LineSeparator};
use crate::pass::{FileKind, PassItem, PassKey};

const IN_FLIGHT: &str = "an analysis run is in flight; try again when it finishes";

/// Filesystem-backed pass sequence for one analyzer directory.
#[derive(Debug, Clone)]
pub struct SequenceStore {
    paths: AnalyzerPaths,
}

impl SequenceStore {
    pub fn new(paths: AnalyzerPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AnalyzerPaths {
        &self.paths
    }

    /// Parse the descriptor, marking rule/record passes whose file is absent.
    pub fn load(&self) -> Result<PassSequence> {
        self.load_with_separator().map(|(sequence, _)| sequence)
    }

    fn load_with_separator(&self) -> Result<(PassSequence, LineSeparator)> {
        let path = &self.paths.sequence_path;
        let text = fs::read_to_string(path)
            .with_context(|| format!("read sequence {}", path.display()))?;
        let separator = LineSeparator::detect(&text);
        let mut sequence = parse_descriptor(&text, &self.paths.spec_dir);
        mark_missing(&mut sequence);
        debug!(
            path = %path.display(),
            passes = sequence.len(),
            "sequence loaded"
        );
        Ok((sequence, separator))
    }

    /// Rewrite the descriptor (temp file + rename).
    pub fn save(&self, sequence: &PassSequence, separator: LineSeparator) -> Result<()> {
        let path = &self.paths.sequence_path;
        let contents = serialize_descriptor(sequence, separator);
        let tmp_path = path.with_extension("seq.tmp");
        fs::write(&tmp_path, contents)
            .with_context(|| format!("write temp sequence {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("replace sequence {}", path.display()))?;
        Ok(())
    }

    /// Add an existing `.pat`/`.rec` file after `target`, copying it into the
    /// spec directory when it lives elsewhere.
    #[instrument(skip(self))]
    pub fn insert_file(
        &self,
        target: Option<&PassKey>,
        source: &Path,
        comment: &str,
    ) -> Result<EditOutcome> {
        let Some(kind) = FileKind::from_path(source) else {
            return Ok(EditOutcome::Refused(format!(
                "{} is not a .pat or .rec file",
                source.display()
            )));
        };
        let Some(name) = source.file_stem().and_then(|stem| stem.to_str()) else {
            return Ok(EditOutcome::Refused(format!(
                "{} has no usable file name",
                source.display()
            )));
        };
        if !source.is_file() {
            return Ok(EditOutcome::Refused(format!(
                "{} does not exist",
                source.display()
            )));
        }
        let destination = self.paths.pass_file(kind, name);
        let copy_in = !same_file(source, &destination);
        if copy_in && destination.exists() {
            return Ok(EditOutcome::Refused(format!(
                "{} already exists in the spec directory",
                destination.display()
            )));
        }

        if copy_in {
            fs::copy(source, &destination).with_context(|| {
                format!("copy {} to {}", source.display(), destination.display())
            })?;
            debug!(to = %destination.display(), "pass file copied in");
        }
        let outcome = self.edit(|sequence| {
            if let Some(outcome) = refuse_duplicate(sequence, name, kind) {
                return outcome;
            }
            sequence.insert_file(target, kind, name, &self.paths.spec_dir, comment)
        });
        if copy_in {
            discard_unless_applied(&outcome, &destination);
        }
        outcome
    }

    /// Create a new pass file from the starter template and add it after `target`.
    #[instrument(skip(self))]
    pub fn insert_new_file(
        &self,
        target: Option<&PassKey>,
        kind: FileKind,
        name: &str,
        comment: &str,
    ) -> Result<EditOutcome> {
        if let Err(reason) = validate_name(name) {
            return Ok(EditOutcome::Refused(reason));
        }
        let destination = self.paths.pass_file(kind, name);
        if destination.exists() {
            return Ok(EditOutcome::Refused(format!(
                "{} already exists",
                destination.display()
            )));
        }
        let contents = PassTemplates::new().render_new_pass(kind, name, comment)?;
        fs::create_dir_all(&self.paths.spec_dir).with_context(|| {
            format!("create directory {}", self.paths.spec_dir.display())
        })?;
        fs::write(&destination, contents)
            .with_context(|| format!("write {}", destination.display()))?;
        let outcome = self.edit(|sequence| {
            if let Some(outcome) = refuse_duplicate(sequence, name, kind) {
                return outcome;
            }
            sequence.insert_file(target, kind, name, &self.paths.spec_dir, comment)
        });
        discard_unless_applied(&outcome, &destination);
        outcome
    }

    #[instrument(skip(self))]
    pub fn insert_folder(&self, target: Option<&PassKey>, name: &str) -> Result<EditOutcome> {
        self.edit(|sequence| sequence.insert_folder(target, name))
    }

    /// Remove a pass or a whole folder from the sequence. Pass files stay on disk.
    #[instrument(skip(self))]
    pub fn delete(&self, key: &PassKey) -> Result<EditOutcome> {
        self.edit(|sequence| sequence.delete(key))
    }

    /// Rename a pass; a rule/record file on disk is renamed with it.
    #[instrument(skip(self))]
    pub fn rename(&self, key: &PassKey, new_name: &str) -> Result<EditOutcome> {
        let mut file_move: Option<(PathBuf, PathBuf)> = None;
        let outcome = self.edit(|sequence| {
            let Some(row) = sequence.find(key) else {
                return EditOutcome::NotFound;
            };
            let pass = &sequence.passes()[row];
            if let (Some(kind), Some(old)) = (pass.file_kind(), pass.file_path()) {
                let new = old.with_file_name(kind.file_name(new_name));
                if new != old && new.exists() {
                    return EditOutcome::Refused(format!("{} already exists", new.display()));
                }
                if old.exists() {
                    file_move = Some((old.to_path_buf(), new));
                }
            }
            sequence.rename(key, new_name)
        })?;
        if outcome == EditOutcome::Applied
            && let Some((old, new)) = file_move
        {
            rename_file(&old, &new)?;
        }
        Ok(outcome)
    }

    /// Switch a pass between `pat` and `rec`, renaming its file extension on disk.
    #[instrument(skip(self))]
    pub fn set_file_kind(&self, key: &PassKey, kind: FileKind) -> Result<EditOutcome> {
        let mut file_move: Option<(PathBuf, PathBuf)> = None;
        let outcome = self.edit(|sequence| {
            let Some(row) = sequence.find(key) else {
                return EditOutcome::NotFound;
            };
            let pass = &sequence.passes()[row];
            if let Some(old) = pass.file_path() {
                let new = old.with_file_name(kind.file_name(pass.name()));
                if new != old && new.exists() {
                    return EditOutcome::Refused(format!("{} already exists", new.display()));
                }
                if old.exists() && new != old {
                    file_move = Some((old.to_path_buf(), new));
                }
            }
            sequence.set_file_kind(key, kind)
        })?;
        if outcome == EditOutcome::Applied
            && let Some((old, new)) = file_move
        {
            rename_file(&old, &new)?;
        }
        Ok(outcome)
    }

    #[instrument(skip(self))]
    pub fn set_active(&self, key: &PassKey, active: bool) -> Result<EditOutcome> {
        self.edit(|sequence| sequence.set_active(key, active))
    }

    /// Move a pass one unit, then swap the artifacts of every ordinal pair that
    /// traded places.
    #[instrument(skip(self))]
    pub fn move_pass(&self, key: &PassKey, direction: Direction) -> Result<MoveOutcome> {
        if run_in_flight(&self.paths.lock_path) {
            return Ok(MoveOutcome::Refused(IN_FLIGHT.to_string()));
        }
        let (mut sequence, separator) = self.load_checked()?;
        let outcome = sequence.move_pass(key, direction);
        if let MoveOutcome::Moved { swaps } = &outcome {
            self.save(&sequence, separator)?;
            let dirs = apply_swaps(&self.paths.input_dir, swaps)?;
            info!(%key, direction = direction.as_str(), swaps = swaps.len(), dirs, "pass moved");
        }
        Ok(outcome)
    }

    /// Load, apply `op`, and save when it applied.
    fn edit<F>(&self, op: F) -> Result<EditOutcome>
    where
        F: FnOnce(&mut PassSequence) -> EditOutcome,
    {
        if run_in_flight(&self.paths.lock_path) {
            return Ok(EditOutcome::Refused(IN_FLIGHT.to_string()));
        }
        let (mut sequence, separator) = self.load_checked()?;
        let outcome = op(&mut sequence);
        match &outcome {
            EditOutcome::Applied => {
                mark_missing(&mut sequence);
                self.save(&sequence, separator)?;
                info!("sequence updated");
            }
            EditOutcome::NotFound => debug!("edit target not found"),
            EditOutcome::Refused(reason) => debug!(%reason, "edit refused"),
        }
        Ok(outcome)
    }

    fn load_checked(&self) -> Result<(PassSequence, LineSeparator)> {
        let (sequence, separator) = self.load_with_separator()?;
        let errors = validate_invariants(&sequence);
        if !errors.is_empty() {
            return Err(anyhow!(
                "sequence invariants failed: {}",
                errors.join("; ")
            ));
        }
        Ok((sequence, separator))
    }
}

/// Flip rule/record passes between `File` and `Missing` to match the disk.
fn mark_missing(sequence: &mut PassSequence) {
    for pass in sequence.passes_mut() {
        let item = std::mem::replace(
            &mut pass.item,
            PassItem::Comment {
                text: String::new(),
            },
        );
        pass.item = match item {
            PassItem::File { kind, name, path } | PassItem::Missing { kind, name, path } => {
                if path.is_file() {
                    PassItem::File { kind, name, path }
                } else {
                    PassItem::Missing { kind, name, path }
                }
            }
            other => other,
        };
    }
}

/// Remove a pass file written ahead of an edit that did not go through.
fn discard_unless_applied(outcome: &Result<EditOutcome>, path: &Path) {
    if matches!(outcome, Ok(EditOutcome::Applied)) {
        return;
    }
    if let Err(err) = fs::remove_file(path) {
        warn!(path = %path.display(), %err, "failed to remove pass file");
    }
}

fn refuse_duplicate(sequence: &PassSequence, name: &str, kind: FileKind) -> Option<EditOutcome> {
    let key = PassKey::of_kind(name, kind.pass_kind());
    sequence.find(&key).map(|_| {
        EditOutcome::Refused(format!("{key} is already in the sequence"))
    })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn rename_file(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to)
        .with_context(|| format!("rename {} to {}", from.display(), to.display()))?;
    debug!(from = %from.display(), to = %to.display(), "pass file renamed");
    Ok(())
}
