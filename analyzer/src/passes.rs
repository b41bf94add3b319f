//! Pass listing and edit reporting for `analyzer passes`.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::core::sequence::{EditOutcome, MoveOutcome, PassSequence};
use crate::exit_codes;
use crate::io::init::AnalyzerPaths;
use crate::io::sequence_store::SequenceStore;
use crate::pass::{Pass, PassKind};

/// One row of `analyzer passes list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassRow {
    pub ordinal: Option<usize>,
    pub kind: PassKind,
    pub keyword: String,
    pub name: String,
    pub active: bool,
    pub in_folder: bool,
    pub missing: bool,
    pub comment: String,
}

impl PassRow {
    fn from_pass(pass: &Pass) -> Self {
        Self {
            ordinal: pass.ordinal,
            kind: pass.kind(),
            keyword: pass.keyword().to_string(),
            name: pass.name().to_string(),
            active: pass.active,
            in_folder: pass.in_folder,
            missing: pass.is_missing(),
            comment: pass.comment.clone(),
        }
    }

    /// Fixed-width listing line; folder members are indented under their folder.
    pub fn render(&self) -> String {
        let ordinal = self
            .ordinal
            .map(|ordinal| format!("{ordinal:>3}"))
            .unwrap_or_else(|| "  -".to_string());
        let indent = if self.in_folder { "  " } else { "" };
        let mut flags = String::new();
        if !self.active {
            flags.push_str(" (disabled)");
        }
        if self.missing {
            flags.push_str(" (missing)");
        }
        format!(
            "{ordinal}  {indent}{:<8} {}{flags}",
            self.keyword, self.name
        )
    }
}

pub fn open_store(root: &Path) -> SequenceStore {
    SequenceStore::new(AnalyzerPaths::new(root))
}

/// Every non-comment row of the sequence.
pub fn list_passes(sequence: &PassSequence) -> Vec<PassRow> {
    sequence
        .passes()
        .iter()
        .filter(|pass| pass.kind() != PassKind::Comment)
        .map(PassRow::from_pass)
        .collect()
}

/// Message and exit code for a structural edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditReport {
    pub message: String,
    pub exit_code: i32,
}

impl EditReport {
    pub fn from_edit(outcome: &EditOutcome, what: &str) -> Self {
        match outcome {
            EditOutcome::Applied => Self {
                message: what.to_string(),
                exit_code: exit_codes::OK,
            },
            EditOutcome::NotFound => Self::not_found(),
            EditOutcome::Refused(reason) => Self::refused(reason),
        }
    }

    pub fn from_move(outcome: &MoveOutcome, what: &str) -> Self {
        match outcome {
            MoveOutcome::Moved { swaps } => {
                let pairs: Vec<String> = swaps.iter().map(|(a, b)| format!("{a}<->{b}")).collect();
                let message = if pairs.is_empty() {
                    what.to_string()
                } else {
                    format!("{what} (ordinals swapped: {})", pairs.join(", "))
                };
                Self {
                    message,
                    exit_code: exit_codes::OK,
                }
            }
            MoveOutcome::NotFound => Self::not_found(),
            MoveOutcome::Refused(reason) => Self::refused(reason),
        }
    }

    fn not_found() -> Self {
        Self {
            message: "no matching pass".to_string(),
            exit_code: exit_codes::NOT_FOUND,
        }
    }

    fn refused(reason: &str) -> Self {
        Self {
            message: format!("refused: {reason}"),
            exit_code: exit_codes::REFUSED,
        }
    }
}

/// Load the sequence and list it.
pub fn list_from_root(root: &Path) -> Result<Vec<PassRow>> {
    let sequence = open_store(root).load()?;
    Ok(list_passes(&sequence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sequence_from;

    #[test]
    fn lists_rows_without_comments() {
        let seq = sequence_from(
            "# header\ntokenize\tnil\t\nfolder\tf\t\npat\ta\t# a\nend\tf\t\n/rec\tb\t\n",
        );
        let rows = list_passes(&seq);
        let rendered: Vec<String> = rows.iter().map(PassRow::render).collect();
        assert_eq!(
            rendered,
            vec![
                "  1  tokenize nil",
                "  -  folder   f",
                "  2    pat      a",
                "  -  end      f",
                "  -  rec      b (disabled)",
            ]
        );
        assert_eq!(rows[2].comment, "# a");
    }

    #[test]
    fn reports_map_to_exit_codes() {
        let applied = EditReport::from_edit(&EditOutcome::Applied, "deleted a");
        assert_eq!(applied.exit_code, exit_codes::OK);
        let refused = EditReport::from_edit(&EditOutcome::Refused("no".to_string()), "x");
        assert_eq!(refused.exit_code, exit_codes::REFUSED);
        assert_eq!(refused.message, "refused: no");
        let moved = EditReport::from_move(
            &MoveOutcome::Moved {
                swaps: vec![(2, 3), (3, 4)],
            },
            "moved f up",
        );
        assert_eq!(moved.message, "moved f up (ordinals swapped: 2<->3, 3<->4)");
        assert_eq!(
            EditReport::from_move(&MoveOutcome::NotFound, "x").exit_code,
            exit_codes::NOT_FOUND
        );
    }
}
