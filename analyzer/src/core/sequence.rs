//! In-memory pass sequence and its structural edits.
//!
//! The sequence is a derived view of the descriptor file. Every edit leaves it
//! renumbered: active passes carry ordinals `1..=N`, folder members are flagged,
//! and the tokenizer stays the first ordinal-bearing pass.

use std::ops::Range;
use std::path::Path;

use serde::Serialize;

use crate::core::types::Direction;
use crate::pass::{FileKind, Pass, PassItem, PassKey, PassKind};

/// Result of a structural edit on the sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    /// No pass matched the key; the sequence is untouched.
    NotFound,
    /// The edit would break an invariant; the sequence is untouched.
    Refused(String),
}

/// Result of [`PassSequence::move_pass`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Applied. `swaps` lists, in order, every pair of ordinals whose passes
    /// traded places; ordinal-keyed artifacts must trade places the same way.
    Moved { swaps: Vec<(usize, usize)> },
    NotFound,
    Refused(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSequence {
    passes: Vec<Pass>,
}

impl PassSequence {
    pub fn new(passes: Vec<Pass>) -> Self {
        let mut sequence = Self { passes };
        sequence.renumber();
        sequence
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    pub fn passes_mut(&mut self) -> &mut [Pass] {
        &mut self.passes
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Recompute ordinals and folder membership from row order.
    pub fn renumber(&mut self) {
        let mut next_ordinal = 1;
        let mut current_folder: Option<String> = None;
        for pass in &mut self.passes {
            match &pass.item {
                PassItem::FolderBegin { name } => {
                    pass.in_folder = false;
                    current_folder = Some(name.clone());
                }
                PassItem::FolderEnd { name } => {
                    pass.in_folder = false;
                    if current_folder.as_deref() == Some(name.as_str()) {
                        current_folder = None;
                    }
                }
                _ => pass.in_folder = current_folder.is_some(),
            }
            if pass.takes_ordinal() {
                pass.ordinal = Some(next_ordinal);
                next_ordinal += 1;
            } else {
                pass.ordinal = None;
            }
        }
    }

    /// Row of the first pass matching `key`.
    pub fn find(&self, key: &PassKey) -> Option<usize> {
        self.passes.iter().position(|pass| pass.matches(key))
    }

    pub fn pass_for_ordinal(&self, ordinal: usize) -> Option<&Pass> {
        self.passes.iter().find(|pass| pass.ordinal == Some(ordinal))
    }

    /// Source file of the pass holding `ordinal`, if it is a rule or record pass.
    pub fn file_for_ordinal(&self, ordinal: usize) -> Option<&Path> {
        self.pass_for_ordinal(ordinal).and_then(Pass::file_path)
    }

    /// Row of the pinned tokenizer: the first ordinal-bearing pass, if it is a tokenizer stub.
    pub fn tokenizer_row(&self) -> Option<usize> {
        self.passes
            .iter()
            .position(Pass::takes_ordinal)
            .filter(|&row| self.passes[row].is_tokenizer())
    }

    /// Rows of folder `name`, with or without its boundary markers.
    pub fn folder_rows(&self, name: &str, include_boundaries: bool) -> Option<Range<usize>> {
        let begin = self.passes.iter().position(
            |pass| matches!(&pass.item, PassItem::FolderBegin { name: n } if n == name),
        )?;
        let end = self.passes[begin + 1..]
            .iter()
            .position(|pass| matches!(&pass.item, PassItem::FolderEnd { name: n } if n == name))
            .map(|offset| begin + 1 + offset)?;
        if include_boundaries {
            Some(begin..end + 1)
        } else {
            Some(begin + 1..end)
        }
    }

    /// Member passes of folder `name` (boundaries excluded).
    pub fn folder_members(&self, name: &str) -> &[Pass] {
        match self.folder_rows(name, false) {
            Some(rows) => &self.passes[rows],
            None => &[],
        }
    }

    /// Splice a rule/record pass right after `target` (or at the tail).
    pub fn insert_file(
        &mut self,
        target: Option<&PassKey>,
        kind: FileKind,
        name: &str,
        spec_dir: &Path,
        comment: &str,
    ) -> EditOutcome {
        if let Err(reason) = validate_name(name) {
            return EditOutcome::Refused(reason);
        }
        let row = match self.insertion_row(target) {
            Ok(row) => row,
            Err(outcome) => return outcome,
        };
        self.passes
            .insert(row, Pass::file(kind, name, spec_dir, comment));
        self.renumber();
        EditOutcome::Applied
    }

    /// Splice an empty `folder`/`end` pair right after `target` (or at the tail).
    pub fn insert_folder(&mut self, target: Option<&PassKey>, name: &str) -> EditOutcome {
        if let Err(reason) = validate_name(name) {
            return EditOutcome::Refused(reason);
        }
        if self.folder_rows(name, true).is_some() {
            return EditOutcome::Refused(format!("folder '{name}' already exists"));
        }
        let row = match self.insertion_row(target) {
            Ok(row) => row,
            Err(outcome) => return outcome,
        };
        if row > 0 && opens_into_folder(&self.passes[row - 1]) {
            return EditOutcome::Refused(format!(
                "folder '{name}' cannot be nested inside another folder"
            ));
        }
        let (begin, end) = folder_pair(name);
        self.passes.splice(row..row, [begin, end]);
        self.renumber();
        EditOutcome::Applied
    }

    /// Append an empty `folder`/`end` pair at the tail.
    pub fn push_folder(&mut self, name: &str) -> EditOutcome {
        self.insert_folder(None, name)
    }

    /// Remove one pass, or a whole folder block when `key` names a folder marker.
    pub fn delete(&mut self, key: &PassKey) -> EditOutcome {
        let Some(row) = self.find(key) else {
            return EditOutcome::NotFound;
        };
        if Some(row) == self.tokenizer_row() {
            return EditOutcome::Refused("the tokenizer pass cannot be deleted".to_string());
        }
        let rows = self.unit_rows(row);
        self.passes.drain(rows);
        self.renumber();
        EditOutcome::Applied
    }

    /// Rename a pass; folders rename both boundary markers.
    pub fn rename(&mut self, key: &PassKey, new_name: &str) -> EditOutcome {
        let Some(row) = self.find(key) else {
            return EditOutcome::NotFound;
        };
        if let Err(reason) = validate_name(new_name) {
            return EditOutcome::Refused(reason);
        }
        let folder = match &self.passes[row].item {
            PassItem::Comment { .. } => {
                return EditOutcome::Refused("comment lines have no name".to_string());
            }
            PassItem::FolderBegin { name } | PassItem::FolderEnd { name } => Some(name.clone()),
            _ => None,
        };

        match folder {
            Some(old) => {
                if self.folder_rows(new_name, true).is_some() {
                    return EditOutcome::Refused(format!("folder '{new_name}' already exists"));
                }
                if self.passes.iter().any(|pass| pass.name() == new_name) {
                    return EditOutcome::Refused(format!("'{new_name}' is already in the sequence"));
                }
                for pass in &mut self.passes {
                    if let PassItem::FolderBegin { name } | PassItem::FolderEnd { name } =
                        &mut pass.item
                        && *name == old
                    {
                        *name = new_name.to_string();
                    }
                }
            }
            None => {
                let pass = &self.passes[row];
                if self.name_taken(new_name, pass.kind(), row) {
                    return EditOutcome::Refused(format!(
                        "{} '{new_name}' is already in the sequence",
                        pass.keyword()
                    ));
                }
                match &mut self.passes[row].item {
                    PassItem::File { kind, name, path } | PassItem::Missing { kind, name, path } => {
                        *name = new_name.to_string();
                        path.set_file_name(kind.file_name(new_name));
                    }
                    PassItem::Stub { name, .. } => *name = new_name.to_string(),
                    _ => {}
                }
            }
        }
        self.renumber();
        EditOutcome::Applied
    }

    /// Switch a rule/record pass between `pat` and `rec`.
    pub fn set_file_kind(&mut self, key: &PassKey, new_kind: FileKind) -> EditOutcome {
        let Some(row) = self.find(key) else {
            return EditOutcome::NotFound;
        };
        if self.passes[row].file_kind().is_some()
            && self.name_taken(self.passes[row].name(), new_kind.pass_kind(), row)
        {
            return EditOutcome::Refused(format!(
                "{} '{}' is already in the sequence",
                new_kind.keyword(),
                self.passes[row].name()
            ));
        }
        match &mut self.passes[row].item {
            PassItem::File { kind, name, path } | PassItem::Missing { kind, name, path } => {
                *kind = new_kind;
                path.set_file_name(new_kind.file_name(name));
            }
            _ => {
                return EditOutcome::Refused(format!(
                    "{key} is not a rule or record pass"
                ));
            }
        }
        self.renumber();
        EditOutcome::Applied
    }

    /// Enable or disable a pass.
    pub fn set_active(&mut self, key: &PassKey, active: bool) -> EditOutcome {
        let Some(row) = self.find(key) else {
            return EditOutcome::NotFound;
        };
        if Some(row) == self.tokenizer_row() && !active {
            return EditOutcome::Refused("the tokenizer pass cannot be disabled".to_string());
        }
        let pass = &self.passes[row];
        if pass.is_folder_marker() || pass.kind() == PassKind::Comment {
            return EditOutcome::Refused(format!("{key} cannot be enabled or disabled"));
        }
        if !active && self.passes.iter().position(Pass::takes_ordinal) == Some(row) {
            return EditOutcome::Refused(format!(
                "disabling {key} would leave a non-tokenizer pass first"
            ));
        }
        self.passes[row].active = active;
        self.renumber();
        if active && self.tokenizer_row().is_none() {
            self.passes[row].active = false;
            self.renumber();
            return EditOutcome::Refused(format!(
                "enabling {key} would place it before the tokenizer"
            ));
        }
        EditOutcome::Applied
    }

    /// Move a pass (or a whole folder) one unit up or down.
    ///
    /// Units are single passes or complete folder blocks. A top-level pass next to
    /// a folder jumps the whole folder; two adjacent folders trade places as
    /// blocks; a folder member stays inside its folder.
    pub fn move_pass(&mut self, key: &PassKey, direction: Direction) -> MoveOutcome {
        let Some(row) = self.find(key) else {
            return MoveOutcome::NotFound;
        };
        let tokenizer = self.tokenizer_row();
        if Some(row) == tokenizer {
            return MoveOutcome::Refused("the tokenizer pass cannot be moved".to_string());
        }

        let unit = self.unit_rows(row);
        let is_folder = self.passes[row].is_folder_marker();
        let neighbor = match direction {
            Direction::Up => {
                if unit.start == 0 {
                    return MoveOutcome::Refused(format!("{key} is already at the top"));
                }
                unit.start - 1
            }
            Direction::Down => {
                if unit.end >= self.passes.len() {
                    let reason = if is_folder {
                        format!("folder {key} is already the bottommost group")
                    } else {
                        format!("{key} is already at the bottom")
                    };
                    return MoveOutcome::Refused(reason);
                }
                unit.end
            }
        };
        if tokenizer.is_some_and(|t| neighbor <= t && direction == Direction::Up)
            || Some(neighbor) == tokenizer
        {
            return MoveOutcome::Refused(format!(
                "{key} cannot move above the tokenizer pass"
            ));
        }

        let member = !is_folder && self.passes[row].in_folder;
        let neighbor_unit = if member {
            if self.passes[neighbor].is_folder_marker() {
                return MoveOutcome::Refused(format!(
                    "{key} is already at the {} of its folder",
                    if direction == Direction::Up { "top" } else { "bottom" }
                ));
            }
            neighbor..neighbor + 1
        } else {
            self.unit_rows(neighbor)
        };

        let (upper, lower) = match direction {
            Direction::Up => (neighbor_unit, unit),
            Direction::Down => (unit, neighbor_unit),
        };
        let swaps = self.exchange(upper, lower);
        MoveOutcome::Moved { swaps }
    }

    /// Rows of the movable/deletable unit containing `row`.
    fn unit_rows(&self, row: usize) -> Range<usize> {
        match &self.passes[row].item {
            PassItem::FolderBegin { name } | PassItem::FolderEnd { name } => {
                self.folder_rows(name, true).unwrap_or(row..row + 1)
            }
            _ => row..row + 1,
        }
    }

    /// Swap two adjacent blocks (`upper.end == lower.start`) by bubbling each
    /// row of `lower` across `upper`.
    fn exchange(&mut self, upper: Range<usize>, lower: Range<usize>) -> Vec<(usize, usize)> {
        let mut swaps = Vec::new();
        for (offset, start) in lower.enumerate() {
            let target = upper.start + offset;
            let mut row = start;
            while row > target {
                if let Some(swap) = self.swap_adjacent(row - 1) {
                    swaps.push(swap);
                }
                row -= 1;
            }
        }
        self.renumber();
        swaps
    }

    /// Swap rows `row` and `row + 1`, keeping ordinals attached to positions.
    fn swap_adjacent(&mut self, row: usize) -> Option<(usize, usize)> {
        self.passes.swap(row, row + 1);
        let (head, tail) = self.passes.split_at_mut(row + 1);
        let upper = &mut head[row];
        let lower = &mut tail[0];
        match (upper.ordinal, lower.ordinal) {
            (Some(a), Some(b)) => {
                upper.ordinal = Some(b);
                lower.ordinal = Some(a);
                Some((a.min(b), a.max(b)))
            }
            _ => None,
        }
    }

    /// True when a row other than `except` has this name and kind.
    fn name_taken(&self, name: &str, kind: PassKind, except: usize) -> bool {
        self.passes
            .iter()
            .enumerate()
            .any(|(row, pass)| row != except && pass.kind() == kind && pass.name() == name)
    }

    /// Row where a pass inserted after `target` lands.
    fn insertion_row(&self, target: Option<&PassKey>) -> Result<usize, EditOutcome> {
        let row = match target {
            Some(key) => self.find(key).ok_or(EditOutcome::NotFound)? + 1,
            None => self.passes.len(),
        };
        if let Some(tokenizer) = self.tokenizer_row()
            && row <= tokenizer
        {
            return Err(EditOutcome::Refused(
                "passes cannot be inserted before the tokenizer".to_string(),
            ));
        }
        Ok(row)
    }
}

fn folder_pair(name: &str) -> (Pass, Pass) {
    (
        Pass::new(
            PassItem::FolderBegin {
                name: name.to_string(),
            },
            "",
        ),
        Pass::new(
            PassItem::FolderEnd {
                name: name.to_string(),
            },
            "",
        ),
    )
}

/// True if a row inserted right after `pass` would sit inside a folder.
fn opens_into_folder(pass: &Pass) -> bool {
    matches!(pass.item, PassItem::FolderBegin { .. }) || pass.in_folder
}

/// Names end up as descriptor fields and file stems.
/// Reject names the descriptor cannot round-trip.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name must not be empty".to_string());
    }
    if name.chars().any(char::is_whitespace) {
        return Err(format!("name '{name}' must not contain whitespace"));
    }
    if name.contains(['/', '\\']) || name.starts_with('#') {
        return Err(format!("name '{name}' contains a reserved character"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::invariants::validate_invariants;
    use crate::test_support::{names, ordinals, sequence_from};

    const FLAT: &str = "tokenize\tnil\t\npat\ta\t\npat\tb\t\npat\tc\t\n";
    const FOLDERS: &str = "tokenize\tnil\t\npat\ta\t\nfolder\tf\t\npat\tf1\t\npat\tf2\t\npat\tf3\t\nend\tf\t\nfolder\tg\t\npat\tg1\t\nend\tg\t\npat\tz\t\n";

    fn assert_valid(seq: &PassSequence) {
        let errors = validate_invariants(seq);
        assert!(errors.is_empty(), "invariants: {errors:?}");
    }

    #[test]
    fn move_up_swaps_neighbours_and_reports_ordinals() {
        let mut seq = sequence_from(FLAT);
        let outcome = seq.move_pass(&PassKey::named("c"), Direction::Up);
        assert_eq!(outcome, MoveOutcome::Moved { swaps: vec![(3, 4)] });
        assert_eq!(names(&seq), vec!["nil", "a", "c", "b"]);
        assert_eq!(ordinals(&seq), vec![Some(1), Some(2), Some(3), Some(4)]);
        assert_valid(&seq);
    }

    #[test]
    fn move_up_then_down_restores_order() {
        let mut seq = sequence_from(FOLDERS);
        let before = seq.clone();
        for name in ["f2", "g", "z", "f"] {
            let key = PassKey::named(name);
            let up = seq.move_pass(&key, Direction::Up);
            assert!(matches!(up, MoveOutcome::Moved { .. }), "{name}: {up:?}");
            let down = seq.move_pass(&key, Direction::Down);
            assert!(matches!(down, MoveOutcome::Moved { .. }), "{name}: {down:?}");
            assert_eq!(seq, before, "{name}");
        }
    }

    #[test]
    fn tokenizer_is_pinned() {
        let mut seq = sequence_from(FLAT);
        assert!(matches!(
            seq.move_pass(&PassKey::named("nil"), Direction::Down),
            MoveOutcome::Refused(_)
        ));
        assert!(matches!(
            seq.move_pass(&PassKey::named("a"), Direction::Up),
            MoveOutcome::Refused(_)
        ));
        assert!(matches!(
            seq.delete(&PassKey::named("nil")),
            EditOutcome::Refused(_)
        ));
        assert_eq!(names(&seq), vec!["nil", "a", "b", "c"]);
    }

    #[test]
    fn last_pass_cannot_move_down() {
        let mut seq = sequence_from(FLAT);
        let outcome = seq.move_pass(&PassKey::named("c"), Direction::Down);
        assert!(matches!(outcome, MoveOutcome::Refused(reason) if reason.contains("bottom")));
    }

    #[test]
    fn bottom_folder_cannot_move_down() {
        let mut seq = sequence_from("tokenize\tnil\t\npat\ta\t\nfolder\tf\t\npat\tf1\t\nend\tf\t\n");
        let outcome = seq.move_pass(&PassKey::named("f"), Direction::Down);
        assert!(
            matches!(outcome, MoveOutcome::Refused(reason) if reason.contains("bottommost group"))
        );
    }

    #[test]
    fn folder_member_swaps_inside_folder() {
        let mut seq = sequence_from(FOLDERS);
        let outcome = seq.move_pass(&PassKey::named("f2"), Direction::Up);
        assert_eq!(outcome, MoveOutcome::Moved { swaps: vec![(3, 4)] });
        assert_eq!(
            names(&seq),
            vec!["nil", "a", "f", "f2", "f1", "f3", "f", "g", "g1", "g", "z"]
        );
        assert_valid(&seq);
    }

    #[test]
    fn folder_member_stays_in_folder() {
        let mut seq = sequence_from(FOLDERS);
        let outcome = seq.move_pass(&PassKey::named("f1"), Direction::Up);
        assert!(matches!(outcome, MoveOutcome::Refused(reason) if reason.contains("top of its folder")));
        let outcome = seq.move_pass(&PassKey::named("f3"), Direction::Down);
        assert!(
            matches!(outcome, MoveOutcome::Refused(reason) if reason.contains("bottom of its folder"))
        );
    }

    #[test]
    fn adjacent_folders_trade_places_as_blocks() {
        let mut seq = sequence_from(FOLDERS);
        let outcome = seq.move_pass(&PassKey::named("g"), Direction::Up);
        let MoveOutcome::Moved { swaps } = outcome else {
            panic!("expected move, got {outcome:?}");
        };
        assert_eq!(swaps.len(), 3);
        assert_eq!(
            names(&seq),
            vec!["nil", "a", "g", "g1", "g", "f", "f1", "f2", "f3", "f", "z"]
        );
        let g1 = seq.find(&PassKey::named("g1")).expect("g1");
        assert_eq!(seq.passes()[g1].ordinal, Some(3));
        assert!(seq.passes()[g1].in_folder);
        assert_valid(&seq);
    }

    #[test]
    fn single_pass_jumps_whole_folder() {
        let mut seq = sequence_from(FOLDERS);
        let outcome = seq.move_pass(&PassKey::named("z"), Direction::Up);
        assert_eq!(outcome, MoveOutcome::Moved { swaps: vec![(6, 7)] });
        assert_eq!(
            names(&seq),
            vec!["nil", "a", "f", "f1", "f2", "f3", "f", "z", "g", "g1", "g"]
        );
        assert!(!seq.passes()[7].in_folder);
        assert_valid(&seq);
    }

    #[test]
    fn folder_moves_past_single_pass() {
        let mut seq = sequence_from(FOLDERS);
        let outcome = seq.move_pass(&PassKey::named("f"), Direction::Up);
        let MoveOutcome::Moved { swaps } = outcome else {
            panic!("expected move, got {outcome:?}");
        };
        assert_eq!(swaps, vec![(2, 3), (3, 4), (4, 5)]);
        assert_eq!(
            names(&seq),
            vec!["nil", "f", "f1", "f2", "f3", "f", "a", "g", "g1", "g", "z"]
        );
        assert_valid(&seq);
    }

    #[test]
    fn delete_folder_removes_whole_block() {
        let mut seq = sequence_from(FOLDERS);
        assert_eq!(seq.delete(&PassKey::named("f")), EditOutcome::Applied);
        assert_eq!(names(&seq), vec!["nil", "a", "g", "g1", "g", "z"]);
        assert_eq!(
            seq.delete(&PassKey::of_kind("g", PassKind::FolderEnd)),
            EditOutcome::Applied
        );
        assert_eq!(names(&seq), vec!["nil", "a", "z"]);
        assert_eq!(ordinals(&seq), vec![Some(1), Some(2), Some(3)]);
        assert_valid(&seq);
    }

    #[test]
    fn unknown_key_is_a_no_op() {
        let mut seq = sequence_from(FLAT);
        let before = seq.clone();
        assert_eq!(seq.delete(&PassKey::named("nope")), EditOutcome::NotFound);
        assert_eq!(
            seq.rename(&PassKey::of_kind("a", PassKind::RecordFile), "x"),
            EditOutcome::NotFound
        );
        assert_eq!(
            seq.move_pass(&PassKey::named("nope"), Direction::Up),
            MoveOutcome::NotFound
        );
        assert_eq!(seq, before);
    }

    #[test]
    fn insert_lands_after_target_and_renumbers() {
        let mut seq = sequence_from(FLAT);
        let outcome = seq.insert_file(
            Some(&PassKey::named("a")),
            FileKind::Rec,
            "new",
            Path::new("spec"),
            "# added",
        );
        assert_eq!(outcome, EditOutcome::Applied);
        assert_eq!(names(&seq), vec!["nil", "a", "new", "b", "c"]);
        assert_eq!(seq.passes()[2].ordinal, Some(3));
        assert_eq!(
            seq.file_for_ordinal(3),
            Some(Path::new("spec").join("new.rec").as_path())
        );
        assert_valid(&seq);
    }

    #[test]
    fn insert_into_folder_flags_member() {
        let mut seq = sequence_from(FOLDERS);
        seq.insert_file(
            Some(&PassKey::named("f")),
            FileKind::Pat,
            "f0",
            Path::new("spec"),
            "",
        );
        let row = seq.find(&PassKey::named("f0")).expect("f0");
        assert!(seq.passes()[row].in_folder);
        assert_eq!(seq.folder_members("f").len(), 4);
    }

    #[test]
    fn folders_do_not_nest() {
        let mut seq = sequence_from(FOLDERS);
        let outcome = seq.insert_folder(Some(&PassKey::named("f1")), "inner");
        assert!(matches!(outcome, EditOutcome::Refused(_)));
        assert_eq!(
            seq.insert_folder(Some(&PassKey::of_kind("f", PassKind::FolderEnd)), "h"),
            EditOutcome::Applied
        );
        assert_eq!(seq.push_folder("tail"), EditOutcome::Applied);
        assert_eq!(seq.folder_rows("tail", true), Some(13..15));
        assert_valid(&seq);
    }

    #[test]
    fn rename_folder_renames_both_markers() {
        let mut seq = sequence_from(FOLDERS);
        assert_eq!(seq.rename(&PassKey::named("f"), "months"), EditOutcome::Applied);
        assert_eq!(seq.folder_rows("months", true), Some(2..7));
        assert_eq!(seq.folder_rows("f", true), None);
    }

    #[test]
    fn rename_file_updates_path() {
        let mut seq = sequence_from(FLAT);
        seq.rename(&PassKey::named("b"), "bee");
        let row = seq.find(&PassKey::named("bee")).expect("bee");
        assert_eq!(
            seq.passes()[row].file_path(),
            Some(Path::new("spec").join("bee.pat").as_path())
        );
        assert!(matches!(
            seq.rename(&PassKey::named("bee"), "two words"),
            EditOutcome::Refused(_)
        ));
    }

    #[test]
    fn set_file_kind_switches_extension() {
        let mut seq = sequence_from(FLAT);
        assert_eq!(
            seq.set_file_kind(&PassKey::named("a"), FileKind::Rec),
            EditOutcome::Applied
        );
        assert_eq!(seq.passes()[1].kind(), PassKind::RecordFile);
        assert!(matches!(
            seq.set_file_kind(&PassKey::named("nil"), FileKind::Rec),
            EditOutcome::Refused(_)
        ));
    }

    #[test]
    fn rename_refuses_taken_name() {
        let mut seq = sequence_from(FLAT);
        assert!(matches!(
            seq.rename(&PassKey::named("a"), "b"),
            EditOutcome::Refused(_)
        ));
        assert_eq!(names(&seq), vec!["nil", "a", "b", "c"]);

        let mut seq = sequence_from(FOLDERS);
        assert!(matches!(
            seq.rename(&PassKey::named("f"), "g"),
            EditOutcome::Refused(_)
        ));
        assert!(matches!(
            seq.rename(&PassKey::named("f"), "z"),
            EditOutcome::Refused(_)
        ));
        assert_eq!(seq.folder_rows("f", true), Some(2..7));
    }

    #[test]
    fn rename_allows_name_held_by_other_kind() {
        let mut seq = sequence_from("tokenize\tnil\t\npat\ta\t\nrec\tb\t\n");
        assert_eq!(seq.rename(&PassKey::named("a"), "b"), EditOutcome::Applied);
        assert_eq!(names(&seq), vec!["nil", "b", "b"]);
        assert_eq!(seq.rename(&PassKey::named("b"), "b"), EditOutcome::Applied);
    }

    #[test]
    fn set_file_kind_refuses_duplicate() {
        let mut seq = sequence_from("tokenize\tnil\t\npat\tx\t\nrec\tx\t\n");
        assert!(matches!(
            seq.set_file_kind(&PassKey::of_kind("x", PassKind::RuleFile), FileKind::Rec),
            EditOutcome::Refused(_)
        ));
        assert_eq!(seq.passes()[1].kind(), PassKind::RuleFile);
    }

    #[test]
    fn disabling_drops_ordinal_and_keeps_density() {
        let mut seq = sequence_from(FLAT);
        assert_eq!(
            seq.set_active(&PassKey::named("b"), false),
            EditOutcome::Applied
        );
        assert_eq!(ordinals(&seq), vec![Some(1), Some(2), None, Some(3)]);
        assert!(matches!(
            seq.set_active(&PassKey::named("nil"), false),
            EditOutcome::Refused(_)
        ));
        assert_eq!(
            seq.set_active(&PassKey::named("b"), true),
            EditOutcome::Applied
        );
        assert_eq!(ordinals(&seq), vec![Some(1), Some(2), Some(3), Some(4)]);
    }

    #[test]
    fn ordinals_stay_dense_through_mixed_edits() {
        let mut seq = sequence_from(FOLDERS);
        seq.move_pass(&PassKey::named("z"), Direction::Up);
        seq.insert_file(
            Some(&PassKey::named("g1")),
            FileKind::Pat,
            "g2",
            Path::new("spec"),
            "",
        );
        seq.delete(&PassKey::named("f2"));
        seq.move_pass(&PassKey::named("g"), Direction::Up);
        seq.delete(&PassKey::named("a"));
        let active: Vec<usize> = seq.passes().iter().filter_map(|p| p.ordinal).collect();
        assert_eq!(active, (1..=active.len()).collect::<Vec<_>>());
        assert_eq!(seq.passes()[0].name(), "nil");
        assert_valid(&seq);
    }
}
