//! Structural invariants of a pass sequence.

use std::collections::HashSet;

use crate::core::sequence::PassSequence;
use crate::pass::{Pass, PassItem};

/// Check the invariants every persisted sequence must hold:
/// - The first ordinal-bearing pass is the tokenizer stub
/// - Each `folder` has exactly one later `end` with the same name, folders do
///   not nest, and members between them are flagged `in_folder`
/// - Ordinals of active passes are exactly `1..=N` in row order
pub fn validate_invariants(sequence: &PassSequence) -> Vec<String> {
    let mut errors = Vec::new();
    check_tokenizer(sequence.passes(), &mut errors);
    check_folders(sequence.passes(), &mut errors);
    check_ordinals(sequence.passes(), &mut errors);
    errors
}

fn check_tokenizer(passes: &[Pass], errors: &mut Vec<String>) {
    match passes.iter().find(|pass| pass.takes_ordinal()) {
        None => errors.push("sequence has no active passes".to_string()),
        Some(first) if !first.is_tokenizer() => errors.push(format!(
            "first active pass must be the tokenizer, found {} '{}'",
            first.kind(),
            first.name()
        )),
        Some(_) => {}
    }
}

fn check_folders(passes: &[Pass], errors: &mut Vec<String>) {
    let mut open: Option<&str> = None;
    let mut seen = HashSet::new();
    for (row, pass) in passes.iter().enumerate() {
        match &pass.item {
            PassItem::FolderBegin { name } => {
                if let Some(outer) = open {
                    errors.push(format!(
                        "row {row}: folder '{name}' opened inside folder '{outer}'"
                    ));
                }
                if !seen.insert(name.as_str()) {
                    errors.push(format!("row {row}: duplicate folder '{name}'"));
                }
                open = Some(name.as_str());
            }
            PassItem::FolderEnd { name } => {
                if open == Some(name.as_str()) {
                    open = None;
                } else {
                    errors.push(format!(
                        "row {row}: folder end '{name}' has no matching folder"
                    ));
                }
            }
            _ => {
                if pass.in_folder != open.is_some() {
                    errors.push(format!(
                        "row {row}: '{}' has in_folder={} but is {} a folder",
                        pass.name(),
                        pass.in_folder,
                        if open.is_some() { "inside" } else { "outside" }
                    ));
                }
            }
        }
    }
    if let Some(name) = open {
        errors.push(format!("folder '{name}' is never closed"));
    }
}

fn check_ordinals(passes: &[Pass], errors: &mut Vec<String>) {
    let mut expected = 1;
    for (row, pass) in passes.iter().enumerate() {
        if pass.takes_ordinal() {
            if pass.ordinal != Some(expected) {
                errors.push(format!(
                    "row {row}: '{}' has ordinal {:?}, expected {expected}",
                    pass.name(),
                    pass.ordinal
                ));
            }
            expected += 1;
        } else if let Some(ordinal) = pass.ordinal {
            errors.push(format!(
                "row {row}: '{}' takes no ordinal but carries {ordinal}",
                pass.name()
            ));
        }
    }
}
