//! Library-level lifecycle tests: sequence edits and decoding over one
//! analyzer directory.
//!
//! These drive the store and decoder together to verify that artifacts follow
//! their passes across moves and that generated rules land in the right file.

use std::fs;
use std::path::Path;

use analyzer::core::markers::HighlightKind;
use analyzer::core::sequence::{EditOutcome, MoveOutcome};
use analyzer::core::types::{Direction, Position, Selection};
use analyzer::io::artifacts::ArtifactKind;
use analyzer::pass::{FileKind, PassKey};
use analyzer::test_support::{TestAnalyzer, ordinals};
use analyzer::validate::validate_analyzer;

const INPUT: &str = "story.txt";

/// Moving a pass up and back down swaps its highlight output out and back in.
///
/// Sequence: `tokenize nil` (1), `pat a` (2), `pat b` (3).
/// The tree log is never swapped, so it stays put through both moves.
#[test]
fn artifacts_follow_pass_through_move_and_back() {
    let analyzer = TestAnalyzer::new("tokenize\tnil\t\npat\ta\t\npat\tb\t\n");
    analyzer.write_pass("a.pat", "@NODES _ROOT\n");
    analyzer.write_pass("b.pat", "@NODES _ROOT\n");
    analyzer.write_input(INPUT, "ab");
    analyzer.write_artifact(INPUT, 2, ArtifactKind::Highlight, "{{ab}}");
    analyzer.write_artifact(INPUT, 3, ArtifactKind::Highlight, "[[ab]]");
    analyzer.write_artifact(INPUT, 2, ArtifactKind::TreeLog, "a log");

    let store = analyzer.store();
    let moved = store
        .move_pass(&PassKey::named("b"), Direction::Up)
        .expect("move up");
    assert_eq!(moved, MoveOutcome::Moved { swaps: vec![(2, 3)] });
    assert_eq!(
        analyzer.descriptor(),
        "tokenize\tnil\t\npat\tb\t\npat\ta\t\n"
    );

    let ranges = analyzer
        .decoder()
        .highlights(Path::new(INPUT), 2)
        .expect("highlights")
        .expect("ranges");
    assert_eq!(ranges.len(), 1);
    assert_eq!(ranges[0].kind, HighlightKind::Built);
    assert_eq!(
        analyzer.read_artifact(INPUT, 2, ArtifactKind::TreeLog).as_deref(),
        Some("a log")
    );

    store
        .move_pass(&PassKey::named("b"), Direction::Down)
        .expect("move down");
    assert_eq!(
        analyzer.read_artifact(INPUT, 2, ArtifactKind::Highlight).as_deref(),
        Some("{{ab}}")
    );
    assert_eq!(
        analyzer.read_artifact(INPUT, 3, ArtifactKind::Highlight).as_deref(),
        Some("[[ab]]")
    );
}

/// Create a pass, decode its output, and append a skeleton rule to it.
#[test]
fn new_pass_receives_generated_rule() {
    let analyzer = TestAnalyzer::new("# passes\ntokenize\tnil\t\n");
    let store = analyzer.store();
    let outcome = store
        .insert_new_file(None, FileKind::Pat, "words", "# words")
        .expect("insert");
    assert_eq!(outcome, EditOutcome::Applied);
    let sequence = store.load().expect("load");
    assert_eq!(ordinals(&sequence), vec![Some(1), Some(2)]);

    analyzer.write_input(INPUT, "ab 12");
    analyzer.write_artifact(INPUT, 2, ArtifactKind::Highlight, "{{ab}} 12");
    analyzer.write_artifact(
        INPUT,
        2,
        ArtifactKind::TreeLog,
        "_ROOT[0,4,0,8,0,0,_ROOT]\n  ab[0,1,2,3,2,4,alpha,fired]\n  [2,2,6,6,0,0,white]\n  12[3,4,7,8,0,0,num]\n",
    );

    let selection = Selection::new(Position::new(0, 2), Position::new(0, 8));
    let rule = analyzer
        .decoder()
        .generate_rule_skeleton(Path::new(INPUT), 2, selection, true)
        .expect("generate")
        .expect("rule");
    assert_eq!(
        rule.text,
        "@RULES\n_newNode <-\n\t_xALPHA\t### (1)\n\t_xWHITE\t### (2)\n\t@@\n"
    );

    let file = rule.appended_to.expect("appended");
    assert_eq!(file, analyzer.paths().spec_dir.join("words.pat"));
    let contents = fs::read_to_string(&file).expect("read pass file");
    assert!(contents.contains("# FILE: words.pat"));
    assert!(contents.ends_with(&format!("\n\n{}", rule.text)));

    let outcome = validate_analyzer(analyzer.root()).expect("validate");
    assert!(outcome.violations.is_empty());
    assert!(outcome.missing.is_empty());
}

/// Renaming and re-kinding a pass keeps the descriptor and disk in step.
#[test]
fn rename_then_switch_kind() {
    let analyzer = TestAnalyzer::new("tokenize\tnil\t\npat\tdates\t# d\n");
    analyzer.write_pass("dates.pat", "body");
    let store = analyzer.store();

    store
        .rename(&PassKey::named("dates"), "when")
        .expect("rename");
    store
        .set_file_kind(&PassKey::named("when"), FileKind::Rec)
        .expect("kind");

    assert_eq!(analyzer.descriptor(), "tokenize\tnil\t\nrec\twhen\t# d\n");
    let spec = &analyzer.paths().spec_dir;
    assert!(!spec.join("dates.pat").exists());
    assert!(!spec.join("when.pat").exists());
    assert_eq!(fs::read_to_string(spec.join("when.rec")).expect("read"), "body");
}
