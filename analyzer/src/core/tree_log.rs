//! Structured per-pass tree log.
//!
//! Each line describes one parse-tree node:
//! `<indent><label>[<raw_start>,<raw_end>,<ustart>,<uend>,<pass>,<rule_line>,<type>,fired,built]`.
//! The two trailing flags are present only when set. Offsets are character
//! offsets and `raw_end` is inclusive, as the engine writes it.
//!
//! Each tree level is indented by [`INDENT_STEP`] spaces. A whitespace token's
//! label is the whitespace itself, so for `white` nodes the characters past the
//! last whole indent step are the label, not indentation.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::core::types::DisplayMode;

static TREE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<indent>\s*)(?P<label>.*)\[(?P<fields>[^\[\]]*)\]\s*$")
        .expect("valid tree line regex")
});

/// Spaces per tree level.
pub const INDENT_STEP: usize = 2;

/// Label of the node spanning the whole input.
pub const ROOT_LABEL: &str = "_ROOT";

const FIRED_FLAG: &str = "fired";
const BUILT_FLAG: &str = "built";

/// One parsed line of the tree log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub label: String,
    pub raw_start: usize,
    pub raw_end: usize,
    pub annotated_start: usize,
    pub annotated_end: usize,
    pub pass_ordinal: usize,
    pub rule_line: usize,
    /// Engine token class: `alpha`, `num`, `white`, `punct`, or a node type.
    pub token_type: String,
    pub fired: bool,
    pub built: bool,
    /// Leading whitespace before the label; deeper nodes are indented further.
    pub indent: usize,
}

impl TreeNode {
    /// True when `raw` lies within `[raw_start, raw_end]`.
    pub fn covers(&self, raw: usize) -> bool {
        self.raw_start <= raw && raw <= self.raw_end
    }
}

/// A rule match reported by the tree log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FiredSpan {
    pub from: usize,
    /// Inclusive.
    pub to: usize,
    pub pass_ordinal: usize,
    pub rule_line: usize,
    pub built: bool,
}

impl FiredSpan {
    pub fn covers(&self, raw: usize) -> bool {
        self.from <= raw && raw <= self.to
    }
}

/// Parse one tree log line; lines that do not carry a full field list yield `None`.
pub fn parse_tree_line(line: &str) -> Option<TreeNode> {
    let caps = TREE_LINE.captures(line)?;
    let fields: Vec<&str> = caps["fields"].split(',').map(str::trim).collect();
    if fields.len() < 7 {
        return None;
    }
    let leading: Vec<char> = caps["indent"].chars().collect();
    let mut indent = leading.len();
    let mut label = caps["label"].to_string();
    if fields[6] == "white" && label.is_empty() {
        indent -= indent % INDENT_STEP;
        label = leading[indent..].iter().collect();
    }
    let number = |idx: usize| fields[idx].parse::<usize>().ok();
    let flags = &fields[7..];
    Some(TreeNode {
        label,
        raw_start: number(0)?,
        raw_end: number(1)?,
        annotated_start: number(2)?,
        annotated_end: number(3)?,
        pass_ordinal: number(4)?,
        rule_line: number(5)?,
        token_type: fields[6].to_string(),
        fired: flags.contains(&FIRED_FLAG),
        built: flags.contains(&BUILT_FLAG),
        indent,
    })
}

/// Every parseable node of a tree log, in file order.
pub fn parse_tree_log(text: &str) -> Vec<TreeNode> {
    text.lines().filter_map(parse_tree_line).collect()
}

/// Outermost fired spans of a tree log.
///
/// A fired record survives only if its `to` exceeds the largest `to` kept so
/// far, which drops nested and duplicate matches of the same region. With
/// [`DisplayMode::Built`] only surviving spans that built a node are returned.
pub fn parse_fireds(text: &str, mode: DisplayMode) -> Vec<FiredSpan> {
    let mut max_to: Option<usize> = None;
    let mut spans = Vec::new();
    for node in text
        .lines()
        .filter(|line| line.contains(",fired"))
        .filter_map(parse_tree_line)
        .filter(|node| node.fired)
    {
        if max_to.is_some_and(|max| node.raw_end <= max) {
            continue;
        }
        max_to = Some(node.raw_end);
        spans.push(FiredSpan {
            from: node.raw_start,
            to: node.raw_end,
            pass_ordinal: node.pass_ordinal,
            rule_line: node.rule_line,
            built: node.built,
        });
    }
    if mode == DisplayMode::Built {
        spans.retain(|span| span.built);
    }
    spans
}

/// First fired span covering `raw`.
pub fn find_fired(spans: &[FiredSpan], raw: usize) -> Option<&FiredSpan> {
    spans.iter().find(|span| span.covers(raw))
}

/// Nodes lying entirely inside `[start, end)`, in file order.
///
/// The root node is never returned, even when the whole input is selected.
pub fn nodes_within(nodes: &[TreeNode], start: usize, end: usize) -> Vec<&TreeNode> {
    nodes
        .iter()
        .filter(|node| node.label != ROOT_LABEL)
        .filter(|node| node.raw_start >= start && node.raw_end < end)
        .collect()
}
