//! Layout of rule bodies into aligned, numbered lines.
//!
//! Tokens are classified by a small state machine. Each top-level node starts
//! a new line and its bracketed attributes stay on that line. Trailing comment
//! tokens are dropped and regenerated as `### (<n>)` in a common tab column.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static POSITION_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(\d+\)$").expect("valid position comment regex"));

const COMMENT_PREFIX: &str = "###";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenState {
    Unknown,
    Node,
    AttrStart,
    Attr,
    AttrEnd,
    Comment,
}

impl TokenState {
    /// True if a node token arriving in this state starts a new output line.
    fn ends_element(self) -> bool {
        matches!(self, Self::Node | Self::AttrEnd | Self::Comment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    pub tab_width: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self { tab_width: 4 }
    }
}

pub fn is_comment_token(token: &str) -> bool {
    token.starts_with(COMMENT_PREFIX) || POSITION_COMMENT.is_match(token)
}

/// State after consuming `token` in state `prev`.
pub fn next_state(prev: TokenState, token: &str) -> TokenState {
    if is_comment_token(token) {
        return TokenState::Comment;
    }
    match prev {
        TokenState::Node | TokenState::AttrEnd if token.starts_with('[') => {
            if token.ends_with(']') {
                TokenState::AttrEnd
            } else {
                TokenState::AttrStart
            }
        }
        TokenState::AttrStart | TokenState::Attr => {
            if token.ends_with(']') {
                TokenState::AttrEnd
            } else {
                TokenState::Attr
            }
        }
        _ => TokenState::Node,
    }
}

/// Group whitespace-separated tokens into body lines, dropping comments.
pub fn layout_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut state = TokenState::Unknown;
    for token in text.split_whitespace() {
        let next = next_state(state, token);
        match next {
            TokenState::Comment => {}
            TokenState::Node if state.ends_element() || lines.is_empty() => {
                lines.push(token.to_string());
            }
            _ => match lines.last_mut() {
                Some(line) => {
                    line.push(' ');
                    line.push_str(token);
                }
                None => lines.push(token.to_string()),
            },
        }
        state = next;
    }
    lines
}

/// Format a rule body: one tab indent, then the element, then tabs up to a
/// shared column and a `### (<n>)` line number starting at 1.
pub fn format_rule(text: &str, options: FormatOptions) -> String {
    let tab = options.tab_width.max(1);
    let lines = layout_lines(text);
    let longest = lines
        .iter()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0);
    let column = (longest / tab + 1) * tab;

    let mut out = String::new();
    for (idx, line) in lines.iter().enumerate() {
        let tabs = column / tab - line.chars().count() / tab;
        out.push('\t');
        out.push_str(line);
        out.push_str(&"\t".repeat(tabs));
        out.push_str(&format!("{COMMENT_PREFIX} ({})\n", idx + 1));
    }
    out
}
