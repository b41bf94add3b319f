//! Parse and serialize the line-oriented pipeline descriptor (`analyzer.seq`).
//!
//! One pass per line: `<kind>\t<name>\t<comment>`. Lines whose first
//! non-blank character is `#` are kept verbatim as comment passes. A leading
//! `/` on the kind disables the pass. Lines that do not yield a kind, a name and
//! a comment field are dropped.

use std::path::Path;

use crate::core::sequence::PassSequence;
use crate::core::types::LineSeparator;
use crate::pass::{FileKind, Pass, PassItem};

/// Prefix on the kind token that marks a disabled pass.
pub const DISABLED_SENTINEL: char = '/';

/// Parse descriptor text into a renumbered sequence.
///
/// Rule and record files resolve against `spec_dir`; existence is not checked here.
pub fn parse_descriptor(text: &str, spec_dir: &Path) -> PassSequence {
    let passes = text
        .lines()
        .filter_map(|line| parse_line(line, spec_dir))
        .collect();
    PassSequence::new(passes)
}

/// Render a sequence back to descriptor text, one line per pass.
pub fn serialize_descriptor(sequence: &PassSequence, separator: LineSeparator) -> String {
    let mut buf = String::new();
    for pass in sequence.passes() {
        buf.push_str(&render_line(pass));
        buf.push_str(separator.as_str());
    }
    buf
}

fn parse_line(line: &str, spec_dir: &Path) -> Option<Pass> {
    let trimmed = line.trim_start();
    if trimmed.trim_end().is_empty() {
        return None;
    }
    if trimmed.starts_with('#') {
        return Some(Pass::comment_line(line));
    }

    let (kind_field, name, comment) = split_fields(trimmed)?;
    let (active, keyword) = match kind_field.strip_prefix(DISABLED_SENTINEL) {
        Some(rest) => (false, rest),
        None => (true, kind_field),
    };
    if keyword.is_empty() || name.is_empty() {
        return None;
    }

    let mut pass = match keyword {
        "folder" => Pass::new(
            PassItem::FolderBegin {
                name: name.to_string(),
            },
            comment,
        ),
        "end" => Pass::new(
            PassItem::FolderEnd {
                name: name.to_string(),
            },
            comment,
        ),
        other => match FileKind::from_keyword(other) {
            Some(kind) => Pass::file(kind, name, spec_dir, comment),
            None => Pass::new(
                PassItem::Stub {
                    keyword: other.to_string(),
                    name: name.to_string(),
                },
                comment,
            ),
        },
    };
    pass.active = active;
    Some(pass)
}

/// Split into `(kind, name, comment)`.
///
/// Tab-separated lines keep an empty trailing comment field; whitespace-separated
/// lines need a third token.
fn split_fields(line: &str) -> Option<(&str, &str, &str)> {
    if line.contains('\t') {
        let mut fields = line.splitn(3, '\t');
        let kind = fields.next()?.trim();
        let name = fields.next()?.trim();
        let comment = fields.next()?;
        return Some((kind, name, comment));
    }

    let (kind, rest) = split_token(line)?;
    let (name, comment) = split_token(rest)?;
    let comment = comment.trim_end();
    if comment.is_empty() {
        return None;
    }
    Some((kind, name, comment))
}

fn split_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    match s.find(char::is_whitespace) {
        Some(idx) => Some((&s[..idx], s[idx..].trim_start())),
        None => Some((s, "")),
    }
}

fn render_line(pass: &Pass) -> String {
    if let PassItem::Comment { text } = &pass.item {
        return text.clone();
    }
    let sentinel = if pass.active { "" } else { "/" };
    format!(
        "{sentinel}{}\t{}\t{}",
        pass.keyword(),
        pass.name(),
        pass.comment
    )
}
