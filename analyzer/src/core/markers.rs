//! Decoding of the marker-annotated highlight copy.
//!
//! The engine writes a copy of the input text with paired markers inserted
//! around matched spans. Two coordinate spaces coexist: *raw* offsets count
//! characters of the original text, *annotated* offsets count characters of the
//! marker-bearing copy. Markers never exist in the original, so they must never
//! shift a raw offset.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{LineSeparator, Position, RawSpan, Selection};

/// Open/close delimiter pair for one highlight style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub open: String,
    pub close: String,
}

impl MarkerStyle {
    pub fn new(open: &str, close: &str) -> Self {
        Self {
            open: open.to_string(),
            close: close.to_string(),
        }
    }
}

/// Which highlight style a marker pair used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightKind {
    /// Rule matched but did not build a node.
    Matched,
    /// Rule matched and built a node.
    Built,
}

impl fmt::Display for HighlightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Matched => "matched",
            Self::Built => "built",
        })
    }
}

/// Both marker styles used in one highlight copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSet {
    pub matched: MarkerStyle,
    pub built: MarkerStyle,
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self {
            matched: MarkerStyle::new("{{", "}}"),
            built: MarkerStyle::new("[[", "]]"),
        }
    }
}

impl MarkerSet {
    fn delimiters(&self) -> [(&str, Token); 4] {
        [
            (self.built.open.as_str(), Token::Open(HighlightKind::Built)),
            (self.built.close.as_str(), Token::Close(HighlightKind::Built)),
            (
                self.matched.open.as_str(),
                Token::Open(HighlightKind::Matched),
            ),
            (
                self.matched.close.as_str(),
                Token::Close(HighlightKind::Matched),
            ),
        ]
    }
}

/// One inserted marker pair, in both coordinate spaces.
///
/// Raw bounds are half-open over the original text. Annotated bounds span from
/// the first character of the open marker to just past the close marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightRange {
    pub kind: HighlightKind,
    pub raw_start: usize,
    pub raw_end: usize,
    pub annotated_start: usize,
    pub annotated_end: usize,
}

/// Marker pairing failure, reported at an annotated character offset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkerError {
    #[error("{kind} close marker at offset {offset} has no open marker")]
    UnmatchedClose { kind: HighlightKind, offset: usize },
    #[error("{found} close marker at offset {offset} does not close the {expected} marker")]
    MismatchedClose {
        expected: HighlightKind,
        found: HighlightKind,
        offset: usize,
    },
    #[error("{kind} open marker at offset {offset} is never closed")]
    Unclosed { kind: HighlightKind, offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Char,
    Open(HighlightKind),
    Close(HighlightKind),
}

/// Splits annotated text into characters and markers.
struct Scanner<'a> {
    rest: &'a str,
    delimiters: [(&'a str, Token); 4],
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str, markers: &'a MarkerSet) -> Self {
        Self {
            rest: text,
            delimiters: markers.delimiters(),
        }
    }
}

impl Iterator for Scanner<'_> {
    /// Token and its width in characters.
    type Item = (Token, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let c = self.rest.chars().next()?;
        for (delimiter, token) in self.delimiters {
            if !delimiter.is_empty() && self.rest.starts_with(delimiter) {
                self.rest = &self.rest[delimiter.len()..];
                return Some((token, delimiter.chars().count()));
            }
        }
        self.rest = &self.rest[c.len_utf8()..];
        Some((Token::Char, 1))
    }
}

/// Parse every marker pair of both styles, sorted by `raw_start`.
pub fn parse_highlights(
    annotated: &str,
    markers: &MarkerSet,
) -> Result<Vec<HighlightRange>, MarkerError> {
    let mut raw = 0;
    let mut annotated_pos = 0;
    let mut open: Vec<(HighlightKind, usize, usize)> = Vec::new();
    let mut ranges = Vec::new();

    for (token, width) in Scanner::new(annotated, markers) {
        match token {
            Token::Char => raw += 1,
            Token::Open(kind) => open.push((kind, raw, annotated_pos)),
            Token::Close(kind) => {
                let Some((open_kind, raw_start, annotated_start)) = open.pop() else {
                    return Err(MarkerError::UnmatchedClose {
                        kind,
                        offset: annotated_pos,
                    });
                };
                if open_kind != kind {
                    return Err(MarkerError::MismatchedClose {
                        expected: open_kind,
                        found: kind,
                        offset: annotated_pos,
                    });
                }
                ranges.push(HighlightRange {
                    kind,
                    raw_start,
                    raw_end: raw,
                    annotated_start,
                    annotated_end: annotated_pos + width,
                });
            }
        }
        annotated_pos += width;
    }

    if let Some((kind, _, offset)) = open.pop() {
        return Err(MarkerError::Unclosed { kind, offset });
    }
    ranges.sort_by_key(|range| range.raw_start);
    Ok(ranges)
}

/// Original text with every marker removed.
pub fn strip_markers(annotated: &str, markers: &MarkerSet) -> String {
    let mut out = String::with_capacity(annotated.len());
    let mut rest = annotated;
    for (token, _) in Scanner::new(annotated, markers) {
        match token {
            Token::Char => {
                let Some(c) = rest.chars().next() else { break };
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
            Token::Open(kind) | Token::Close(kind) => {
                let style = match kind {
                    HighlightKind::Built => &markers.built,
                    HighlightKind::Matched => &markers.matched,
                };
                let delimiter = if matches!(token, Token::Open(_)) {
                    &style.open
                } else {
                    &style.close
                };
                rest = &rest[delimiter.len()..];
            }
        }
    }
    out
}

/// Number of marker characters on `line` before `column`.
pub fn marker_chars_before(line: &str, column: usize, markers: &MarkerSet) -> usize {
    let mut pos = 0;
    let mut count = 0;
    for (token, width) in Scanner::new(line, markers) {
        if pos >= column {
            break;
        }
        if token != Token::Char {
            count += width.min(column - pos);
        }
        pos += width;
    }
    count
}

/// Map an annotated-space selection to the raw span it designates.
///
/// Each preceding line contributes its marker-free length plus the separator;
/// on the start and end lines the markers left of the column are subtracted.
/// Columns past the end of a line are clamped to the line.
pub fn selection_to_raw(
    annotated: &str,
    selection: Selection,
    separator: LineSeparator,
    markers: &MarkerSet,
) -> RawSpan {
    let selection = selection.normalized();
    let mut line_start = 0;
    let mut start = None;
    let mut end = None;

    for (index, line) in split_lines(annotated, separator).enumerate() {
        let width = line.chars().count();
        if index == selection.start.line {
            start = Some(line_start + raw_column(line, selection.start.column.min(width), markers));
        }
        if index == selection.end.line {
            end = Some(line_start + raw_column(line, selection.end.column.min(width), markers));
            break;
        }
        line_start += width - marker_chars_before(line, width, markers) + separator.width();
    }

    let total = line_start.saturating_sub(separator.width());
    let start = start.unwrap_or(total);
    let end = end.unwrap_or(total).max(start);
    RawSpan::new(start, end)
}

/// Annotated offset at which raw offset `raw` appears, skipping markers in front of it.
///
/// `raw` equal to the raw length maps to the annotated length. Returns `None`
/// past the end.
pub fn raw_to_annotated(annotated: &str, raw: usize, markers: &MarkerSet) -> Option<usize> {
    let mut seen = 0;
    let mut pos = 0;
    for (token, width) in Scanner::new(annotated, markers) {
        if token == Token::Char {
            if seen == raw {
                return Some(pos);
            }
            seen += 1;
        }
        pos += width;
    }
    (seen == raw).then_some(pos)
}

/// `(line, column)` of an absolute annotated offset.
pub fn offset_to_position(annotated: &str, offset: usize, separator: LineSeparator) -> Position {
    let mut remaining = offset;
    let mut last = 0;
    for (index, line) in split_lines(annotated, separator).enumerate() {
        let width = line.chars().count();
        if remaining <= width {
            return Position::new(index, remaining);
        }
        remaining -= width + separator.width();
        last = index;
    }
    Position::new(last, 0)
}

/// Index of the first range containing `raw` (`raw_start <= raw < raw_end`).
pub fn find_match_by_absolute(ranges: &[HighlightRange], raw: usize) -> Option<usize> {
    ranges
        .iter()
        .position(|range| range.raw_start <= raw && raw < range.raw_end)
}

fn raw_column(line: &str, column: usize, markers: &MarkerSet) -> usize {
    column - marker_chars_before(line, column, markers)
}

fn split_lines(text: &str, separator: LineSeparator) -> impl Iterator<Item = &str> {
    text.split(separator.as_str())
}
