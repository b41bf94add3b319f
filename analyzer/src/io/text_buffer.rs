//! Whole-file text access with line-separator awareness.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::types::LineSeparator;

/// A text file read fully into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBuffer {
    path: Option<PathBuf>,
    text: String,
    separator: LineSeparator,
}

impl TextBuffer {
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let separator = LineSeparator::detect(&text);
        Self {
            path: None,
            text,
            separator,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let mut buffer = Self::from_text(text);
        debug!(path = %path.display(), separator = ?buffer.separator, "text loaded");
        buffer.path = Some(path.to_path_buf());
        Ok(buffer)
    }

    /// Like [`TextBuffer::load`], but a missing file yields `None`.
    pub fn load_if_exists(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn separator(&self) -> LineSeparator {
        self.separator
    }

    /// Lines without their separators.
    pub fn lines(&self) -> Vec<&str> {
        self.text.lines().collect()
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.text.lines().nth(index)
    }

    /// Rewrite every line ending to `target`.
    pub fn convert_separators(&mut self, target: LineSeparator) {
        if target == self.separator && !self.has_mixed_endings() {
            return;
        }
        let normalized = self.text.replace("\r\n", "\n");
        self.text = match target {
            LineSeparator::Lf => normalized,
            LineSeparator::CrLf => normalized.replace('\n', "\r\n"),
        };
        self.separator = target;
    }

    /// Write the buffer back to the file it came from.
    pub fn save(&self) -> Result<()> {
        let path = self
            .path
            .as_deref()
            .context("text buffer has no backing file")?;
        fs::write(path, &self.text).with_context(|| format!("write {}", path.display()))
    }

    fn has_mixed_endings(&self) -> bool {
        let crlf = self.text.matches("\r\n").count();
        let lf = self.text.matches('\n').count();
        crlf != 0 && crlf != lf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_and_converts_separators() {
        let mut buffer = TextBuffer::from_text("one\r\ntwo\r\n");
        assert_eq!(buffer.separator(), LineSeparator::CrLf);
        assert_eq!(buffer.lines(), vec!["one", "two"]);
        buffer.convert_separators(LineSeparator::Lf);
        assert_eq!(buffer.text(), "one\ntwo\n");
        buffer.convert_separators(LineSeparator::CrLf);
        assert_eq!(buffer.text(), "one\r\ntwo\r\n");
    }

    #[test]
    fn mixed_endings_are_normalized() {
        let mut buffer = TextBuffer::from_text("a\r\nb\nc");
        buffer.convert_separators(LineSeparator::CrLf);
        assert_eq!(buffer.text(), "a\r\nb\r\nc");
    }

    #[test]
    fn load_and_save_round_trip() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("input.txt");
        fs::write(&path, "x\ny\n").expect("write");
        let mut buffer = TextBuffer::load(&path).expect("load");
        assert_eq!(buffer.line(1), Some("y"));
        buffer.convert_separators(LineSeparator::CrLf);
        buffer.save().expect("save");
        assert_eq!(fs::read_to_string(&path).expect("read"), "x\r\ny\r\n");
        assert!(
            TextBuffer::load_if_exists(&temp.path().join("none.txt"))
                .expect("load")
                .is_none()
        );
    }
}
