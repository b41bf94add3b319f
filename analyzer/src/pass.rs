use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Keywords the engine accepts for its built-in tokenizer step.
pub const TOKENIZER_KEYWORDS: &[&str] = &["tokenize", "dicttok", "dicttokz", "cmltokenize", "chartok"];

/// Flat classification of a descriptor line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassKind {
    Comment,
    RuleFile,
    RecordFile,
    FolderBegin,
    FolderEnd,
    Stub,
}

impl PassKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::RuleFile => "rule-file",
            Self::RecordFile => "record-file",
            Self::FolderBegin => "folder-begin",
            Self::FolderEnd => "folder-end",
            Self::Stub => "stub",
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk grammar file flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pat,
    Rec,
}

impl FileKind {
    /// Descriptor keyword, which doubles as the file extension.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Pat => "pat",
            Self::Rec => "rec",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "pat" => Some(Self::Pat),
            "rec" => Some(Self::Rec),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_keyword)
    }

    pub fn pass_kind(self) -> PassKind {
        match self {
            Self::Pat => PassKind::RuleFile,
            Self::Rec => PassKind::RecordFile,
        }
    }

    pub fn file_name(self, name: &str) -> String {
        format!("{name}.{}", self.keyword())
    }
}

/// Kind-specific payload of a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PassItem {
    /// Verbatim `#` line.
    Comment { text: String },
    /// Rule or record file present in the spec directory.
    File {
        kind: FileKind,
        name: String,
        path: PathBuf,
    },
    /// Rule or record file referenced by the descriptor but absent on disk.
    Missing {
        kind: FileKind,
        name: String,
        path: PathBuf,
    },
    FolderBegin { name: String },
    FolderEnd { name: String },
    /// Built-in step with no file (the tokenizer, for instance).
    Stub { keyword: String, name: String },
}

/// One line of the pipeline descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pass {
    /// Dense 1-based position among active passes; `None` for comments,
    /// folder markers and disabled passes.
    pub ordinal: Option<usize>,
    pub active: bool,
    pub in_folder: bool,
    pub comment: String,
    pub item: PassItem,
}

impl Pass {
    pub fn new(item: PassItem, comment: impl Into<String>) -> Self {
        Self {
            ordinal: None,
            active: true,
            in_folder: false,
            comment: comment.into(),
            item,
        }
    }

    pub fn comment_line(text: impl Into<String>) -> Self {
        Self::new(PassItem::Comment { text: text.into() }, "")
    }

    pub fn file(kind: FileKind, name: &str, spec_dir: &Path, comment: impl Into<String>) -> Self {
        let path = spec_dir.join(kind.file_name(name));
        Self::new(
            PassItem::File {
                kind,
                name: name.to_string(),
                path,
            },
            comment,
        )
    }

    pub fn kind(&self) -> PassKind {
        match &self.item {
            PassItem::Comment { .. } => PassKind::Comment,
            PassItem::File { kind, .. } | PassItem::Missing { kind, .. } => kind.pass_kind(),
            PassItem::FolderBegin { .. } => PassKind::FolderBegin,
            PassItem::FolderEnd { .. } => PassKind::FolderEnd,
            PassItem::Stub { .. } => PassKind::Stub,
        }
    }

    pub fn name(&self) -> &str {
        match &self.item {
            PassItem::Comment { .. } => "",
            PassItem::File { name, .. }
            | PassItem::Missing { name, .. }
            | PassItem::FolderBegin { name }
            | PassItem::FolderEnd { name }
            | PassItem::Stub { name, .. } => name,
        }
    }

    /// Keyword written in the first descriptor column.
    pub fn keyword(&self) -> &str {
        match &self.item {
            PassItem::Comment { .. } => "#",
            PassItem::File { kind, .. } | PassItem::Missing { kind, .. } => kind.keyword(),
            PassItem::FolderBegin { .. } => "folder",
            PassItem::FolderEnd { .. } => "end",
            PassItem::Stub { keyword, .. } => keyword,
        }
    }

    pub fn file_kind(&self) -> Option<FileKind> {
        match &self.item {
            PassItem::File { kind, .. } | PassItem::Missing { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        match &self.item {
            PassItem::File { path, .. } | PassItem::Missing { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn is_folder_marker(&self) -> bool {
        matches!(
            self.item,
            PassItem::FolderBegin { .. } | PassItem::FolderEnd { .. }
        )
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.item, PassItem::Missing { .. })
    }

    pub fn is_tokenizer(&self) -> bool {
        match &self.item {
            PassItem::Stub { keyword, .. } => TOKENIZER_KEYWORDS.contains(&keyword.as_str()),
            _ => false,
        }
    }

    /// True if this pass consumes an ordinal when the sequence is renumbered.
    pub fn takes_ordinal(&self) -> bool {
        self.active
            && !self.is_folder_marker()
            && !matches!(self.item, PassItem::Comment { .. })
    }

    pub fn matches(&self, key: &PassKey) -> bool {
        if self.kind() == PassKind::Comment || self.name() != key.name {
            return false;
        }
        match key.kind {
            Some(kind) => self.kind() == kind,
            None => self.kind() != PassKind::FolderEnd,
        }
    }
}

/// Address of a pass by name, optionally narrowed by kind.
///
/// Without a kind, a folder name resolves to its `folder` line, never its `end` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassKey {
    pub name: String,
    pub kind: Option<PassKind>,
}

impl PassKey {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
        }
    }

    pub fn of_kind(name: impl Into<String>, kind: PassKind) -> Self {
        Self {
            name: name.into(),
            kind: Some(kind),
        }
    }
}

impl fmt::Display for PassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Some(kind) => write!(f, "{} '{}'", kind, self.name),
            None => write!(f, "'{}'", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_without_kind_skips_folder_end() {
        let begin = Pass::new(
            PassItem::FolderBegin {
                name: "dates".to_string(),
            },
            "",
        );
        let end = Pass::new(
            PassItem::FolderEnd {
                name: "dates".to_string(),
            },
            "",
        );
        let key = PassKey::named("dates");
        assert!(begin.matches(&key));
        assert!(!end.matches(&key));
        assert!(end.matches(&PassKey::of_kind("dates", PassKind::FolderEnd)));
    }

    #[test]
    fn disabled_and_marker_passes_take_no_ordinal() {
        let mut pass = Pass::file(FileKind::Pat, "lines", Path::new("spec"), "");
        assert!(pass.takes_ordinal());
        pass.active = false;
        assert!(!pass.takes_ordinal());
        assert!(!Pass::comment_line("# note").takes_ordinal());
    }

    #[test]
    fn file_kind_follows_extension() {
        assert_eq!(FileKind::from_path(Path::new("a/b.rec")), Some(FileKind::Rec));
        assert_eq!(FileKind::from_path(Path::new("a/b.txt")), None);
        assert_eq!(FileKind::Pat.file_name("lines"), "lines.pat");
    }
}
